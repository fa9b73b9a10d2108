/*!
Certificate transparency lookups via crt.sh
*/

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{SourceError, SourceProvider, get_checked};

const NAME: &str = "crt.sh";
const BASE_URL: &str = "https://crt.sh";

#[derive(Debug, Deserialize)]
struct CertificateEntry {
    #[serde(default)]
    name_value: String,
}

/// Queries crt.sh for every certificate issued under the domain
pub struct CrtSh {
    client: reqwest::Client,
    base_url: String,
}

impl CrtSh {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

/// A certificate's `name_value` holds one SAN per line; wildcard names are kept as-is
fn parse_entries(body: &str) -> Result<Vec<String>, SourceError> {
    let entries: Vec<CertificateEntry> =
        serde_json::from_str(body).map_err(|e| SourceError::parse(NAME, e))?;

    Ok(entries
        .iter()
        .flat_map(|entry| entry.name_value.lines())
        .map(str::to_string)
        .collect())
}

#[async_trait]
impl SourceProvider for CrtSh {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        let request = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[("q", format!("%.{domain}")), ("output", "json".to_string())]);

        let body = get_checked(NAME, request).await?.text().await?;
        // crt.sh answers an empty body instead of `[]` when nothing matches
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let names = parse_entries(&body)?;
        debug!("{} returned {} names for {}", NAME, names.len(), domain);
        Ok(names)
    }
}
