/*!
Passive DNS from AlienVault OTX
*/

use async_trait::async_trait;
use serde::Deserialize;

use crate::{SourceError, SourceProvider, get_checked};

const NAME: &str = "alienvault";
const BASE_URL: &str = "https://otx.alienvault.com";

#[derive(Debug, Deserialize)]
struct PassiveDnsResponse {
    #[serde(default)]
    passive_dns: Vec<PassiveDnsRecord>,
}

#[derive(Debug, Deserialize)]
struct PassiveDnsRecord {
    hostname: Option<String>,
}

pub struct AlienVault {
    client: reqwest::Client,
    base_url: String,
}

impl AlienVault {
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

#[async_trait]
impl SourceProvider for AlienVault {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        let url = format!(
            "{}/api/v1/indicators/domain/{}/passive_dns",
            self.base_url, domain
        );
        let body = get_checked(NAME, self.client.get(url)).await?.text().await?;
        let response: PassiveDnsResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::parse(NAME, e))?;

        Ok(response
            .passive_dns
            .into_iter()
            .filter_map(|record| record.hostname)
            .collect())
    }
}
