/*!
Subdomain lists from Anubis (jldc.me)
*/

use async_trait::async_trait;
use serde_json::Value;

use crate::{SourceError, SourceProvider, get_checked};

const NAME: &str = "anubis";
const BASE_URL: &str = "https://jldc.me";

pub struct Anubis {
    client: reqwest::Client,
    base_url: String,
}

impl Anubis {
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

/// Anubis answers a bare JSON array of names, or an error object when it has nothing
fn parse_names(body: &str) -> Result<Vec<String>, SourceError> {
    let value: Value = serde_json::from_str(body).map_err(|e| SourceError::parse(NAME, e))?;

    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name),
                _ => None,
            })
            .collect()),
        other => Err(SourceError::UnexpectedFormat {
            source_name: NAME,
            detail: format!("expected a JSON array, got {other}"),
        }),
    }
}

#[async_trait]
impl SourceProvider for Anubis {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        let url = format!("{}/anubis/subdomains/{}", self.base_url, domain);
        let body = get_checked(NAME, self.client.get(url)).await?.text().await?;
        parse_names(&body)
    }
}
