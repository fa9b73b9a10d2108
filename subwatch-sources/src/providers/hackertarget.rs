/*!
Host search on HackerTarget
*/

use async_trait::async_trait;

use crate::{SourceError, SourceProvider, get_checked};

const NAME: &str = "hackertarget";
const BASE_URL: &str = "https://api.hackertarget.com";

pub struct HackerTarget {
    client: reqwest::Client,
    base_url: String,
}

impl HackerTarget {
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

/// Rows are `host,ip`. Quota and error notices come back as a single bare line with status 200.
fn parse_rows(body: &str) -> Result<Vec<String>, SourceError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with("error") || trimmed.starts_with("API count exceeded") {
        return Err(SourceError::UnexpectedFormat {
            source_name: NAME,
            detail: trimmed.lines().next().unwrap_or_default().to_string(),
        });
    }

    Ok(body
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(',');
            let host = fields.next()?;
            fields.next().map(|_| host.to_string())
        })
        .collect())
}

#[async_trait]
impl SourceProvider for HackerTarget {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        let request = self
            .client
            .get(format!("{}/hostsearch/", self.base_url))
            .query(&[("q", domain)]);
        let body = get_checked(NAME, request).await?.text().await?;
        parse_rows(&body)
    }
}
