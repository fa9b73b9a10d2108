/*!
Search index lookups on urlscan.io
*/

use async_trait::async_trait;
use serde::Deserialize;

use crate::{SourceError, SourceProvider, get_checked};

const NAME: &str = "urlscan";
const BASE_URL: &str = "https://urlscan.io";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    task: Option<Location>,
    page: Option<Location>,
}

#[derive(Debug, Deserialize)]
struct Location {
    domain: Option<String>,
}

pub struct UrlScan {
    client: reqwest::Client,
    base_url: String,
}

impl UrlScan {
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
impl SourceProvider for UrlScan {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        let request = self
            .client
            .get(format!("{}/api/v1/search/", self.base_url))
            .query(&[("q", format!("domain:{domain}"))]);

        let body = get_checked(NAME, request).await?.text().await?;
        let response: SearchResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::parse(NAME, e))?;

        // The scanned task domain and the final page domain differ after redirects
        Ok(response
            .results
            .into_iter()
            .flat_map(|result| [result.task, result.page])
            .flatten()
            .filter_map(|location| location.domain)
            .collect())
    }
}
