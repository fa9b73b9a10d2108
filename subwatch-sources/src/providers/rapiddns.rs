/*!
HTML scrape of rapiddns.io result tables

The page layout is the only contract here. If rapiddns changes its markup, `ROW_SELECTOR`
is the thing to update.
*/

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::{SourceError, SourceProvider, get_checked};

const NAME: &str = "rapiddns";
const BASE_URL: &str = "https://rapiddns.io";
const ROW_SELECTOR: &str = "table tbody tr";
const CELL_SELECTOR: &str = "td";

pub struct RapidDns {
    client: reqwest::Client,
    base_url: String,
}

impl RapidDns {
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

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::parse(NAME, e))
}

/// First cell of every table row holds the name
fn scrape_rows(html: &str) -> Result<Vec<String>, SourceError> {
    let rows = selector(ROW_SELECTOR)?;
    let cells = selector(CELL_SELECTOR)?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&rows)
        .filter_map(|row| row.select(&cells).next())
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .collect())
}

#[async_trait]
impl SourceProvider for RapidDns {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        let request = self
            .client
            .get(format!("{}/subdomain/{}", self.base_url, domain))
            .query(&[("full", "1")]);
        let html = get_checked(NAME, request).await?.text().await?;
        scrape_rows(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_cell_of_each_row() {
        let html = r##"
            <table class="table table-striped table-bordered">
              <thead><tr><th>Domain</th><th>Address</th></tr></thead>
              <tbody>
                <tr><td> a.example.com </td><td>1.2.3.4</td></tr>
                <tr><td><a href="#">b.example.com</a></td><td>5.6.7.8</td></tr>
              </tbody>
            </table>"##;
        assert_eq!(scrape_rows(html).unwrap(), vec!["a.example.com", "b.example.com"]);
    }

    #[test]
    fn page_without_table_yields_nothing() {
        assert!(scrape_rows("<html><body>Nothing</body></html>").unwrap().is_empty());
    }
}
