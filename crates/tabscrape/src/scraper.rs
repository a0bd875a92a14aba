use crate::table::{ParseError, Table, TableSelector, parse_tables, select_table};

use reqwest::Client;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
}

impl WebScraper {
    pub fn new() -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch_tables(&self, url: &str) -> Result<Vec<Table>, ScraperError> {
        log::info!("Fetching tables from {}...", url);
        let html = self.get_html(url).await?;
        let tables = parse_tables(&html);
        log::debug!("Found {} table(s) on {}", tables.len(), url);
        Ok(tables)
    }

    pub async fn fetch_table(
        &self,
        url: &str,
        selector: &TableSelector,
    ) -> Result<Table, ScraperError> {
        log::info!("Fetching {} from {}...", selector, url);
        let html = self.get_html(url).await?;
        Ok(select_table(&html, selector)?)
    }

    async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}
