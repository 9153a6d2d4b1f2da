// Web research tools available to steps that declare them

pub mod scrape;
pub mod serper;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use scrape::PageScraper;
pub use serper::SerperSearch;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tool service returned HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait ToolKit: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError>;
    async fn scrape(&self, url: &str) -> Result<String, ToolError>;
}

/// Serper-backed search plus plain HTTP scraping.
pub struct WebToolKit {
    search: SerperSearch,
    scraper: PageScraper,
}

impl WebToolKit {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            search: SerperSearch::new(client.clone(), api_key),
            scraper: PageScraper::new(client),
        })
    }
}

#[async_trait]
impl ToolKit for WebToolKit {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        self.search.search(query).await
    }

    async fn scrape(&self, url: &str) -> Result<String, ToolError> {
        self.scraper.scrape(url).await
    }
}
