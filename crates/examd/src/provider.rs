//! Task Source - fetches raw task text from an exam-bank web page
//!
//! Extracts the text of every element matching a CSS selector. The page is
//! a third party: any failure is reported and the generator falls back to a
//! placeholder task.

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

/// Supplies candidate task texts for a subject
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Candidate tasks, possibly empty
    async fn fetch(&self, subject: &str) -> Result<Vec<String>, ProviderError>;
}

/// Scrapes tasks out of an HTML page
pub struct HtmlTaskSource {
    config: ProviderConfig,
    selector: Selector,
    http: reqwest::Client,
}

impl HtmlTaskSource {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let selector = Selector::parse(&config.selector).map_err(|e| {
            ProviderError::Unavailable(format!("invalid selector '{}': {}", config.selector, e))
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            selector,
            http,
        })
    }

    /// Extract task texts from a page
    fn extract_tasks(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        document
            .select(&self.selector)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|text| !text.is_empty())
            .take(self.config.max_items)
            .collect()
    }
}

#[async_trait]
impl TaskSource for HtmlTaskSource {
    async fn fetch(&self, subject: &str) -> Result<Vec<String>, ProviderError> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }

        let url = self.config.url_for(subject);
        debug!("Fetching tasks for '{}' from {}", subject, url);
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.config.timeout())
            } else {
                ProviderError::Unavailable(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let tasks = self.extract_tasks(&html);
        debug!("Extracted {} tasks from {}", tasks.len(), url);
        Ok(tasks)
    }
}

/// Trim and squash runs of whitespace to single spaces
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
