//! Shutterstock image search via the v2 REST API.
//!
//! Authenticates each request with HTTP basic auth using the worker's
//! credential (client id / client secret).

use async_trait::async_trait;
use std::time::Duration;

use super::backoff::parse_reset;
use super::provider::{CatalogSearch, SearchPage};
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::types::Credential;

/// Shutterstock catalog backend.
pub struct ShutterstockCatalog {
    endpoint: String,
    view: String,
    language: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl ShutterstockCatalog {
    /// Build a backend on `client`, which may be shared with the image fetcher.
    pub fn new(config: &SearchConfig, client: reqwest::Client) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            view: config.view.clone(),
            language: config.language.clone(),
            timeout: Duration::from_millis(config.request_timeout_ms),
            client,
        }
    }

    fn search_url(&self) -> String {
        format!("{}/images/search", self.endpoint)
    }
}

#[async_trait]
impl CatalogSearch for ShutterstockCatalog {
    fn name(&self) -> &str {
        "shutterstock"
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
        credential: &Credential,
    ) -> Result<SearchPage, SearchError> {
        let page = page.to_string();
        let per_page = page_size.to_string();

        let resp = self
            .client
            .get(self.search_url())
            .basic_auth(&credential.identifier, Some(&credential.secret))
            .query(&[
                ("query", query),
                ("page", page.as_str()),
                ("per_page", per_page.as_str()),
                ("view", self.view.as_str()),
                ("language", self.language.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::RateLimited {
                reset_at_ms: parse_reset(&body),
            });
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        resp.json::<SearchPage>()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))
    }
}
