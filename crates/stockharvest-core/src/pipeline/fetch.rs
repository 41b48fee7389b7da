//! Raw image retrieval.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;

use crate::error::PipelineError;

/// Fetches the raw bytes behind an image URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Download `url` completely. Any non-success status is an error.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PipelineError>;
}

/// HTTP fetcher that streams the response body in chunks.
pub struct HttpImageFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpImageFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        let fetch_error = |status_code: Option<u16>, message: String| PipelineError::AssetFetch {
            url: url.to_string(),
            status_code,
            message,
        };

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| fetch_error(None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(Some(status.as_u16()), format!("HTTP {status}")));
        }

        let capacity = response.content_length().unwrap_or(0) as usize;
        let mut bytes = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| fetch_error(None, e.to_string()))?;
            bytes.extend_from_slice(&chunk);
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_refused_is_fetch_error() {
        let fetcher = HttpImageFetcher::new(reqwest::Client::new(), Duration::from_secs(2));
        let err = fetcher
            .fetch("http://127.0.0.1:1/image.jpg")
            .await
            .unwrap_err();
        match err {
            PipelineError::AssetFetch {
                url, status_code, ..
            } => {
                assert_eq!(url, "http://127.0.0.1:1/image.jpg");
                assert_eq!(status_code, None);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
