//! Scripted catalog and image fetcher doubles for pipeline tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use tokio::time::Instant;

use super::fetch::ImageFetcher;
use crate::catalog::{CatalogAsset, CatalogAssets, CatalogItem, CatalogSearch, SearchPage};
use crate::error::{PipelineError, SearchError};
use crate::types::Credential;

/// One recorded search request.
#[derive(Debug, Clone)]
pub(crate) struct SearchCall {
    pub keyword: String,
    pub page: u32,
    pub credential: String,
    pub at: Instant,
}

/// Catalog that replays scripted responses per keyword, in order.
///
/// A keyword with no scripted response left gets an empty page.
#[derive(Default)]
pub(crate) struct MockCatalog {
    script: Mutex<HashMap<String, VecDeque<Result<SearchPage, SearchError>>>>,
    calls: Mutex<Vec<SearchCall>>,
    delay: Option<Duration>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, keyword: &str, result: Result<SearchPage, SearchError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(keyword.to_string())
            .or_default()
            .push_back(result);
        self
    }

    /// Delay every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogSearch for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        _page_size: u32,
        credential: &Credential,
    ) -> Result<SearchPage, SearchError> {
        self.calls.lock().unwrap().push(SearchCall {
            keyword: query.to_string(),
            page,
            credential: credential.identifier.clone(),
            at: Instant::now(),
        });
        let next = self
            .script
            .lock()
            .unwrap()
            .get_mut(query)
            .and_then(|responses| responses.pop_front());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        next.unwrap_or_else(|| Ok(SearchPage::default()))
    }
}

/// A page of `count` items with ids `first_id..first_id + count`.
pub(crate) fn page_of(count: usize, first_id: usize) -> SearchPage {
    let items = (first_id..first_id + count)
        .map(|id| CatalogItem {
            id: id.to_string(),
            description: format!("photo {id}"),
            keywords: vec!["mock".to_string(), format!("k{id}")],
            categories: vec![],
            assets: CatalogAssets {
                huge_thumb: Some(CatalogAsset {
                    url: format!("mock://img/{id}.jpg"),
                    width: 40,
                    height: 100,
                }),
            },
        })
        .collect();
    SearchPage {
        items,
        total_count: None,
    }
}

/// Encode a solid-colour fixture image.
pub(crate) fn fixture_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = DynamicImage::new_rgb8(width, height);
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

/// Fetcher that serves a fixture JPEG for every URL except the failing ones,
/// which get an HTTP 500.
#[derive(Default)]
pub(crate) struct MockFetcher {
    failing: HashSet<String>,
    overrides: HashMap<String, Vec<u8>>,
    calls: AtomicU32,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn serving(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.overrides.insert(url.to_string(), bytes);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(url) {
            return Err(PipelineError::AssetFetch {
                url: url.to_string(),
                status_code: Some(500),
                message: "HTTP 500 Internal Server Error".to_string(),
            });
        }
        if let Some(bytes) = self.overrides.get(url) {
            return Ok(bytes.clone());
        }
        Ok(fixture_image(40, 100, ImageFormat::Jpeg))
    }
}
