//! Catalog search trait and response types.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::error::SearchError;
use crate::types::{Category, Credential, DownloadJob};

/// One page of search results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    /// Items on this page
    #[serde(rename = "data", default, deserialize_with = "null_as_default")]
    pub items: Vec<CatalogItem>,

    /// Total hits across all pages, if reported
    #[serde(default)]
    pub total_count: Option<u64>,
}

/// A single image returned by a catalog search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<CatalogCategory>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assets: CatalogAssets,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogCategory {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Renditions available for an item. Only the one the pipeline downloads is
/// modelled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogAssets {
    pub huge_thumb: Option<CatalogAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogAsset {
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub width: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub height: u32,
}

/// Treat an explicit `null` like a missing field.
///
/// The catalog sends `null` for absent descriptions and keyword lists; a
/// single such item must not fail the whole page.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl CatalogItem {
    /// Convert this item into a download job for `keyword`.
    ///
    /// Returns `None` when the item has no thumbnail to download.
    pub fn into_job(self, keyword: &str) -> Option<DownloadJob> {
        let thumb = self.assets.huge_thumb?;
        Some(DownloadJob {
            searched_keyword: keyword.to_string(),
            photo_id: self.id,
            keywords: self.keywords,
            description: self.description,
            category: self
                .categories
                .into_iter()
                .map(|c| Category {
                    id: c.id,
                    name: c.name,
                })
                .collect(),
            thumb_url: thumb.url,
            thumb_width: thumb.width,
            thumb_height: thumb.height,
        })
    }
}

/// Trait that all catalog backends implement.
///
/// Uses `async_trait` because the search stage shares one backend between
/// workers as `Arc<dyn CatalogSearch>`.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Fetch one page of results for `query`. Pages are 1-based.
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
        credential: &Credential,
    ) -> Result<SearchPage, SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_page_deserializes_catalog_json() {
        let json = r#"{
            "page": 1,
            "per_page": 25,
            "total_count": 1,
            "data": [{
                "id": "1048",
                "description": "Cat on a sofa",
                "keywords": ["cat", "sofa"],
                "categories": [{"id": "1", "name": "Animals/Wildlife"}],
                "assets": {
                    "huge_thumb": {"height": 260, "width": 390, "url": "https://img.example/1048.jpg"},
                    "preview": {"height": 300, "width": 450, "url": "https://img.example/p.jpg"}
                }
            }]
        }"#;
        let page: SearchPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_count, Some(1));

        let job = page.items[0].clone().into_job("cat").unwrap();
        assert_eq!(job.searched_keyword, "cat");
        assert_eq!(job.photo_id, "1048");
        assert_eq!(job.thumb_url, "https://img.example/1048.jpg");
        assert_eq!((job.thumb_width, job.thumb_height), (390, 260));
        assert_eq!(job.category[0].name, "Animals/Wildlife");
    }

    #[test]
    fn test_item_without_thumbnail_is_skipped() {
        let item = CatalogItem {
            id: "1".to_string(),
            ..Default::default()
        };
        assert!(item.into_job("cat").is_none());
    }

    #[test]
    fn test_null_fields_do_not_fail_the_page() {
        let json = r#"{
            "data": [
                {"id": "1", "description": "Cat", "keywords": ["cat"],
                 "assets": {"huge_thumb": {"height": 260, "width": 390, "url": "https://img.example/1.jpg"}}},
                {"id": "2", "description": null, "keywords": null, "categories": null,
                 "assets": {"huge_thumb": {"height": null, "width": 390, "url": "https://img.example/2.jpg"}}}
            ],
            "total_count": null
        }"#;
        let page: SearchPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_count, None);

        let jobs: Vec<DownloadJob> = page
            .items
            .into_iter()
            .filter_map(|item| item.into_job("cat"))
            .collect();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].description, "Cat");
        assert_eq!(jobs[1].description, "");
        assert!(jobs[1].keywords.is_empty());
        assert!(jobs[1].category.is_empty());
        assert_eq!(jobs[1].thumb_height, 0);
    }

    #[test]
    fn test_null_assets_is_skipped_not_fatal() {
        let json = r#"{"data": [{"id": "3", "assets": null}]}"#;
        let page: SearchPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.items[0].clone().into_job("cat").is_none());
    }

    #[test]
    fn test_empty_page() {
        let page: SearchPage = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(page.items.is_empty());
    }
}
