//! Remote image catalog integration.
//!
//! Provides the [`CatalogSearch`] abstraction used by the search stage, the
//! Shutterstock implementation of it, and the rate-limit wait computation.

pub(crate) mod backoff;
pub(crate) mod provider;
pub(crate) mod shutterstock;

pub use backoff::{epoch_millis, rate_limit_wait};
pub use provider::{CatalogAsset, CatalogAssets, CatalogCategory, CatalogItem, CatalogSearch, SearchPage};
pub use shutterstock::ShutterstockCatalog;
