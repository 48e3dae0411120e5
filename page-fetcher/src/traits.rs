//! Fetcher abstraction
//!
//! The crawl orchestrator only needs "give me the HTML for a page" and
//! "give me the bytes of an asset". Everything about rendering, retries,
//! and fallback lives behind this trait so tests can swap in canned
//! content.

use site_archiver_core::*;
use async_trait::async_trait;

/// Source of page HTML and asset bytes for a crawl
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a page and return its HTML
    async fn fetch_page(&self, url: &str) -> Result<String>;

    /// Fetch an asset and return its raw bytes
    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>>;
}
