//! Crawl engine for the site archiver
//!
//! Owns everything between "a seed URL arrived" and "an archive exists
//! on disk": local path derivation, the asset pipeline, the breadth-
//! first crawl orchestrator, and the service facade external callers
//! talk to.

pub mod assets;
pub mod orchestrator;
pub mod paths;
pub mod service;

pub use assets::{AssetPipeline, ProcessedPage};
pub use orchestrator::{CrawlConfig, CrawlOrchestrator};
pub use service::{ArchiveService, DEFAULT_MAX_CONCURRENT_JOBS};
