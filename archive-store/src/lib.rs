//! Metadata store for the site archiver
//!
//! All jobs live in one consolidated `index.json` plus one directory per
//! job holding the captured files. Every index mutation is a full
//! read-modify-write of the whole file; an in-process lock serializes
//! those cycles so concurrent jobs cannot lose updates to each other.

pub mod repository;

pub use repository::*;

use site_archiver_core::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Root-directory manager for archive storage
///
/// Owns the on-disk layout: `<root>/index.json` and `<root>/<job_id>/...`.
pub struct StorageManager {
    root: PathBuf,
}

impl StorageManager {
    /// Open (or create) an archive root at the given path
    pub async fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(StoreError::from)?;
        tracing::info!("Archive storage root: {}", root.display());
        Ok(Self { root })
    }

    /// Build the job store backed by this root
    pub fn job_store(&self) -> Arc<FsJobStore> {
        Arc::new(FsJobStore::new(self.root.clone()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
