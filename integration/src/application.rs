/// Main application module
///
/// Provides the high-level Application API

use crate::{AppConfig, AppContext, UnifiedLogger};
use site_archiver_core::*;
use std::sync::Arc;
use tracing::info;

/// Main application
pub struct Application {
    context: Arc<AppContext>,
}

impl Application {
    /// Create and initialize a new application
    pub async fn new(config: AppConfig) -> Result<Self> {
        // A second global-subscriber registration (e.g. in tests) is
        // harmless; the first one wins
        let _ = UnifiedLogger::init_default();

        info!("Starting Site Archiver");

        let context = Arc::new(AppContext::new(config).await?);

        info!("Application initialized successfully");

        Ok(Self { context })
    }

    /// Get application context
    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    // High-level API methods

    /// Start archiving a seed URL
    pub async fn start_archiving(&self, url: &str) -> Result<StartedJob> {
        self.context.start_archiving(url).await
    }

    /// Point-in-time view of one job
    pub async fn get_job_status(&self, job_id: Uuid) -> Result<JobStatusReport> {
        self.context.get_job_status(job_id).await
    }

    /// All archives, newest first, optionally filtered by domain
    pub async fn list_archives(&self, domain: Option<&str>) -> Result<Vec<ArchiveSummary>> {
        self.context.list_archives(domain).await
    }

    /// Raw bytes of an archived file
    pub async fn get_archived_file(&self, job_id: Uuid, path: &str) -> Result<Vec<u8>> {
        self.context.get_archived_file(job_id, path).await
    }

    /// Remove an archive entirely
    pub async fn delete_archive(&self, job_id: Uuid) -> Result<()> {
        self.context.delete_archive(job_id).await
    }
}
