/// Integration module for the site archiver
///
/// Wires the store, fetch engine, and crawl engine into one running
/// application and owns process-level concerns: configuration, logging
/// initialization, and error tracking.

use site_archiver_core::*;
use archive_store::StorageManager;
use crawl_engine::{ArchiveService, CrawlConfig, DEFAULT_MAX_CONCURRENT_JOBS};
use page_fetcher::{FetcherConfig, RetryPolicy};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

pub mod application;
pub mod error_handler;
pub mod logger;

pub use application::Application;
pub use error_handler::{ErrorSeverity, ErrorStatistics, UnifiedErrorHandler};
pub use logger::{LoggerConfig, UnifiedLogger};

/// Application configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AppConfig {
    /// Root directory for archive storage
    pub storage_root: PathBuf,

    /// Debug port of the rendering browser
    pub debug_port: u16,

    /// Most pages one job will capture
    pub max_pages: usize,

    /// Traversal depth limit (seed is depth 0)
    pub max_depth: u32,

    /// Politeness delay between page fetches, in milliseconds
    pub page_delay_ms: u64,

    /// Ceiling on concurrently running jobs
    pub max_concurrent_jobs: usize,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("archives"),
            debug_port: 9222,
            max_pages: 50,
            max_depth: 3,
            page_delay_ms: 1000,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Crawl configuration derived from the application settings
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            max_pages: self.max_pages,
            max_depth: self.max_depth,
            page_delay: Duration::from_millis(self.page_delay_ms),
            fetcher: FetcherConfig {
                debug_port: self.debug_port,
                retry: RetryPolicy::default(),
                ..FetcherConfig::default()
            },
        }
    }
}

/// Application context that holds all initialized components
pub struct AppContext {
    /// Storage root manager
    pub storage: Arc<StorageManager>,

    /// Archive service exposing the external operations
    pub service: Arc<ArchiveService>,

    /// Unified error handler
    pub error_handler: Arc<UnifiedErrorHandler>,

    /// Application configuration
    pub config: Arc<RwLock<AppConfig>>,
}

impl AppContext {
    /// Create a new application context with all components initialized
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing application context");

        let storage = Arc::new(StorageManager::new(&config.storage_root).await?);
        info!("Archive storage initialized");

        let service = Arc::new(ArchiveService::new(
            storage.job_store(),
            config.crawl_config(),
            config.max_concurrent_jobs,
        ));
        info!("Archive service initialized");

        let error_handler = Arc::new(UnifiedErrorHandler::new());

        let config = Arc::new(RwLock::new(config));

        info!("Application context initialized successfully");

        Ok(Self {
            storage,
            service,
            error_handler,
            config,
        })
    }

    /// Start archiving a seed URL
    pub async fn start_archiving(&self, url: &str) -> Result<StartedJob> {
        match self.service.start_archiving(url).await {
            Ok(started) => Ok(started),
            Err(e) => {
                self.error_handler.handle_error(&e, "start_archiving").await;
                Err(e)
            }
        }
    }

    /// Point-in-time view of one job
    pub async fn get_job_status(&self, job_id: Uuid) -> Result<JobStatusReport> {
        self.service.get_job_status(job_id).await
    }

    /// All archives, newest first, optionally filtered by domain
    pub async fn list_archives(&self, domain: Option<&str>) -> Result<Vec<ArchiveSummary>> {
        self.service.list_archives(domain).await
    }

    /// Raw bytes of an archived file
    pub async fn get_archived_file(&self, job_id: Uuid, path: &str) -> Result<Vec<u8>> {
        self.service.get_archived_file(job_id, path).await
    }

    /// Remove an archive entirely
    pub async fn delete_archive(&self, job_id: Uuid) -> Result<()> {
        self.service.delete_archive(job_id).await
    }
}
