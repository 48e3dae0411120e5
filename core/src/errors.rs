use thiserror::Error;
use uuid::Uuid;

/// Metadata store related errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: Uuid },

    #[error("Archived file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid archive path: {path}")]
    InvalidPath { path: String },

    #[error("Job {job_id} is finalized; no further records may be appended")]
    JobFinalized { job_id: Uuid },

    #[error("Illegal status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

/// Page and asset fetch related errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed for {url}: {details}")]
    RequestFailed { url: String, details: String },

    #[error("Fetch timed out after {timeout_secs}s: {url}")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("All {attempts} attempts exhausted for {url}: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Rendering engine unavailable: {details}")]
    RendererUnavailable { details: String },

    #[error("Unexpected rendering response for {url}: {details}")]
    InvalidRenderResponse { url: String, details: String },
}

/// Crawl orchestration related errors
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid seed URL: {url}")]
    InvalidSeedUrl { url: String },

    #[error("Job limit reached: {limit} jobs already running")]
    JobLimitReached { limit: usize },

    #[error("Orchestration failure: {details}")]
    Orchestration { details: String },
}

/// Main error type for the archiver
#[derive(Debug, Error)]
pub enum SiteArchiverError {
    #[error("Store error: {source}")]
    Store {
        #[from]
        source: StoreError,
    },

    #[error("Fetch error: {source}")]
    Fetch {
        #[from]
        source: FetchError,
    },

    #[error("Crawl error: {source}")]
    Crawl {
        #[from]
        source: CrawlError,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SiteArchiverError>;

impl SiteArchiverError {
    /// Whether this error means the requested job does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SiteArchiverError::Store {
                source: StoreError::JobNotFound { .. } | StoreError::FileNotFound { .. },
            }
        )
    }
}
