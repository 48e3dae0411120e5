/// Unified error handler for centralized error management

use site_archiver_core::SiteArchiverError;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical error requiring immediate attention
    Critical,
    /// Error that affects functionality
    Error,
    /// Warning about potential issues
    Warning,
    /// Informational message
    Info,
}

/// Error entry for tracking
#[derive(Debug, Clone)]
pub struct ErrorEntry {
    pub error: String,
    pub severity: ErrorSeverity,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub context: String,
}

/// Unified error handler
pub struct UnifiedErrorHandler {
    /// Recent errors for reporting
    recent_errors: Arc<RwLock<Vec<ErrorEntry>>>,
    /// Maximum number of errors to keep
    max_errors: usize,
}

impl UnifiedErrorHandler {
    pub fn new() -> Self {
        Self {
            recent_errors: Arc::new(RwLock::new(Vec::new())),
            max_errors: 100,
        }
    }

    /// Handle an error with automatic logging
    pub async fn handle_error(&self, error: &SiteArchiverError, context: &str) {
        let severity = self.classify_error(error);

        match severity {
            ErrorSeverity::Critical => {
                error!("CRITICAL ERROR in {}: {}", context, error);
            }
            ErrorSeverity::Error => {
                error!("ERROR in {}: {}", context, error);
            }
            ErrorSeverity::Warning => {
                warn!("WARNING in {}: {}", context, error);
            }
            ErrorSeverity::Info => {
                info!("INFO in {}: {}", context, error);
            }
        }

        let entry = ErrorEntry {
            error: error.to_string(),
            severity,
            timestamp: chrono::Utc::now(),
            context: context.to_string(),
        };

        self.add_error_entry(entry).await;
    }

    /// Classify error severity
    ///
    /// Store faults threaten durable state; fetch faults are expected
    /// network weather; crawl faults are caller or capacity problems.
    fn classify_error(&self, error: &SiteArchiverError) -> ErrorSeverity {
        match error {
            SiteArchiverError::Store { .. } => ErrorSeverity::Critical,
            SiteArchiverError::Fetch { .. } => ErrorSeverity::Warning,
            SiteArchiverError::Crawl { .. } => ErrorSeverity::Error,
        }
    }

    /// Add an error entry to the history
    async fn add_error_entry(&self, entry: ErrorEntry) {
        let mut errors = self.recent_errors.write().await;
        errors.push(entry);

        // Keep only recent errors
        if errors.len() > self.max_errors {
            let excess = errors.len() - self.max_errors;
            errors.drain(0..excess);
        }
    }

    /// Get recent errors
    pub async fn get_recent_errors(&self) -> Vec<ErrorEntry> {
        self.recent_errors.read().await.clone()
    }

    /// Get error statistics
    pub async fn get_error_stats(&self) -> ErrorStatistics {
        let errors = self.recent_errors.read().await;

        let mut stats = ErrorStatistics::default();
        for entry in errors.iter() {
            match entry.severity {
                ErrorSeverity::Critical => stats.critical_count += 1,
                ErrorSeverity::Error => stats.error_count += 1,
                ErrorSeverity::Warning => stats.warning_count += 1,
                ErrorSeverity::Info => stats.info_count += 1,
            }
        }
        stats.total = errors.len();
        stats
    }

    /// Clear the tracked history
    pub async fn clear(&self) {
        self.recent_errors.write().await.clear();
    }
}

impl Default for UnifiedErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Error statistics
#[derive(Debug, Clone, Default)]
pub struct ErrorStatistics {
    pub total: usize,
    pub critical_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_archiver_core::{CrawlError, FetchError, StoreError};

    fn handler() -> UnifiedErrorHandler {
        UnifiedErrorHandler::new()
    }

    #[tokio::test]
    async fn test_errors_are_recorded_and_classified() {
        let handler = handler();

        let fetch: SiteArchiverError = FetchError::RequestFailed {
            url: "https://ex.test/a".into(),
            details: "refused".into(),
        }
        .into();
        let store: SiteArchiverError = StoreError::Io {
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        }
        .into();
        let crawl: SiteArchiverError = CrawlError::JobLimitReached { limit: 4 }.into();

        handler.handle_error(&fetch, "fetch").await;
        handler.handle_error(&store, "store").await;
        handler.handle_error(&crawl, "service").await;

        let stats = handler.get_error_stats().await;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.warning_count, 1);
        assert_eq!(stats.critical_count, 1);
        assert_eq!(stats.error_count, 1);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let handler = handler();
        for i in 0..150 {
            let e: SiteArchiverError = CrawlError::Orchestration {
                details: format!("fault {}", i),
            }
            .into();
            handler.handle_error(&e, "loop").await;
        }
        assert_eq!(handler.get_recent_errors().await.len(), 100);
    }
}
