//! Shared data model for the site archiver
//!
//! An [`ArchiveJob`] is one end-to-end request to archive a seed URL and
//! everything discovered beneath it on the same domain. Jobs own an
//! append-only list of captured [`PageRecord`]s and [`AssetRecord`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an archive job
///
/// Transitions are monotonic: `Pending → Processing → {Completed, Failed}`.
/// Once a terminal state is reached no further records may be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether the job has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition
    ///
    /// Terminal states admit no transitions at all, not even to
    /// themselves: the terminal outcome is set exactly once.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, JobStatus::Processing) => true,
            (JobStatus::Processing, JobStatus::Completed) => true,
            (JobStatus::Processing, JobStatus::Failed) => true,
            // Pending jobs may fail before entering the loop (e.g. the
            // store became unreadable while seeding the traversal).
            (JobStatus::Pending, JobStatus::Failed) => true,
            (a, b) => *a == b && !a.is_terminal(),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One captured HTML page within a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Source URL the page was fetched from
    pub url: String,
    /// Path of the stored file, relative to the job directory
    pub local_path: String,
    /// When the capture completed
    pub archived_at: DateTime<Utc>,
}

/// One captured asset (image, stylesheet, script) within a job
///
/// `local_path` is unique per job: two distinct source URLs never map to
/// the same stored path (see path derivation in `crawl-engine`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub url: String,
    pub local_path: String,
    pub archived_at: DateTime<Utc>,
}

/// Durable record of one archive job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveJob {
    /// Opaque unique identifier; also names the job's directory on disk
    pub id: Uuid,
    /// The seed URL the crawl started from
    pub url: String,
    /// Host of the seed URL; traversal never leaves it
    pub domain: String,
    pub status: JobStatus,
    /// Failure message, set only when `status` is `Failed`
    pub error: Option<String>,
    /// Count of captured pages; always equals `pages.len()`
    pub pages_archived: u32,
    /// Captured pages, in capture order
    pub pages: Vec<PageRecord>,
    /// Captured assets, in capture order
    pub assets: Vec<AssetRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ArchiveJob {
    /// Create a fresh pending job for a seed URL
    pub fn new(url: String, domain: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            url,
            domain,
            status: JobStatus::Pending,
            error: None,
            pages_archived: 0,
            pages: Vec::new(),
            assets: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

/// Partial field set merged into a job by `JobStore::update`
///
/// Only the populated fields are applied; `updated_at` is stamped by the
/// store on every merge.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Terminal success update
    pub fn completed() -> Self {
        Self {
            status: Some(JobStatus::Completed),
            completed_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Terminal failure update carrying the captured error message
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
        }
    }
}

/// Immediate acknowledgement returned by `start_archiving`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedJob {
    pub job_id: Uuid,
    pub status: String,
    pub url: String,
    pub domain: String,
}

/// Point-in-time view of a job returned by `get_job_status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub url: String,
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    pub pages_archived: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One row of `list_archives`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub job_id: Uuid,
    pub url: String,
    pub domain: String,
    /// Last time the job changed, mirroring `JobStatusReport::timestamp`
    pub timestamp: DateTime<Utc>,
    pub status: JobStatus,
    pub pages_archived: u32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&ArchiveJob> for JobStatusReport {
    fn from(job: &ArchiveJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            url: job.url.clone(),
            domain: job.domain.clone(),
            timestamp: job.updated_at,
            pages_archived: job.pages_archived,
            error: job.error.clone(),
        }
    }
}

impl From<&ArchiveJob> for ArchiveSummary {
    fn from(job: &ArchiveJob) -> Self {
        Self {
            job_id: job.id,
            url: job.url.clone(),
            domain: job.domain.clone(),
            timestamp: job.updated_at,
            status: job.status,
            pages_archived: job.pages_archived,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&JobStatus::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn test_legal_transitions() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn test_terminal_states_admit_no_transitions() {
        for terminal in [JobStatus::Completed, JobStatus::Failed] {
            for next in [
                JobStatus::Pending,
                JobStatus::Processing,
                JobStatus::Completed,
                JobStatus::Failed,
            ] {
                assert!(
                    !terminal.can_transition_to(next),
                    "{} must not transition to {}",
                    terminal,
                    next
                );
            }
        }
        // Non-terminal self-transitions stay legal
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Processing));
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_new_job_is_pending_and_empty() {
        let job = ArchiveJob::new("https://ex.test/".into(), "ex.test".into());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.pages_archived, 0);
        assert!(job.pages.is_empty());
        assert!(job.assets.is_empty());
        assert!(job.error.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_summary_mirrors_the_job_view() {
        let mut job = ArchiveJob::new("https://ex.test/".into(), "ex.test".into());
        job.updated_at = Utc::now();

        let summary = ArchiveSummary::from(&job);
        assert_eq!(summary.job_id, job.id);
        assert_eq!(summary.timestamp, job.updated_at);
        assert_eq!(summary.created_at, job.created_at);
        assert_eq!(summary.pages_archived, 0);
        assert!(summary.completed_at.is_none());
    }

    #[test]
    fn test_failed_update_carries_message() {
        let update = JobUpdate::failed("store unreadable");
        assert_eq!(update.status, Some(JobStatus::Failed));
        assert_eq!(update.error.as_deref(), Some("store unreadable"));
        assert!(update.completed_at.is_some());
    }
}
