//! External service API
//!
//! The operations an HTTP front door (not part of this workspace) would
//! expose: start a job, poll it, list archives, read archived files,
//! delete an archive. Job execution is asynchronous; `start_archiving`
//! acknowledges immediately and the crawl runs on its own task.

use crate::orchestrator::{CrawlConfig, CrawlOrchestrator};
use site_archiver_core::*;
use archive_store::JobStore;
use std::sync::Arc;
use tokio::sync::Semaphore;
use url::Url;

/// Default ceiling on concurrently running jobs
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;

/// Facade over the store and orchestrator
pub struct ArchiveService {
    store: Arc<dyn JobStore>,
    config: CrawlConfig,
    job_slots: Arc<Semaphore>,
    max_jobs: usize,
}

impl ArchiveService {
    pub fn new(store: Arc<dyn JobStore>, config: CrawlConfig, max_jobs: usize) -> Self {
        Self {
            store,
            config,
            job_slots: Arc::new(Semaphore::new(max_jobs)),
            max_jobs,
        }
    }

    /// Validate the seed, create the job, and spawn its crawl
    ///
    /// Rejects with `JobLimitReached` when all job slots are taken;
    /// callers retry later rather than queueing unbounded work.
    pub async fn start_archiving(&self, url: &str) -> Result<StartedJob> {
        let parsed = Url::parse(url).map_err(|_| CrawlError::InvalidSeedUrl {
            url: url.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CrawlError::InvalidSeedUrl {
                url: url.to_string(),
            }
            .into());
        }
        let domain = parsed
            .host_str()
            .ok_or_else(|| CrawlError::InvalidSeedUrl {
                url: url.to_string(),
            })?
            .to_string();

        let permit = self
            .job_slots
            .clone()
            .try_acquire_owned()
            .map_err(|_| CrawlError::JobLimitReached {
                limit: self.max_jobs,
            })?;

        let job = self.store.create(url, &domain).await?;
        let started = StartedJob {
            job_id: job.id,
            status: "started".to_string(),
            url: job.url.clone(),
            domain: job.domain.clone(),
        };

        let orchestrator = CrawlOrchestrator::new(self.store.clone(), self.config.clone());
        tokio::spawn(async move {
            let _permit = permit;
            orchestrator.run(job).await;
        });

        Ok(started)
    }

    /// Point-in-time view of one job
    pub async fn get_job_status(&self, job_id: Uuid) -> Result<JobStatusReport> {
        let job = self.store.get(job_id).await?;
        Ok(JobStatusReport::from(&job))
    }

    /// All archives, newest first, optionally filtered by domain
    pub async fn list_archives(&self, domain: Option<&str>) -> Result<Vec<ArchiveSummary>> {
        let jobs = match domain {
            Some(domain) => self.store.list_by_domain(domain).await?,
            None => self.store.list().await?,
        };
        Ok(jobs.iter().map(ArchiveSummary::from).collect())
    }

    /// Raw bytes of an archived file; content-type is the caller's job
    pub async fn get_archived_file(&self, job_id: Uuid, relative_path: &str) -> Result<Vec<u8>> {
        self.store.read_file(job_id, relative_path).await
    }

    /// Remove an archive's files and its index entry
    pub async fn delete_archive(&self, job_id: Uuid) -> Result<()> {
        self.store.delete(job_id).await
    }
}
