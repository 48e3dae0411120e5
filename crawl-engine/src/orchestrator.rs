//! Crawl orchestrator
//!
//! Drives one job from `pending` to a terminal state: breadth-first
//! same-domain traversal, strictly sequential page processing, capped
//! by page count and depth. Individual page failures are logged and
//! skipped; only faults outside the page loop (store unavailable, seed
//! unparseable) fail the job.

use crate::assets::AssetPipeline;
use crate::paths;
use site_archiver_core::*;
use archive_store::JobStore;
use page_fetcher::{FetchEngine, Fetcher, FetcherConfig};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Traversal limits and pacing for one crawl
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Most pages one job will capture
    pub max_pages: usize,
    /// Seed is depth 0; links past this depth are discarded
    pub max_depth: u32,
    /// Politeness delay between successive page fetches
    pub page_delay: Duration,
    pub fetcher: FetcherConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            max_depth: 3,
            page_delay: Duration::from_secs(1),
            fetcher: FetcherConfig::default(),
        }
    }
}

/// Runs one archive job end to end
pub struct CrawlOrchestrator {
    store: Arc<dyn JobStore>,
    pipeline: AssetPipeline,
    config: CrawlConfig,
}

impl CrawlOrchestrator {
    pub fn new(store: Arc<dyn JobStore>, config: CrawlConfig) -> Self {
        let pipeline = AssetPipeline::new(store.clone());
        Self {
            store,
            pipeline,
            config,
        }
    }

    /// Drive the job to a terminal state; never returns an error
    ///
    /// The outcome lands in the store: `completed` with `completed_at`
    /// on a clean loop exit, `failed` with the fault message otherwise.
    pub async fn run(&self, job: ArchiveJob) {
        tracing::info!("Starting crawl of {} (job {})", job.url, job.id);
        let outcome = self.execute(&job).await;
        self.finalize(&job, outcome).await;
    }

    /// Like [`run`](Self::run), but with an injected fetcher
    ///
    /// Tests drive whole jobs through here with in-memory fetchers.
    pub async fn run_with_fetcher(&self, job: ArchiveJob, fetcher: &dyn Fetcher) {
        tracing::info!("Starting crawl of {} (job {})", job.url, job.id);
        let outcome = match self
            .store
            .update(job.id, JobUpdate::status(JobStatus::Processing))
            .await
        {
            Ok(_) => self.crawl(&job, fetcher).await,
            Err(e) => Err(e),
        };
        self.finalize(&job, outcome).await;
    }

    async fn execute(&self, job: &ArchiveJob) -> Result<usize> {
        self.store
            .update(job.id, JobUpdate::status(JobStatus::Processing))
            .await?;

        let engine = FetchEngine::start(self.config.fetcher.clone()).await?;
        let outcome = self.crawl(job, &engine).await;
        engine.shutdown().await;
        outcome
    }

    async fn finalize(&self, job: &ArchiveJob, outcome: Result<usize>) {
        let update = match &outcome {
            Ok(pages) => {
                tracing::info!("Crawl of {} completed: {} pages", job.url, pages);
                JobUpdate::completed()
            }
            Err(e) => {
                tracing::warn!("Crawl of {} failed: {}", job.url, e);
                JobUpdate::failed(e.to_string())
            }
        };

        if let Err(e) = self.store.update(job.id, update).await {
            tracing::warn!("Failed to finalize job {}: {}", job.id, e);
        }
    }

    /// Breadth-first traversal with an injected fetcher
    ///
    /// Public seam: tests drive crawls with in-memory fetchers.
    pub async fn crawl(&self, job: &ArchiveJob, fetcher: &dyn Fetcher) -> Result<usize> {
        Url::parse(&job.url).map_err(|_| CrawlError::InvalidSeedUrl {
            url: job.url.clone(),
        })?;

        let mut visited: HashSet<String> = HashSet::new();
        let mut populated: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, u32)> = VecDeque::new();
        queue.push_back((job.url.clone(), 0));

        while let Some((url, depth)) = queue.pop_front() {
            if visited.len() >= self.config.max_pages {
                tracing::debug!("Page cap {} reached for job {}", self.config.max_pages, job.id);
                break;
            }
            if depth > self.config.max_depth || visited.contains(&url) {
                continue;
            }

            if !visited.is_empty() {
                tokio::time::sleep(self.config.page_delay).await;
            }
            visited.insert(url.clone());

            match self
                .capture_page(job, fetcher, &url, &mut populated)
                .await
            {
                Ok(links) => {
                    if depth < self.config.max_depth {
                        for link in links {
                            if !visited.contains(&link) {
                                queue.push_back((link, depth + 1));
                            }
                        }
                    }
                }
                // A lost page shrinks the archive; it never fails the job
                Err(e) => {
                    tracing::warn!("Skipping page {}: {}", url, e);
                }
            }
        }

        Ok(visited.len())
    }

    /// Fetch, process, and persist one page; returns same-domain links
    async fn capture_page(
        &self,
        job: &ArchiveJob,
        fetcher: &dyn Fetcher,
        url: &str,
        populated: &mut HashSet<String>,
    ) -> Result<Vec<String>> {
        let page_url = Url::parse(url).map_err(|_| CrawlError::InvalidSeedUrl {
            url: url.to_string(),
        })?;

        let html = fetcher.fetch_page(url).await?;
        let processed = self
            .pipeline
            .process_page(fetcher, job.id, &page_url, &html, populated)
            .await?;

        let local_path = paths::page_local_path(&page_url);
        self.store
            .save_page(job.id, &local_path, &processed.html, url)
            .await?;
        tracing::info!("Archived {} -> {}", url, local_path);

        let links = processed
            .links
            .into_iter()
            .filter(|link| {
                Url::parse(link)
                    .ok()
                    .and_then(|u| u.host_str().map(|h| h == job.domain))
                    .unwrap_or(false)
            })
            .collect();
        Ok(links)
    }
}
