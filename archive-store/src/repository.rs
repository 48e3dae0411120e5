//! Job repository: the single source of truth for job status and records

use async_trait::async_trait;
use chrono::Utc;
use site_archiver_core::*;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Repository trait for archive jobs
///
/// `save_page` and `save_asset` write the captured bytes to disk before
/// recording them in the index; if the index write then fails the file is
/// orphaned, which is acceptable (reconciled by a re-crawl, never cleaned
/// automatically).
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, seed_url: &str, domain: &str) -> Result<ArchiveJob>;
    async fn update(&self, job_id: Uuid, update: JobUpdate) -> Result<ArchiveJob>;
    async fn get(&self, job_id: Uuid) -> Result<ArchiveJob>;
    async fn list(&self) -> Result<Vec<ArchiveJob>>;
    async fn list_by_domain(&self, domain: &str) -> Result<Vec<ArchiveJob>>;
    async fn save_page(
        &self,
        job_id: Uuid,
        relative_path: &str,
        html: &str,
        source_url: &str,
    ) -> Result<PageRecord>;
    async fn save_asset(
        &self,
        job_id: Uuid,
        relative_path: &str,
        bytes: &[u8],
        source_url: &str,
    ) -> Result<AssetRecord>;
    async fn read_file(&self, job_id: Uuid, relative_path: &str) -> Result<Vec<u8>>;
    async fn delete(&self, job_id: Uuid) -> Result<()>;
}

const INDEX_FILE: &str = "index.json";

/// Filesystem implementation of [`JobStore`]
///
/// The whole index is read, modified and rewritten on every mutation.
/// `index_lock` serializes those cycles across tasks in this process so a
/// concurrent job cannot overwrite another job's update.
pub struct FsJobStore {
    root: PathBuf,
    index_lock: Mutex<()>,
}

impl FsJobStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            index_lock: Mutex::new(()),
        }
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn job_dir(&self, job_id: Uuid) -> PathBuf {
        self.root.join(job_id.to_string())
    }

    /// Reject absolute paths and parent-directory traversal
    fn checked_path(&self, job_id: Uuid, relative_path: &str) -> Result<PathBuf> {
        let rel = Path::new(relative_path);
        if rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(StoreError::InvalidPath {
                path: relative_path.to_string(),
            }
            .into());
        }
        Ok(self.job_dir(job_id).join(rel))
    }

    async fn read_index(&self) -> Result<Vec<ArchiveJob>> {
        match tokio::fs::read(self.index_path()).await {
            Ok(bytes) => {
                let jobs = serde_json::from_slice(&bytes).map_err(StoreError::from)?;
                Ok(jobs)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StoreError::from(e).into()),
        }
    }

    async fn write_index(&self, jobs: &[ArchiveJob]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(jobs).map_err(StoreError::from)?;
        tokio::fs::write(self.index_path(), bytes)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    async fn write_job_file(&self, job_id: Uuid, relative_path: &str, bytes: &[u8]) -> Result<()> {
        let path = self.checked_path(job_id, relative_path)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StoreError::from)?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(StoreError::from)?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

fn find_job(jobs: &mut [ArchiveJob], job_id: Uuid) -> Result<&mut ArchiveJob> {
    jobs.iter_mut()
        .find(|j| j.id == job_id)
        .ok_or_else(|| StoreError::JobNotFound { job_id }.into())
}

fn newest_first(mut jobs: Vec<ArchiveJob>) -> Vec<ArchiveJob> {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    jobs
}

#[async_trait]
impl JobStore for FsJobStore {
    async fn create(&self, seed_url: &str, domain: &str) -> Result<ArchiveJob> {
        let job = ArchiveJob::new(seed_url.to_string(), domain.to_string());

        tokio::fs::create_dir_all(self.job_dir(job.id))
            .await
            .map_err(StoreError::from)?;

        let _guard = self.index_lock.lock().await;
        let mut jobs = self.read_index().await?;
        jobs.push(job.clone());
        self.write_index(&jobs).await?;

        tracing::info!("Created archive job {} for {}", job.id, seed_url);
        Ok(job)
    }

    async fn update(&self, job_id: Uuid, update: JobUpdate) -> Result<ArchiveJob> {
        let _guard = self.index_lock.lock().await;
        let mut jobs = self.read_index().await?;
        let job = find_job(&mut jobs, job_id)?;

        if let Some(next) = update.status {
            if !job.status.can_transition_to(next) {
                return Err(StoreError::InvalidTransition {
                    from: job.status.to_string(),
                    to: next.to_string(),
                }
                .into());
            }
            job.status = next;
        }
        if let Some(error) = update.error {
            job.error = Some(error);
        }
        if let Some(completed_at) = update.completed_at {
            job.completed_at = Some(completed_at);
        }
        job.updated_at = Utc::now();

        let updated = job.clone();
        self.write_index(&jobs).await?;
        Ok(updated)
    }

    async fn get(&self, job_id: Uuid) -> Result<ArchiveJob> {
        let jobs = self.read_index().await?;
        jobs.into_iter()
            .find(|j| j.id == job_id)
            .ok_or_else(|| StoreError::JobNotFound { job_id }.into())
    }

    async fn list(&self) -> Result<Vec<ArchiveJob>> {
        Ok(newest_first(self.read_index().await?))
    }

    async fn list_by_domain(&self, domain: &str) -> Result<Vec<ArchiveJob>> {
        let jobs = self.read_index().await?;
        Ok(newest_first(
            jobs.into_iter().filter(|j| j.domain == domain).collect(),
        ))
    }

    async fn save_page(
        &self,
        job_id: Uuid,
        relative_path: &str,
        html: &str,
        source_url: &str,
    ) -> Result<PageRecord> {
        // File first, index second: an index failure leaves an orphaned
        // file rather than a record pointing at nothing.
        self.write_job_file(job_id, relative_path, html.as_bytes())
            .await?;

        let record = PageRecord {
            url: source_url.to_string(),
            local_path: relative_path.to_string(),
            archived_at: Utc::now(),
        };

        let _guard = self.index_lock.lock().await;
        let mut jobs = self.read_index().await?;
        let job = find_job(&mut jobs, job_id)?;
        if job.status.is_terminal() {
            return Err(StoreError::JobFinalized { job_id }.into());
        }
        job.pages.push(record.clone());
        job.pages_archived = job.pages.len() as u32;
        job.updated_at = Utc::now();
        self.write_index(&jobs).await?;

        Ok(record)
    }

    async fn save_asset(
        &self,
        job_id: Uuid,
        relative_path: &str,
        bytes: &[u8],
        source_url: &str,
    ) -> Result<AssetRecord> {
        self.write_job_file(job_id, relative_path, bytes).await?;

        let record = AssetRecord {
            url: source_url.to_string(),
            local_path: relative_path.to_string(),
            archived_at: Utc::now(),
        };

        let _guard = self.index_lock.lock().await;
        let mut jobs = self.read_index().await?;
        let job = find_job(&mut jobs, job_id)?;
        if job.status.is_terminal() {
            return Err(StoreError::JobFinalized { job_id }.into());
        }
        job.assets.push(record.clone());
        job.updated_at = Utc::now();
        self.write_index(&jobs).await?;

        Ok(record)
    }

    async fn read_file(&self, job_id: Uuid, relative_path: &str) -> Result<Vec<u8>> {
        let path = self.checked_path(job_id, relative_path)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::FileNotFound {
                path: relative_path.to_string(),
            }
            .into()),
            Err(e) => Err(StoreError::from(e).into()),
        }
    }

    async fn delete(&self, job_id: Uuid) -> Result<()> {
        let _guard = self.index_lock.lock().await;
        let mut jobs = self.read_index().await?;
        let before = jobs.len();
        jobs.retain(|j| j.id != job_id);
        if jobs.len() == before {
            return Err(StoreError::JobNotFound { job_id }.into());
        }
        self.write_index(&jobs).await?;
        drop(_guard);

        if let Err(e) = tokio::fs::remove_dir_all(self.job_dir(job_id)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove job directory for {}: {}", job_id, e);
            }
        }
        tracing::info!("Deleted archive job {}", job_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (FsJobStore, TempDir) {
        let dir = TempDir::new().unwrap();
        (FsJobStore::new(dir.path().to_path_buf()), dir)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (store, _dir) = store().await;
        let job = store.create("https://ex.test/", "ex.test").await.unwrap();

        let fetched = store.get(job.id).await.unwrap();
        assert_eq!(fetched.id, job.id);
        assert_eq!(fetched.status, JobStatus::Pending);
        assert_eq!(fetched.domain, "ex.test");
    }

    #[tokio::test]
    async fn test_get_unknown_job_is_not_found() {
        let (store, _dir) = store().await;
        let err = store.get(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (store, _dir) = store().await;
        let first = store.create("https://a.test/", "a.test").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.create("https://b.test/", "b.test").await.unwrap();

        let jobs = store.list().await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, second.id);
        assert_eq!(jobs[1].id, first.id);
    }

    #[tokio::test]
    async fn test_list_by_domain_filters() {
        let (store, _dir) = store().await;
        store.create("https://a.test/", "a.test").await.unwrap();
        store.create("https://b.test/", "b.test").await.unwrap();

        let jobs = store.list_by_domain("a.test").await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].domain, "a.test");
    }

    #[tokio::test]
    async fn test_update_merges_fields_and_stamps_time() {
        let (store, _dir) = store().await;
        let job = store.create("https://ex.test/", "ex.test").await.unwrap();

        let updated = store
            .update(job.id, JobUpdate::status(JobStatus::Processing))
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::Processing);
        assert!(updated.updated_at >= job.updated_at);
    }

    #[tokio::test]
    async fn test_update_rejects_backwards_transition() {
        let (store, _dir) = store().await;
        let job = store.create("https://ex.test/", "ex.test").await.unwrap();
        store
            .update(job.id, JobUpdate::status(JobStatus::Processing))
            .await
            .unwrap();
        store.update(job.id, JobUpdate::completed()).await.unwrap();

        let err = store
            .update(job.id, JobUpdate::status(JobStatus::Processing))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SiteArchiverError::Store {
                source: StoreError::InvalidTransition { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_save_page_writes_file_and_record() {
        let (store, _dir) = store().await;
        let job = store.create("https://ex.test/", "ex.test").await.unwrap();
        store
            .update(job.id, JobUpdate::status(JobStatus::Processing))
            .await
            .unwrap();

        let record = store
            .save_page(job.id, "index.html", "<html></html>", "https://ex.test/")
            .await
            .unwrap();
        assert_eq!(record.local_path, "index.html");

        let bytes = store.read_file(job.id, "index.html").await.unwrap();
        assert_eq!(bytes, b"<html></html>");

        let job = store.get(job.id).await.unwrap();
        assert_eq!(job.pages_archived, 1);
        assert_eq!(job.pages.len(), 1);
        assert_eq!(job.pages[0].url, "https://ex.test/");
    }

    #[tokio::test]
    async fn test_save_asset_in_nested_directory() {
        let (store, _dir) = store().await;
        let job = store.create("https://ex.test/", "ex.test").await.unwrap();

        store
            .save_asset(
                job.id,
                "assets/img/logo.png",
                &[1, 2, 3],
                "https://ex.test/img/logo.png",
            )
            .await
            .unwrap();

        let bytes = store.read_file(job.id, "assets/img/logo.png").await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);

        let job = store.get(job.id).await.unwrap();
        assert_eq!(job.assets.len(), 1);
        // Asset appends never count toward pages_archived
        assert_eq!(job.pages_archived, 0);
    }

    #[tokio::test]
    async fn test_terminal_outcome_is_set_exactly_once() {
        let (store, _dir) = store().await;
        let job = store.create("https://ex.test/", "ex.test").await.unwrap();
        store
            .update(job.id, JobUpdate::status(JobStatus::Processing))
            .await
            .unwrap();
        let failed = store
            .update(job.id, JobUpdate::failed("first fault"))
            .await
            .unwrap();

        // A second terminal update must not restamp the outcome
        let err = store
            .update(job.id, JobUpdate::failed("second fault"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SiteArchiverError::Store {
                source: StoreError::InvalidTransition { .. }
            }
        ));

        let job = store.get(job.id).await.unwrap();
        assert_eq!(job.error.as_deref(), Some("first fault"));
        assert_eq!(job.completed_at, failed.completed_at);

        let err = store
            .update(job.id, JobUpdate::completed())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SiteArchiverError::Store {
                source: StoreError::InvalidTransition { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_no_appends_after_terminal_state() {
        let (store, _dir) = store().await;
        let job = store.create("https://ex.test/", "ex.test").await.unwrap();
        store
            .update(job.id, JobUpdate::status(JobStatus::Processing))
            .await
            .unwrap();
        store.update(job.id, JobUpdate::completed()).await.unwrap();

        let err = store
            .save_page(job.id, "late.html", "<html></html>", "https://ex.test/late")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SiteArchiverError::Store {
                source: StoreError::JobFinalized { .. }
            }
        ));

        let job = store.get(job.id).await.unwrap();
        assert_eq!(job.pages_archived, 0);
    }

    #[tokio::test]
    async fn test_read_file_rejects_traversal() {
        let (store, _dir) = store().await;
        let job = store.create("https://ex.test/", "ex.test").await.unwrap();

        let err = store.read_file(job.id, "../index.json").await.unwrap_err();
        assert!(matches!(
            err,
            SiteArchiverError::Store {
                source: StoreError::InvalidPath { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_entry_and_files() {
        let (store, _dir) = store().await;
        let job = store.create("https://ex.test/", "ex.test").await.unwrap();
        store
            .save_page(job.id, "index.html", "<html></html>", "https://ex.test/")
            .await
            .unwrap();

        store.delete(job.id).await.unwrap();

        assert!(store.get(job.id).await.unwrap_err().is_not_found());
        assert!(store
            .read_file(job.id, "index.html")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_delete_unknown_job_is_not_found() {
        let (store, _dir) = store().await;
        let err = store.delete(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let (store, _dir) = store().await;
        let store = std::sync::Arc::new(store);
        let a = store.create("https://a.test/", "a.test").await.unwrap();
        let b = store.create("https://b.test/", "b.test").await.unwrap();

        let (sa, sb) = (store.clone(), store.clone());
        let ta = tokio::spawn(async move {
            sa.update(a.id, JobUpdate::status(JobStatus::Processing))
                .await
        });
        let tb = tokio::spawn(async move {
            sb.update(b.id, JobUpdate::status(JobStatus::Processing))
                .await
        });
        ta.await.unwrap().unwrap();
        tb.await.unwrap().unwrap();

        assert_eq!(
            store.get(a.id).await.unwrap().status,
            JobStatus::Processing
        );
        assert_eq!(
            store.get(b.id).await.unwrap().status,
            JobStatus::Processing
        );
    }
}
