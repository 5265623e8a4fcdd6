//! In-memory capture job store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use tabmark_core::{BrowserLauncherPrefs, CaptureJob, CapturedTabInput, Error, Result};

/// Mutation applied to a stored job under the store lock.
pub type JobMutator = Box<dyn FnOnce(&mut CaptureJob) + Send>;

/// Box a closure as a [`JobMutator`].
pub fn job_mutator(f: impl FnOnce(&mut CaptureJob) + Send + 'static) -> JobMutator {
    Box::new(f)
}

/// Keyed store of capture jobs.
///
/// `update` runs its mutator while holding the store lock, so concurrent
/// tab workers never lose each other's counter increments and readers
/// never observe a half-applied outcome.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Allocate a new pending job.
    async fn create(
        &self,
        user_id: Uuid,
        tabs: Vec<CapturedTabInput>,
        prefs: BrowserLauncherPrefs,
    ) -> Result<CaptureJob>;

    /// Snapshot of a job.
    async fn get(&self, id: Uuid) -> Result<Option<CaptureJob>>;

    /// Apply `mutator` atomically and return the resulting snapshot.
    /// Missing job → `Error::JobNotFound`.
    async fn update(&self, id: Uuid, mutator: JobMutator) -> Result<CaptureJob>;

    /// Drop a job.
    async fn remove(&self, id: Uuid) -> Result<Option<CaptureJob>>;

    /// Remove terminal jobs whose `completed_at` is at least `ttl` before
    /// `now`. Returns the number removed.
    async fn evict_expired_at(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> Result<usize>;

    /// Number of stored jobs.
    async fn len(&self) -> usize;

    /// [`JobStore::evict_expired_at`] against the wall clock.
    async fn evict_expired(&self, ttl: chrono::Duration) -> Result<usize> {
        self.evict_expired_at(ttl, Utc::now()).await
    }
}

/// Process-local job store. Jobs do not survive a restart.
#[derive(Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<Uuid, CaptureJob>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(
        &self,
        user_id: Uuid,
        tabs: Vec<CapturedTabInput>,
        prefs: BrowserLauncherPrefs,
    ) -> Result<CaptureJob> {
        let job = CaptureJob::new(user_id, tabs, prefs);
        self.jobs.write().await.insert(job.id, job.clone());
        debug!(
            subsystem = "capture",
            component = "job_store",
            op = "create",
            job_id = %job.id,
            tabs = job.tabs.len(),
            "Capture job created"
        );
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<Option<CaptureJob>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, mutator: JobMutator) -> Result<CaptureJob> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        mutator(job);
        Ok(job.clone())
    }

    async fn remove(&self, id: Uuid) -> Result<Option<CaptureJob>> {
        Ok(self.jobs.write().await.remove(&id))
    }

    async fn evict_expired_at(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - ttl;
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| {
            !(job.status.is_terminal()
                && job.completed_at.map(|at| at <= cutoff).unwrap_or(false))
        });
        Ok(before - jobs.len())
    }

    async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

/// Spawn the periodic eviction task.
pub fn spawn_sweeper(store: Arc<dyn JobStore>, ttl: Duration, every: Duration) -> JoinHandle<()> {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
    tokio::spawn(async move {
        info!(
            subsystem = "capture",
            component = "sweeper",
            ttl_secs = ttl.num_seconds(),
            interval_secs = every.as_secs(),
            "Capture job sweeper started"
        );
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.evict_expired(ttl).await {
                Ok(0) => {}
                Ok(removed) => debug!(
                    subsystem = "capture",
                    component = "sweeper",
                    op = "evict",
                    removed,
                    "Evicted expired capture jobs"
                ),
                Err(e) => tracing::warn!(error = %e, "Capture job sweep failed"),
            }
        }
    })
}
