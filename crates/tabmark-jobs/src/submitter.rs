//! Capture job submission and background processing.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tracing::{error, info, warn};
use uuid::Uuid;

use tabmark_core::{defaults, CaptureJob, CaptureRequest, Error, Result, TabOutcome};

use crate::processor::TabProcessor;
use crate::store::{job_mutator, JobStore};

/// Which [`TabProcessor`] capture jobs run through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureMode {
    /// Save tabs as bookmarks.
    #[default]
    Bookmark,
    /// Randomized outcomes with artificial delays.
    Simulated,
}

impl CaptureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Bookmark => "bookmark",
            CaptureMode::Simulated => "simulated",
        }
    }
}

impl FromStr for CaptureMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bookmark" => Ok(CaptureMode::Bookmark),
            "simulated" => Ok(CaptureMode::Simulated),
            other => Err(Error::Config(format!(
                "Invalid CAPTURE_MODE '{}'. Expected 'bookmark' or 'simulated'",
                other
            ))),
        }
    }
}

/// Configuration for capture processing.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub mode: CaptureMode,
    /// Tabs of one job processed at the same time.
    pub tab_concurrency: usize,
    /// Upper bound on a whole job; the job fails when exceeded.
    pub job_timeout: Duration,
    /// How long finished jobs stay readable.
    pub job_ttl: Duration,
    pub sweep_interval: Duration,
    /// Poll interval of status streams.
    pub stream_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mode: CaptureMode::default(),
            tab_concurrency: defaults::CAPTURE_TAB_CONCURRENCY,
            job_timeout: Duration::from_secs(defaults::CAPTURE_JOB_TIMEOUT_SECS),
            job_ttl: Duration::from_secs(defaults::CAPTURE_JOB_TTL_SECS),
            sweep_interval: Duration::from_secs(defaults::CAPTURE_SWEEP_INTERVAL_SECS),
            stream_interval: Duration::from_millis(defaults::CAPTURE_STREAM_INTERVAL_MS),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl CaptureConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CAPTURE_MODE` | `bookmark` | `bookmark` or `simulated` |
    /// | `CAPTURE_TAB_CONCURRENCY` | `1` | Tabs processed at once per job |
    /// | `CAPTURE_JOB_TIMEOUT_SECS` | `300` | Job timeout |
    /// | `CAPTURE_JOB_TTL_SECS` | `3600` | Retention of finished jobs |
    /// | `CAPTURE_STREAM_INTERVAL_MS` | `1000` | Status stream poll interval |
    pub fn from_env() -> Result<Self> {
        let mode = match std::env::var("CAPTURE_MODE") {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => CaptureMode::default(),
        };
        let base = Self::default();

        Ok(Self {
            mode,
            tab_concurrency: env_parse::<usize>("CAPTURE_TAB_CONCURRENCY")
                .unwrap_or(base.tab_concurrency)
                .max(1),
            job_timeout: env_parse::<u64>("CAPTURE_JOB_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(base.job_timeout),
            job_ttl: env_parse::<u64>("CAPTURE_JOB_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(base.job_ttl),
            sweep_interval: base.sweep_interval,
            stream_interval: env_parse::<u64>("CAPTURE_STREAM_INTERVAL_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(base.stream_interval),
        })
    }

    pub fn with_mode(mut self, mode: CaptureMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_tab_concurrency(mut self, n: usize) -> Self {
        self.tab_concurrency = n.max(1);
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_stream_interval(mut self, interval: Duration) -> Self {
        self.stream_interval = interval;
        self
    }
}

/// Validate a capture request against its own prefs.
pub fn validate_request(req: &CaptureRequest) -> Result<()> {
    if req.tabs.is_empty() {
        return Err(Error::InvalidInput("No tabs provided".to_string()));
    }
    if req.tabs.len() > req.prefs.max_tabs {
        return Err(Error::InvalidInput(format!(
            "Too many tabs: {} submitted. Maximum allowed: {}",
            req.tabs.len(),
            req.prefs.max_tabs
        )));
    }
    if let Some(i) = req.tabs.iter().position(|t| t.url.trim().is_empty()) {
        return Err(Error::InvalidInput(format!("Tab {} has an empty URL", i)));
    }
    Ok(())
}

/// Accepts capture requests and runs them in the background.
#[derive(Clone)]
pub struct CaptureSubmitter {
    store: Arc<dyn JobStore>,
    processor: Arc<dyn TabProcessor>,
    config: CaptureConfig,
}

impl CaptureSubmitter {
    pub fn new(
        store: Arc<dyn JobStore>,
        processor: Arc<dyn TabProcessor>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            store,
            processor,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Validate, create the job, and start processing it. Returns as soon
    /// as the job exists; nothing is created when validation fails.
    pub async fn submit(&self, user_id: Uuid, req: CaptureRequest) -> Result<Uuid> {
        validate_request(&req)?;

        let job = self.store.create(user_id, req.tabs, req.prefs).await?;
        let job_id = job.id;

        info!(
            subsystem = "capture",
            component = "submitter",
            op = "submit",
            job_id = %job_id,
            tabs = job.tabs.len(),
            processor = self.processor.name(),
            "Capture job accepted"
        );

        tokio::spawn(supervise_job(
            self.store.clone(),
            self.processor.clone(),
            job_id,
            self.config.tab_concurrency,
            self.config.job_timeout,
        ));

        Ok(job_id)
    }
}

/// Run a job under the job timeout. A timeout or a panic in processing marks
/// the job failed; tabs not yet processed stay pending.
async fn supervise_job(
    store: Arc<dyn JobStore>,
    processor: Arc<dyn TabProcessor>,
    job_id: Uuid,
    concurrency: usize,
    timeout: Duration,
) {
    let start = Instant::now();
    let mut task = tokio::spawn(process_job(store.clone(), processor, job_id, concurrency));

    let failure = match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(())) => None,
        Ok(Err(join_error)) => {
            error!(job_id = %job_id, error = %join_error, "Capture task panicked");
            Some("Capture processing aborted unexpectedly".to_string())
        }
        Err(_) => {
            task.abort();
            warn!(
                job_id = %job_id,
                "Capture job exceeded timeout of {}s",
                timeout.as_secs()
            );
            Some(format!(
                "Capture job exceeded timeout of {}s",
                timeout.as_secs()
            ))
        }
    };

    match failure {
        None => info!(
            subsystem = "capture",
            component = "submitter",
            op = "complete",
            job_id = %job_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Capture job finished"
        ),
        Some(message) => {
            let result = store
                .update(
                    job_id,
                    job_mutator(move |job| {
                        job.mark_failed(message);
                    }),
                )
                .await;
            if let Err(e) = result {
                error!(job_id = %job_id, error = %e, "Failed to mark capture job as failed");
            }
        }
    }
}

/// Close out a job after every tab has been attempted. Tabs whose outcome
/// could not be recorded leave it incomplete, which fails the job.
fn finish_job(job: &mut CaptureJob) {
    if job.mark_completed() || job.status.is_terminal() {
        return;
    }
    let unrecorded = job.tabs.iter().filter(|t| !t.status.is_terminal()).count();
    job.mark_failed(format!(
        "Capture job ended with {} unrecorded tab(s)",
        unrecorded
    ));
}

async fn process_job(
    store: Arc<dyn JobStore>,
    processor: Arc<dyn TabProcessor>,
    job_id: Uuid,
    concurrency: usize,
) {
    let job = match store
        .update(job_id, job_mutator(|job| job.mark_processing()))
        .await
    {
        Ok(job) => job,
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "Capture job vanished before processing");
            return;
        }
    };

    let user_id = job.user_id;
    let prefs = Arc::new(job.prefs);

    futures::stream::iter(job.tabs.into_iter().enumerate())
        .for_each_concurrent(concurrency.max(1), |(index, tab)| {
            let store = store.clone();
            let processor = processor.clone();
            let prefs = prefs.clone();
            async move {
                let outcome = processor.process(user_id, &tab, &prefs).await;
                if let TabOutcome::Failed(reason) = &outcome {
                    warn!(job_id = %job_id, index, url = %tab.url, %reason, "Tab failed");
                }
                let result = store
                    .update(
                        job_id,
                        job_mutator(move |job| {
                            job.apply_outcome(index, outcome);
                        }),
                    )
                    .await;
                if let Err(e) = result {
                    warn!(job_id = %job_id, index, error = %e, "Failed to record tab outcome");
                }
            }
        })
        .await;

    let result = store
        .update(
            job_id,
            job_mutator(finish_job),
        )
        .await;
    match result {
        Ok(job) => info!(
            job_id = %job_id,
            status = ?job.status,
            saved = job.saved,
            duplicates = job.duplicates,
            failed = job.failed,
            "Capture job processed"
        ),
        Err(e) => warn!(job_id = %job_id, error = %e, "Failed to complete capture job"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabmark_core::{BrowserLauncherPrefs, CapturedTabInput, JobStatus, TabStatus};

    fn request(n: usize, max_tabs: usize) -> CaptureRequest {
        CaptureRequest {
            tabs: (0..n)
                .map(|i| CapturedTabInput {
                    url: format!("https://example.com/{}", i),
                    title: format!("Tab {}", i),
                    fav_icon_url: None,
                })
                .collect(),
            prefs: BrowserLauncherPrefs {
                max_tabs,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_validate_empty() {
        let err = validate_request(&request(0, 40)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: No tabs provided");
    }

    #[test]
    fn test_validate_too_many() {
        let err = validate_request(&request(41, 40)).unwrap_err();
        assert!(err.to_string().contains("Too many tabs: 41 submitted. Maximum allowed: 40"));
        assert!(validate_request(&request(40, 40)).is_ok());
    }

    #[test]
    fn test_validate_empty_url() {
        let mut req = request(3, 40);
        req.tabs[2].url = "   ".to_string();
        let err = validate_request(&req).unwrap_err();
        assert!(err.to_string().contains("Tab 2 has an empty URL"));
    }

    #[test]
    fn test_capture_mode_parse() {
        assert_eq!("Simulated".parse::<CaptureMode>().unwrap(), CaptureMode::Simulated);
        assert_eq!("bookmark".parse::<CaptureMode>().unwrap(), CaptureMode::Bookmark);
        assert!("random".parse::<CaptureMode>().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = CaptureConfig::default()
            .with_mode(CaptureMode::Simulated)
            .with_tab_concurrency(0)
            .with_job_timeout(Duration::from_secs(5));
        assert_eq!(config.mode, CaptureMode::Simulated);
        assert_eq!(config.tab_concurrency, 1);
        assert_eq!(config.job_timeout, Duration::from_secs(5));
        assert_eq!(config.stream_interval, Duration::from_millis(1000));
    }

    #[test]
    fn test_finish_job_completes_when_all_tabs_recorded() {
        let req = request(2, 40);
        let mut job = CaptureJob::new(Uuid::now_v7(), req.tabs, req.prefs);
        job.mark_processing();
        job.apply_outcome(0, TabOutcome::Saved);
        job.apply_outcome(1, TabOutcome::Duplicate);

        finish_job(&mut job);
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error.is_none());
    }

    #[test]
    fn test_finish_job_fails_with_unrecorded_tabs() {
        let req = request(3, 40);
        let mut job = CaptureJob::new(Uuid::now_v7(), req.tabs, req.prefs);
        job.mark_processing();
        job.apply_outcome(0, TabOutcome::Saved);

        finish_job(&mut job);
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            job.error.as_deref(),
            Some("Capture job ended with 2 unrecorded tab(s)")
        );
        assert!(job.completed_at.is_some());
        assert_eq!(job.tabs[1].status, TabStatus::Pending);
        assert!(job.counters_consistent());
    }

    #[test]
    fn test_finish_job_leaves_terminal_job_alone() {
        let req = request(1, 40);
        let mut job = CaptureJob::new(Uuid::now_v7(), req.tabs, req.prefs);
        job.mark_failed("Capture job exceeded timeout of 5s");

        finish_job(&mut job);
        assert_eq!(
            job.error.as_deref(),
            Some("Capture job exceeded timeout of 5s")
        );
    }
}
