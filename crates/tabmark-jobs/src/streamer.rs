//! Job status streams.
//!
//! A stream re-reads its job on a fixed interval and yields the full
//! snapshot each time; consumers replace their state with every frame
//! rather than merging deltas. The stream ends after the first terminal
//! snapshot, or after a single error frame when the job does not exist.
//! Dropping the stream stops the polling.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream};
use serde::Serialize;
use uuid::Uuid;

use tabmark_core::CaptureJob;

use crate::store::JobStore;

/// One frame of a status stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusFrame {
    JobUpdate { job: CaptureJob },
    Error { message: String },
}

impl StatusFrame {
    /// True when no frame follows this one.
    pub fn is_final(&self) -> bool {
        match self {
            StatusFrame::JobUpdate { job } => job.status.is_terminal(),
            StatusFrame::Error { .. } => true,
        }
    }
}

struct PollState {
    store: Arc<dyn JobStore>,
    job_id: Uuid,
    interval: Duration,
    started: bool,
    done: bool,
}

/// Stream of status frames for `job_id`. The first read happens
/// immediately, later reads every `interval`.
pub fn job_status_stream(
    store: Arc<dyn JobStore>,
    job_id: Uuid,
    interval: Duration,
) -> impl Stream<Item = StatusFrame> + Send + 'static {
    let state = PollState {
        store,
        job_id,
        interval,
        started: false,
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        if state.started {
            tokio::time::sleep(state.interval).await;
        }
        state.started = true;

        let frame = match state.store.get(state.job_id).await {
            Ok(Some(job)) => StatusFrame::JobUpdate { job },
            Ok(None) => StatusFrame::Error {
                message: "Job not found".to_string(),
            },
            Err(e) => StatusFrame::Error {
                message: e.to_string(),
            },
        };
        state.done = frame.is_final();
        Some((frame, state))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;
    use tabmark_core::{BrowserLauncherPrefs, CapturedTabInput, TabOutcome};

    use crate::store::{job_mutator, InMemoryJobStore};

    fn one_tab() -> Vec<CapturedTabInput> {
        vec![CapturedTabInput {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            fav_icon_url: None,
        }]
    }

    #[tokio::test]
    async fn test_missing_job_yields_single_error_frame() {
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let frames: Vec<StatusFrame> =
            job_status_stream(store, Uuid::now_v7(), Duration::from_secs(1))
                .collect()
                .await;

        assert_eq!(frames.len(), 1);
        assert_eq!(
            serde_json::to_value(&frames[0]).unwrap(),
            json!({ "type": "error", "message": "Job not found" })
        );
    }

    #[tokio::test]
    async fn test_terminal_job_yields_one_frame() {
        let store = InMemoryJobStore::new();
        let job = store
            .create(Uuid::nil(), one_tab(), BrowserLauncherPrefs::default())
            .await
            .unwrap();
        store
            .update(
                job.id,
                job_mutator(|job| {
                    job.apply_outcome(0, TabOutcome::Saved);
                    job.mark_completed();
                }),
            )
            .await
            .unwrap();

        let frames: Vec<StatusFrame> =
            job_status_stream(Arc::new(store), job.id, Duration::from_secs(1))
                .collect()
                .await;
        assert_eq!(frames.len(), 1);

        let value = serde_json::to_value(&frames[0]).unwrap();
        assert_eq!(value["type"], "job_update");
        assert_eq!(value["job"]["status"], "completed");
        assert_eq!(value["job"]["processed"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_terminal() {
        let store = InMemoryJobStore::new();
        let job = store
            .create(Uuid::nil(), one_tab(), BrowserLauncherPrefs::default())
            .await
            .unwrap();

        let mut stream = Box::pin(job_status_stream(
            Arc::new(store.clone()),
            job.id,
            Duration::from_secs(1),
        ));

        let first = stream.next().await.unwrap();
        assert!(!first.is_final());

        let second = stream.next().await.unwrap();
        assert!(!second.is_final());

        store
            .update(
                job.id,
                job_mutator(|job| {
                    job.apply_outcome(0, TabOutcome::Duplicate);
                    job.mark_completed();
                }),
            )
            .await
            .unwrap();

        let last = stream.next().await.unwrap();
        assert!(last.is_final());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_frame_is_immediate() {
        let store = InMemoryJobStore::new();
        let job = store
            .create(Uuid::nil(), one_tab(), BrowserLauncherPrefs::default())
            .await
            .unwrap();

        let start = tokio::time::Instant::now();
        let mut stream = Box::pin(job_status_stream(
            Arc::new(store),
            job.id,
            Duration::from_secs(1),
        ));
        stream.next().await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);

        stream.next().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }
}
