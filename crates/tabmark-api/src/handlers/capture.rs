//! Tab capture: batch submission and live job status over SSE.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use tabmark_core::CaptureRequest;
use tabmark_jobs::{job_status_stream, StatusFrame};

use crate::extract::{ApiJson, ApiPath};
use crate::{ApiError, AppState, CurrentUser};

/// Response to an accepted capture batch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureAccepted {
    pub job_id: Uuid,
}

/// `POST /tab-capture`: validate the batch, create a job, and return its id
/// before any tab is processed.
pub async fn submit_capture(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(req): ApiJson<CaptureRequest>,
) -> Result<Json<CaptureAccepted>, ApiError> {
    let job_id = state.capture.submit(user_id, req).await?;
    Ok(Json(CaptureAccepted { job_id }))
}

fn frame_event(frame: &StatusFrame) -> Event {
    match serde_json::to_string(frame) {
        Ok(json) => Event::default().data(json),
        Err(e) => Event::default().data(
            serde_json::json!({ "type": "error", "message": e.to_string() }).to_string(),
        ),
    }
}

/// `GET /tab-capture/:job_id`: one `data:` frame per poll with the full job
/// snapshot. The stream closes after the terminal snapshot, or after a
/// single error frame for unknown jobs. Malformed ids and jobs of other
/// users read as unknown.
pub async fn stream_capture_status(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(raw_id): ApiPath<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let jobs = state.capture.store().clone();
    let job_id = match Uuid::parse_str(&raw_id) {
        Ok(id) => match jobs.get(id).await {
            Ok(Some(job)) if job.user_id != user_id => None,
            _ => Some(id),
        },
        Err(_) => None,
    };

    let frames: BoxStream<'static, StatusFrame> = match job_id {
        Some(id) => job_status_stream(jobs, id, state.capture.config().stream_interval).boxed(),
        None => stream::iter([StatusFrame::Error {
            message: "Job not found".to_string(),
        }])
        .boxed(),
    };

    let events = frames.map(|frame| Ok::<_, Infallible>(frame_event(&frame)));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}
