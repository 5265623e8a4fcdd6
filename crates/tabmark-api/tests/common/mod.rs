//! Shared router harness: file store in a temp dir, bookmark-mode capture
//! without link validation, and a fast status stream.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use tabmark_api::{build_router, AppState};
use tabmark_core::defaults;
use tabmark_db::Store;
use tabmark_jobs::{
    processor_for, CaptureConfig, CaptureMode, CaptureSubmitter, InMemoryJobStore, JobStore,
    LinkChecker,
};

pub struct TestApp {
    pub router: Router,
    pub store: Store,
    pub user: Uuid,
    _dir: TempDir,
}

pub async fn test_app() -> TestApp {
    test_app_with(|state| state).await
}

pub async fn test_app_with(configure: impl FnOnce(AppState) -> AppState) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open_file(dir.path()).await.expect("open file store");

    let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let processor = processor_for(CaptureMode::Bookmark, store.bookmarks.clone(), None);
    let config = CaptureConfig::default().with_stream_interval(Duration::from_millis(20));
    let capture = CaptureSubmitter::new(jobs, processor, config);
    let link_checker = LinkChecker::new(Duration::from_secs(2)).expect("link checker");

    let state = configure(AppState::new(store.clone(), capture, link_checker));

    TestApp {
        router: build_router(state),
        store,
        user: Uuid::now_v7(),
        _dir: dir,
    }
}

impl TestApp {
    /// Request as `self.user`.
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_as(Some(self.user), method, uri, body).await
    }

    pub async fn send_as(
        &self,
        user: Option<Uuid>,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(defaults::USER_ID_HEADER, user.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, text) = self.raw(request).await;
        let json = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        (status, json)
    }

    /// Send a prepared request and return the status and body text.
    pub async fn raw(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// JSON payloads of the `data:` lines of an SSE body.
pub fn sse_frames(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).expect("frame is JSON"))
        .collect()
}
