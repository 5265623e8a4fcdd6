//! # tabmark-jobs
//!
//! Bulk tab capture for tabmark.
//!
//! This crate provides:
//! - An in-memory job store with atomic per-job updates and TTL eviction
//! - The capture submitter, which validates requests and processes tabs in
//!   a detached task
//! - Status streams that poll a job until it reaches a terminal state
//! - Tab processors (bookmark capture, simulated) and link health checks
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tabmark_jobs::{CaptureConfig, CaptureSubmitter, InMemoryJobStore, processor_for};
//!
//! let store = Arc::new(InMemoryJobStore::new());
//! let config = CaptureConfig::from_env()?;
//! let processor = processor_for(config.mode, bookmarks, None);
//! let submitter = CaptureSubmitter::new(store.clone(), processor, config.clone());
//!
//! let job_id = submitter.submit(user_id, request).await?;
//! let mut frames = job_status_stream(store, job_id, config.stream_interval);
//! ```

pub mod link_check;
pub mod processor;
pub mod store;
pub mod streamer;
pub mod submitter;

// Re-export core types
pub use tabmark_core::*;

pub use link_check::{LinkCheckResult, LinkChecker};
pub use processor::{processor_for, BookmarkCaptureProcessor, SimulatedTabProcessor, TabProcessor};
pub use store::{job_mutator, spawn_sweeper, InMemoryJobStore, JobMutator, JobStore};
pub use streamer::{job_status_stream, StatusFrame};
pub use submitter::{validate_request, CaptureConfig, CaptureMode, CaptureSubmitter};
