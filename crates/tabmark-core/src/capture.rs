//! Tab capture job types.
//!
//! A [`CaptureJob`] tracks one bulk capture of browser tabs. Tabs move from
//! `pending` to exactly one terminal status, and every transition goes
//! through [`CaptureJob::apply_outcome`], which keeps the counters
//! consistent:
//!
//! ```text
//! processed == saved + duplicates + failed
//! ```
//!
//! Wire format is camelCase to match the browser extension.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

/// How to treat a tab whose URL is already bookmarked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicateHandling {
    /// Leave the existing bookmark alone and report a duplicate.
    #[default]
    Skip,
    /// Update the existing bookmark in place.
    Overwrite,
    /// Save a second bookmark for the same URL.
    KeepBoth,
}

/// Browser launcher preferences, snapshotted into each job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserLauncherPrefs {
    #[serde(default = "default_max_tabs")]
    pub max_tabs: usize,
    #[serde(default)]
    pub duplicate_handling: DuplicateHandling,
    /// Category label applied to saved tabs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_category: Option<String>,
    /// Fetch each URL before saving it.
    #[serde(default)]
    pub validate_links: bool,
}

fn default_max_tabs() -> usize {
    defaults::CAPTURE_MAX_TABS
}

impl Default for BrowserLauncherPrefs {
    fn default() -> Self {
        Self {
            max_tabs: defaults::CAPTURE_MAX_TABS,
            duplicate_handling: DuplicateHandling::Skip,
            default_category: None,
            validate_links: false,
        }
    }
}

/// A tab as submitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedTabInput {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
}

/// Body of `POST /tab-capture`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub tabs: Vec<CapturedTabInput>,
    #[serde(default)]
    pub prefs: BrowserLauncherPrefs,
}

/// Per-tab processing status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    #[default]
    Pending,
    Saved,
    Duplicate,
    Failed,
}

impl TabStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TabStatus::Pending)
    }
}

/// A tab tracked inside a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedTab {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    pub status: TabStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<CapturedTabInput> for CapturedTab {
    fn from(input: CapturedTabInput) -> Self {
        Self {
            url: input.url,
            title: input.title,
            fav_icon_url: input.fav_icon_url,
            status: TabStatus::Pending,
            error: None,
        }
    }
}

/// Job-level status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// No transitions happen after a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Terminal outcome for one tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabOutcome {
    Saved,
    Duplicate,
    Failed(String),
}

/// A bulk tab capture job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureJob {
    pub id: Uuid,
    /// Owner of the bookmarks this job creates.
    pub user_id: Uuid,
    pub tabs: Vec<CapturedTab>,
    pub prefs: BrowserLauncherPrefs,
    pub processed: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CaptureJob {
    /// New job with every tab pending and counters at zero.
    pub fn new(user_id: Uuid, tabs: Vec<CapturedTabInput>, prefs: BrowserLauncherPrefs) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            tabs: tabs.into_iter().map(CapturedTab::from).collect(),
            prefs,
            processed: 0,
            saved: 0,
            duplicates: 0,
            failed: 0,
            status: JobStatus::Pending,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Record the terminal outcome of tab `index`.
    ///
    /// Returns `false` without changing anything if the index is out of
    /// range or the tab is already terminal, so each tab is counted once.
    pub fn apply_outcome(&mut self, index: usize, outcome: TabOutcome) -> bool {
        let Some(tab) = self.tabs.get_mut(index) else {
            return false;
        };
        if tab.status.is_terminal() {
            return false;
        }
        match outcome {
            TabOutcome::Saved => {
                tab.status = TabStatus::Saved;
                self.saved += 1;
            }
            TabOutcome::Duplicate => {
                tab.status = TabStatus::Duplicate;
                self.duplicates += 1;
            }
            TabOutcome::Failed(message) => {
                tab.status = TabStatus::Failed;
                tab.error = Some(message);
                self.failed += 1;
            }
        }
        self.processed += 1;
        self.updated_at = Utc::now();
        true
    }

    /// Move a pending job to processing.
    pub fn mark_processing(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Processing;
            self.updated_at = Utc::now();
        }
    }

    /// Mark the job completed. Ignored unless every tab is terminal.
    pub fn mark_completed(&mut self) -> bool {
        if self.status.is_terminal() || !self.all_tabs_terminal() {
            return false;
        }
        let now = Utc::now();
        self.status = JobStatus::Completed;
        self.updated_at = now;
        self.completed_at = Some(now);
        true
    }

    /// Mark the job failed (timeout or aborted processing).
    pub fn mark_failed(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        let now = Utc::now();
        self.status = JobStatus::Failed;
        self.error = Some(message.into());
        self.updated_at = now;
        self.completed_at = Some(now);
        true
    }

    pub fn all_tabs_terminal(&self) -> bool {
        self.tabs.iter().all(|t| t.status.is_terminal())
    }

    /// `processed == saved + duplicates + failed`.
    pub fn counters_consistent(&self) -> bool {
        self.processed == self.saved + self.duplicates + self.failed
    }
}
