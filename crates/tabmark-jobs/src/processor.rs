//! Per-tab processing strategies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tracing::{debug, warn};
use uuid::Uuid;

use tabmark_core::{
    content_hash, defaults, BookmarkRepository, BrowserLauncherPrefs, CapturedTab,
    CreateBookmarkRequest, DuplicateHandling, HealthStatus, TabOutcome, UpdateBookmarkRequest,
};

use crate::link_check::LinkChecker;
use crate::submitter::CaptureMode;

/// Turns one captured tab into a terminal outcome.
///
/// Processors never fail the job: every problem is reported as
/// `TabOutcome::Failed`.
#[async_trait]
pub trait TabProcessor: Send + Sync {
    async fn process(
        &self,
        user_id: Uuid,
        tab: &CapturedTab,
        prefs: &BrowserLauncherPrefs,
    ) -> TabOutcome;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

// =============================================================================
// BOOKMARK CAPTURE
// =============================================================================

/// Saves tabs as bookmarks, detecting duplicates by content hash.
pub struct BookmarkCaptureProcessor {
    bookmarks: Arc<dyn BookmarkRepository>,
    link_checker: Option<LinkChecker>,
}

impl BookmarkCaptureProcessor {
    pub fn new(bookmarks: Arc<dyn BookmarkRepository>) -> Self {
        Self {
            bookmarks,
            link_checker: None,
        }
    }

    /// Enable link validation for jobs whose prefs request it.
    pub fn with_link_checker(mut self, checker: LinkChecker) -> Self {
        self.link_checker = Some(checker);
        self
    }

    async fn save(
        &self,
        user_id: Uuid,
        tab: &CapturedTab,
        prefs: &BrowserLauncherPrefs,
    ) -> tabmark_core::Result<TabOutcome> {
        let hash = content_hash(&tab.url)?;

        let validated = match (&self.link_checker, prefs.validate_links) {
            (Some(checker), true) => {
                let result = checker.check(&tab.url).await;
                if !result.is_healthy() {
                    return Ok(TabOutcome::Failed(result.describe()));
                }
                true
            }
            _ => false,
        };

        let existing = self.bookmarks.find_by_hash(user_id, &hash).await?;
        let saved = match (existing, prefs.duplicate_handling) {
            (Some(_), DuplicateHandling::Skip) => return Ok(TabOutcome::Duplicate),
            (Some(existing), DuplicateHandling::Overwrite) => {
                self.bookmarks
                    .update(
                        user_id,
                        existing.id,
                        UpdateBookmarkRequest {
                            title: Some(tab.title.clone()).filter(|t| !t.trim().is_empty()),
                            url: Some(tab.url.clone()),
                            category: prefs.default_category.clone(),
                            favicon_url: tab.fav_icon_url.clone(),
                            ..Default::default()
                        },
                    )
                    .await?
            }
            (_, _) => {
                self.bookmarks
                    .insert(
                        user_id,
                        CreateBookmarkRequest {
                            title: tab.title.clone(),
                            url: tab.url.clone(),
                            description: None,
                            category: prefs.default_category.clone(),
                            tags: Vec::new(),
                            favicon_url: tab.fav_icon_url.clone(),
                        },
                    )
                    .await?
            }
        };

        if validated {
            self.bookmarks
                .set_health(user_id, saved.id, HealthStatus::Healthy, Utc::now())
                .await?;
        }
        Ok(TabOutcome::Saved)
    }
}

#[async_trait]
impl TabProcessor for BookmarkCaptureProcessor {
    async fn process(
        &self,
        user_id: Uuid,
        tab: &CapturedTab,
        prefs: &BrowserLauncherPrefs,
    ) -> TabOutcome {
        match self.save(user_id, tab, prefs).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    subsystem = "capture",
                    component = "bookmark_processor",
                    url = %tab.url,
                    error = %e,
                    "Tab capture failed"
                );
                TabOutcome::Failed(e.to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "bookmark"
    }
}

// =============================================================================
// SIMULATED CAPTURE
// =============================================================================

/// Randomized stand-in for real capture, used for demos and load tests.
///
/// Each tab waits a uniform random delay, then fails with
/// `failure_rate`, else is a duplicate with `duplicate_rate` (only under the
/// `skip` policy), else is saved.
#[derive(Debug, Clone)]
pub struct SimulatedTabProcessor {
    delay_min: Duration,
    delay_max: Duration,
    duplicate_rate: f64,
    failure_rate: f64,
}

impl Default for SimulatedTabProcessor {
    fn default() -> Self {
        Self {
            delay_min: Duration::from_millis(defaults::SIMULATED_DELAY_MIN_MS),
            delay_max: Duration::from_millis(defaults::SIMULATED_DELAY_MAX_MS),
            duplicate_rate: defaults::SIMULATED_DUPLICATE_RATE,
            failure_rate: defaults::SIMULATED_FAILURE_RATE,
        }
    }
}

impl SimulatedTabProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay range. `max` below `min` collapses to `min`.
    pub fn with_delay(mut self, min: Duration, max: Duration) -> Self {
        self.delay_min = min;
        self.delay_max = max.max(min);
        self
    }

    /// Set outcome probabilities, each clamped to `[0, 1]`.
    pub fn with_rates(mut self, duplicate_rate: f64, failure_rate: f64) -> Self {
        self.duplicate_rate = duplicate_rate.clamp(0.0, 1.0);
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }

    fn draw(&self, policy: DuplicateHandling) -> (Duration, TabOutcome) {
        let mut rng = rand::thread_rng();
        let delay = if self.delay_max > self.delay_min {
            rng.gen_range(self.delay_min..=self.delay_max)
        } else {
            self.delay_min
        };
        let outcome = if rng.gen_bool(self.failure_rate) {
            TabOutcome::Failed("Simulated capture failure".to_string())
        } else if rng.gen_bool(self.duplicate_rate) && policy == DuplicateHandling::Skip {
            TabOutcome::Duplicate
        } else {
            TabOutcome::Saved
        };
        (delay, outcome)
    }
}

#[async_trait]
impl TabProcessor for SimulatedTabProcessor {
    async fn process(
        &self,
        _user_id: Uuid,
        tab: &CapturedTab,
        prefs: &BrowserLauncherPrefs,
    ) -> TabOutcome {
        // ThreadRng is !Send; draw before the await.
        let (delay, outcome) = self.draw(prefs.duplicate_handling);
        tokio::time::sleep(delay).await;
        debug!(
            subsystem = "capture",
            component = "simulated_processor",
            url = %tab.url,
            delay_ms = delay.as_millis() as u64,
            outcome = ?outcome,
            "Simulated tab processed"
        );
        outcome
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Processor for the configured capture mode.
pub fn processor_for(
    mode: CaptureMode,
    bookmarks: Arc<dyn BookmarkRepository>,
    link_checker: Option<LinkChecker>,
) -> Arc<dyn TabProcessor> {
    match mode {
        CaptureMode::Bookmark => {
            let mut processor = BookmarkCaptureProcessor::new(bookmarks);
            if let Some(checker) = link_checker {
                processor = processor.with_link_checker(checker);
            }
            Arc::new(processor)
        }
        CaptureMode::Simulated => Arc::new(SimulatedTabProcessor::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabmark_core::TabStatus;

    fn tab(url: &str) -> CapturedTab {
        CapturedTab {
            url: url.to_string(),
            title: "Example".to_string(),
            fav_icon_url: None,
            status: TabStatus::Pending,
            error: None,
        }
    }

    fn prefs(policy: DuplicateHandling) -> BrowserLauncherPrefs {
        BrowserLauncherPrefs {
            duplicate_handling: policy,
            ..Default::default()
        }
    }

    fn instant() -> SimulatedTabProcessor {
        SimulatedTabProcessor::new().with_delay(Duration::ZERO, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_failure_takes_precedence() {
        let p = instant().with_rates(1.0, 1.0);
        let outcome = p
            .process(Uuid::nil(), &tab("https://a.example"), &prefs(DuplicateHandling::Skip))
            .await;
        assert!(matches!(outcome, TabOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_duplicate_only_under_skip() {
        let p = instant().with_rates(1.0, 0.0);
        let tab = tab("https://a.example");
        assert_eq!(
            p.process(Uuid::nil(), &tab, &prefs(DuplicateHandling::Skip)).await,
            TabOutcome::Duplicate
        );
        assert_eq!(
            p.process(Uuid::nil(), &tab, &prefs(DuplicateHandling::Overwrite)).await,
            TabOutcome::Saved
        );
        assert_eq!(
            p.process(Uuid::nil(), &tab, &prefs(DuplicateHandling::KeepBoth)).await,
            TabOutcome::Saved
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_within_range() {
        let p = SimulatedTabProcessor::new().with_rates(0.0, 0.0);
        let start = tokio::time::Instant::now();
        let outcome = p
            .process(Uuid::nil(), &tab("https://a.example"), &prefs(DuplicateHandling::Skip))
            .await;
        let elapsed = start.elapsed();

        assert_eq!(outcome, TabOutcome::Saved);
        assert!(elapsed >= Duration::from_millis(defaults::SIMULATED_DELAY_MIN_MS));
        assert!(elapsed <= Duration::from_millis(defaults::SIMULATED_DELAY_MAX_MS + 1));
    }

    #[test]
    fn test_rates_are_clamped() {
        let p = SimulatedTabProcessor::new().with_rates(2.0, -1.0);
        assert_eq!(p.duplicate_rate, 1.0);
        assert_eq!(p.failure_rate, 0.0);
    }
}
