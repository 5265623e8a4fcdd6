//! Usage analytics computed from a user's bookmarks.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::models::{Bookmark, HealthStatus};
use crate::url_utils::domain_of;

/// A named count, sorted descending in summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountEntry {
    pub name: String,
    pub count: i64,
}

/// A frequently visited bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitEntry {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub visit_count: i64,
}

/// Bookmarks added on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// Dashboard analytics for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_bookmarks: i64,
    pub total_categories: i64,
    pub total_tags: i64,
    pub total_visits: i64,
    pub by_category: Vec<CountEntry>,
    pub by_health: BTreeMap<String, i64>,
    pub top_domains: Vec<CountEntry>,
    pub most_visited: Vec<VisitEntry>,
    pub added_per_day: Vec<DailyCount>,
    pub generated_at: DateTime<Utc>,
}

fn top_n(counts: HashMap<String, i64>, n: usize) -> Vec<CountEntry> {
    let mut entries: Vec<CountEntry> = counts
        .into_iter()
        .map(|(name, count)| CountEntry { name, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(n);
    entries
}

/// Build the summary. `category_count` comes from the category store since
/// categories may exist without bookmarks.
pub fn summarize(bookmarks: &[Bookmark], category_count: i64, now: DateTime<Utc>) -> AnalyticsSummary {
    let mut by_category: HashMap<String, i64> = HashMap::new();
    let mut domains: HashMap<String, i64> = HashMap::new();
    let mut tags: HashMap<String, i64> = HashMap::new();
    let mut by_health: BTreeMap<String, i64> = [
        HealthStatus::Unknown,
        HealthStatus::Healthy,
        HealthStatus::Broken,
    ]
    .iter()
    .map(|s| (s.as_str().to_string(), 0))
    .collect();

    for b in bookmarks {
        let category = b.category.clone().unwrap_or_else(|| "Uncategorized".to_string());
        *by_category.entry(category).or_default() += 1;
        if let Some(domain) = domain_of(&b.url) {
            *domains.entry(domain).or_default() += 1;
        }
        for tag in &b.tags {
            *tags.entry(tag.clone()).or_default() += 1;
        }
        *by_health
            .entry(b.health_status.as_str().to_string())
            .or_default() += 1;
    }

    let mut visited: Vec<&Bookmark> = bookmarks.iter().filter(|b| b.visit_count > 0).collect();
    visited.sort_by(|a, b| {
        b.visit_count
            .cmp(&a.visit_count)
            .then_with(|| a.title.cmp(&b.title))
    });
    let most_visited = visited
        .into_iter()
        .take(defaults::ANALYTICS_TOP_N)
        .map(|b| VisitEntry {
            id: b.id,
            title: b.title.clone(),
            url: b.url.clone(),
            visit_count: b.visit_count,
        })
        .collect();

    let today = now.date_naive();
    let first_day = today - Duration::days(defaults::ANALYTICS_DAYS - 1);
    let mut per_day: BTreeMap<NaiveDate, i64> = (0..defaults::ANALYTICS_DAYS)
        .map(|offset| (first_day + Duration::days(offset), 0))
        .collect();
    for b in bookmarks {
        let day = b.created_at.date_naive();
        if let Some(count) = per_day.get_mut(&day) {
            *count += 1;
        }
    }

    AnalyticsSummary {
        total_bookmarks: bookmarks.len() as i64,
        total_categories: category_count,
        total_tags: tags.len() as i64,
        total_visits: bookmarks.iter().map(|b| b.visit_count).sum(),
        by_category: top_n(by_category, usize::MAX),
        by_health,
        top_domains: top_n(domains, defaults::ANALYTICS_TOP_N),
        most_visited,
        added_per_day: per_day
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect(),
        generated_at: now,
    }
}
