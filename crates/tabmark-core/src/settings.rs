//! Settings domains and their static default documents.
//!
//! Each domain is a JSON object whose top-level keys are read and written
//! independently. Reads fall back to these defaults whenever the stored
//! value is missing or cannot be fetched; writes never do.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// A settings document namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SettingsDomain {
    /// Automation and AI feature settings.
    #[serde(rename = "ai-settings-group")]
    Ai,
    /// Assistant ("oracle") personality and appearance settings.
    #[serde(rename = "assistant-settings-group")]
    Assistant,
}

impl SettingsDomain {
    pub const ALL: [SettingsDomain; 2] = [SettingsDomain::Ai, SettingsDomain::Assistant];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsDomain::Ai => "ai-settings-group",
            SettingsDomain::Assistant => "assistant-settings-group",
        }
    }

    /// The static default document for this domain.
    pub fn defaults(&self) -> &'static JsonValue {
        match self {
            SettingsDomain::Ai => &AI_SETTINGS_DEFAULTS,
            SettingsDomain::Assistant => &ASSISTANT_SETTINGS_DEFAULTS,
        }
    }

    /// Default value for one top-level key.
    pub fn default_value(&self, key: &str) -> Option<&'static JsonValue> {
        self.defaults().get(key)
    }

    /// Whether `key` is a known top-level key of this domain.
    pub fn is_known_key(&self, key: &str) -> bool {
        self.default_value(key).is_some()
    }

    /// Default document overlaid with stored values (stored keys win).
    pub fn merged(&self, stored: &BTreeMap<String, JsonValue>) -> JsonValue {
        let mut doc = self.defaults().clone();
        if let JsonValue::Object(map) = &mut doc {
            for (key, value) in stored {
                map.insert(key.clone(), value.clone());
            }
        }
        doc
    }
}

impl fmt::Display for SettingsDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingsDomain {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ai-settings-group" => Ok(SettingsDomain::Ai),
            "assistant-settings-group" => Ok(SettingsDomain::Assistant),
            other => Err(format!(
                "Unknown settings domain '{}'. Expected one of: ai-settings-group, assistant-settings-group",
                other
            )),
        }
    }
}

/// Defaults for `ai-settings-group`.
pub static AI_SETTINGS_DEFAULTS: Lazy<JsonValue> = Lazy::new(|| {
    json!({
        "bulk_uploader": {
            "enabled": true,
            "batch_size": 10,
            "max_concurrent": 3,
            "auto_categorize": true,
            "auto_tag": true,
            "validate_links": true,
            "duplicate_handling": "skip",
            "notify_on_complete": true
        },
        "browser_launcher": {
            "enabled": true,
            "max_tabs": 40,
            "duplicate_handling": "skip",
            "capture_pinned_tabs": false,
            "close_tabs_after_capture": false,
            "default_category": null
        },
        "link_validator": {
            "enabled": true,
            "check_interval_hours": 24,
            "timeout_ms": 10000,
            "follow_redirects": true,
            "retry_failed": true,
            "max_retries": 2,
            "mark_broken_after_failures": 3
        },
        "auto_categorizer": {
            "enabled": true,
            "confidence_threshold": 0.7,
            "use_page_content": true,
            "max_suggestions": 3,
            "create_new_categories": false
        },
        "smart_tagger": {
            "enabled": true,
            "max_tags": 5,
            "min_confidence": 0.6,
            "lowercase_tags": true,
            "excluded_tags": []
        },
        "content_summarizer": {
            "enabled": false,
            "summary_length": "short",
            "include_key_points": true,
            "language": "auto"
        },
        "duplicate_detector": {
            "enabled": true,
            "ignore_query_params": ["utm_source", "utm_medium", "utm_campaign", "fbclid", "gclid"],
            "ignore_fragments": true,
            "ignore_trailing_slash": true
        },
        "analytics": {
            "enabled": true,
            "track_visits": true,
            "retention_days": 90
        }
    })
});

/// Defaults for `assistant-settings-group`.
pub static ASSISTANT_SETTINGS_DEFAULTS: Lazy<JsonValue> = Lazy::new(|| {
    json!({
        "personality": {
            "name": "Oracle",
            "tone": "friendly",
            "verbosity": "balanced",
            "humor_level": 0.3,
            "formality": "casual",
            "use_emoji": false
        },
        "appearance": {
            "theme": "system",
            "avatar": "orb",
            "accent_color": "#7c3aed",
            "position": "bottom-right",
            "size": "medium",
            "animation": "subtle",
            "opacity": 0.95
        },
        "behavior": {
            "auto_open": false,
            "proactive_suggestions": true,
            "suggestion_frequency": "moderate",
            "remember_context": true,
            "context_window": 20,
            "confirm_destructive_actions": true
        },
        "voice": {
            "enabled": false,
            "voice": "default",
            "speed": 1.0,
            "pitch": 1.0,
            "wake_word": null
        },
        "knowledge": {
            "use_bookmarks": true,
            "use_categories": true,
            "use_browsing_history": false,
            "max_results": 10
        },
        "privacy": {
            "store_conversations": true,
            "conversation_retention_days": 30,
            "share_usage_data": false
        },
        "shortcuts": {
            "toggle": "Ctrl+Shift+O",
            "quick_search": "Ctrl+Shift+K",
            "capture_tabs": "Ctrl+Shift+S"
        }
    })
});
