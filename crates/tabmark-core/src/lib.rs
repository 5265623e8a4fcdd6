//! # tabmark-core
//!
//! Core types, traits, and defaults for the tabmark bookmark service.
//!
//! This crate provides the data model (bookmarks, categories, tags, capture
//! jobs), the settings default tables, and the repository traits that the
//! storage backends in `tabmark-db` implement.

pub mod analytics;
pub mod capture;
pub mod defaults;
pub mod error;
pub mod models;
pub mod settings;
pub mod traits;
pub mod url_utils;

// Re-export commonly used types at crate root
pub use analytics::{summarize, AnalyticsSummary};
pub use capture::*;
pub use error::{Error, Result};
pub use models::*;
pub use settings::SettingsDomain;
pub use traits::*;
pub use url_utils::{content_hash, domain_of, favicon_candidates, normalize_url};
