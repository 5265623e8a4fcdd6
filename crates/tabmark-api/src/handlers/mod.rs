//! HTTP handlers, one module per resource.

pub mod analytics;
pub mod bookmarks;
pub mod capture;
pub mod categories;
pub mod health;
pub mod settings;
pub mod tags;
