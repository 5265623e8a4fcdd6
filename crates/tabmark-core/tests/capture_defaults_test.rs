/// Verifies that capture defaults agree across the codebase.
///
/// The browser launcher settings table, `BrowserLauncherPrefs::default()`,
/// and the serde defaults used for partial request bodies must all describe
/// the same limits.
use tabmark_core::{
    defaults, BrowserLauncherPrefs, CaptureRequest, DuplicateHandling, SettingsDomain,
};

#[test]
fn test_prefs_default_matches_settings_table() {
    let prefs = BrowserLauncherPrefs::default();
    let table = SettingsDomain::Ai
        .default_value("browser_launcher")
        .expect("browser_launcher default");

    assert_eq!(
        prefs.max_tabs as u64,
        table["max_tabs"].as_u64().unwrap(),
        "BrowserLauncherPrefs::default() max_tabs should match the settings table"
    );
    assert_eq!(prefs.duplicate_handling, DuplicateHandling::Skip);
    assert_eq!(table["duplicate_handling"], "skip");
}

#[test]
fn test_capture_request_without_prefs_uses_defaults() {
    let json = r#"{ "tabs": [ { "url": "https://example.com", "title": "Example" } ] }"#;
    let req: CaptureRequest = serde_json::from_str(json).expect("Failed to deserialize");

    assert_eq!(req.tabs.len(), 1);
    assert_eq!(req.prefs.max_tabs, defaults::CAPTURE_MAX_TABS);
    assert!(!req.prefs.validate_links);
}

#[test]
fn test_capture_request_rejects_unknown_duplicate_policy() {
    let json = r#"{ "tabs": [], "prefs": { "duplicateHandling": "merge" } }"#;
    assert!(serde_json::from_str::<CaptureRequest>(json).is_err());
}

#[test]
fn test_bulk_uploader_batch_size_default_is_ten() {
    let value = SettingsDomain::Ai
        .default_value("bulk_uploader")
        .expect("bulk_uploader default");
    assert_eq!(value["batch_size"], 10);
}
