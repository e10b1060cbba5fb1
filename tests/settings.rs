use cubeos_dashboard::settings::{FeedSettings, Settings};
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let settings = Settings::load(path.to_str().unwrap()).unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.undo_limit, 20);
}

#[test]
fn partial_file_fills_in_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"backend_url":"https://cube.lan/api","feed":{"max_retries":3}}"#,
    )
    .unwrap();

    let settings = Settings::load(path.to_str().unwrap()).unwrap();
    assert_eq!(settings.backend_url, "https://cube.lan/api");
    assert_eq!(settings.request_timeout(), Duration::from_secs(10));
    assert_eq!(settings.feed.max_retries, 3);
    assert_eq!(settings.feed.interval_secs, FeedSettings::default().interval_secs);
    assert_eq!(
        settings.feed_url().unwrap(),
        "wss://cube.lan/api/ws/stats?interval=2"
    );
}

#[test]
fn save_then_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let mut settings = Settings::default();
    settings.debug_logging = true;
    settings.log_file = Some(dir.path().join("dashboard.log"));
    settings.feed.poll_interval_secs = 9;
    settings.save(path.to_str().unwrap()).unwrap();

    let loaded = Settings::load(path.to_str().unwrap()).unwrap();
    assert_eq!(loaded, settings);
    assert_eq!(loaded.reconnect_policy().poll_interval, Duration::from_secs(9));
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(Settings::load(path.to_str().unwrap()).is_err());
}
