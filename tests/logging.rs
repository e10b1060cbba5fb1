use std::{fs, thread::sleep, time::Duration};

use serial_test::serial;
use tempfile::tempdir;

#[test]
#[serial]
fn writes_log_file_once_installed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("log.txt");

    let guard = cubeos_dashboard::logging::init(true, Some(path.as_path()));
    assert!(guard.is_some(), "subscriber was not installed");
    tracing::warn!("dashboard test");

    // A second init must not replace the installed subscriber.
    assert!(cubeos_dashboard::logging::init(false, None).is_none());
    tracing::warn!("still logging");

    sleep(Duration::from_millis(100));
    drop(guard);

    assert!(path.exists(), "log file was not created");
    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.contains("dashboard test"));
    assert!(contents.contains("still logging"));
}
