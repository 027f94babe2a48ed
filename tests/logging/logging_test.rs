//! File logging setup.

use argos::logging::LoggingGuard;

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_file_creates_logs_dir() {
    let tmp = match tempfile::tempdir() {
        Ok(tmp) => tmp,
        Err(err) => panic!("should create temp dir: {err}"),
    };
    let logs_dir = tmp.path().join("logs");
    assert!(!logs_dir.exists());

    // Only test in this binary that installs the global subscriber.
    let guard = argos::logging::init_file(&logs_dir, "debug");
    assert!(guard.is_ok());
    assert!(logs_dir.exists(), "logs directory should be created");

    tracing::info!(component = "test", "file logging initialised");
}
