//! Basic tests for the logger

use pocs_logger::*;
use std::sync::{Arc, Mutex};

/// Collects records without needing the `test-support` feature
#[derive(Default)]
struct Collect(Mutex<Vec<Record>>);

impl Logger for Collect {
    fn log(&self, record: &Record) {
        self.0.lock().unwrap().push(record.clone());
    }

    fn flush(&self) {}

    fn is_enabled(&self, level: Level) -> bool {
        level >= Level::Info
    }
}

fn emit_from_named_function() {
    warning!("dome {} open", "is");
}

#[test]
fn test_macros_and_global_init() {
    // Before init the global logger swallows everything
    assert!(!logger().is_enabled(Level::Critical));
    info!("nobody hears this");

    let collect = Arc::new(Collect::default());
    init(collect.clone()).unwrap();
    assert!(matches!(init(Arc::new(NoOpLogger)), Err(Error::AlreadyInitialized)));

    debug!("filtered by is_enabled");
    emit_from_named_function();
    error!("value is {}", 42);
    critical!(target: "error", "mount {}", "stuck");

    let records = collect.0.lock().unwrap();
    assert_eq!(records.len(), 3);

    let warning = &records[0];
    assert_eq!(warning.level, Level::Warning);
    assert_eq!(warning.message, "dome is open");
    assert_eq!(warning.function, "emit_from_named_function");
    assert_eq!(warning.filename(), "basic.rs");
    assert_eq!(warning.target, "basic");
    assert!(warning.line > 0);

    assert_eq!(records[1].level, Level::Error);
    assert_eq!(records[1].message, "value is 42");
    assert_eq!(records[1].target, "basic");

    let routed = &records[2];
    assert_eq!(routed.level, Level::Critical);
    assert_eq!(routed.message, "mount stuck");
    assert_eq!(routed.target, "error");
    assert_eq!(routed.function, "test_macros_and_global_init");
}

#[test]
fn test_extension_methods() {
    let logger = Collect::default();

    logger.debug("dropped");
    logger.info("kept");
    logger.critical("also kept");

    let records = logger.0.lock().unwrap();
    let levels: Vec<_> = records.iter().map(|r| r.level).collect();
    assert_eq!(levels, vec![Level::Info, Level::Critical]);
}

#[test]
fn test_noop_logger() {
    let logger = Arc::new(NoOpLogger);

    // NoOpLogger should never be enabled
    for level in Level::ALL {
        assert!(!logger.is_enabled(level));
    }

    // Test that it doesn't panic when used
    logger.error("This goes nowhere");
    logger.flush();
}
