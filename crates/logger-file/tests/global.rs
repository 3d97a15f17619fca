//! Installing the file logger as the process-wide logger

use pocs_logger_file::{FileLogger, FileLoggerOptions, LogConfig};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_macros_reach_the_files() {
    let dir = TempDir::new().unwrap();
    let options = FileLoggerOptions::builder()
        .log_dir(dir.path())
        .program("pocs")
        .build();
    let logger = FileLogger::from_config(&LogConfig::stock().unwrap(), options).unwrap();
    pocs_logger::init(Arc::new(logger)).unwrap();

    pocs_logger::debug!("checking weather");
    pocs_logger::error!("weather unsafe: {}", "rain");
    pocs_logger::critical!(target: "error", "roof {}", "jammed");
    pocs_logger::logger().flush();

    let all = fs::read_to_string(dir.path().join("pocs-all.log")).unwrap();
    let lines: Vec<_> = all.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("   DEBUG "));
    assert!(lines[0].ends_with("checking weather"));
    assert!(lines[1].contains("   ERROR "));
    assert!(lines[1].contains("           global.rs "));
    assert!(lines[1].contains(" test_macros_reach_the_files "));

    assert!(lines[2].ends_with(&format!(
        " {:<25} roof jammed",
        "test_macros_reach_the_files"
    )));

    let warn = fs::read_to_string(dir.path().join("pocs-warn.log")).unwrap();
    assert_eq!(warn.lines().count(), 2);
    assert!(warn.lines().next().unwrap().ends_with("weather unsafe: rain"));

    // Only the record aimed at the `error` router reaches its file
    let error = fs::read_to_string(dir.path().join("pocs-error.log")).unwrap();
    assert_eq!(error.lines().count(), 1);
    assert!(error.contains("CRITICAL "));
    assert!(error.contains(" test_macros_reach_the_files roof jammed"));
}
