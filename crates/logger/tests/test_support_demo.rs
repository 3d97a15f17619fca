//! Demonstrates the test support functionality

#[cfg(feature = "test-support")]
mod tests {
    use pocs_logger::test_support::*;
    use pocs_logger::*;
    use std::sync::Arc;

    #[test]
    fn test_capture_logger() {
        let capture = CaptureLogger::new();
        let logger: Arc<dyn Logger> = Arc::new(capture.clone());

        logger.info("This is captured");
        logger.error("This is also captured");

        assert!(capture.contains("This is captured"));

        let logs = capture.logs();
        assert!(logs.contains("INFO"));
        assert!(logs.contains("ERROR"));
        assert!(logs.contains("This is also captured"));

        capture.clear();
        assert!(capture.records().is_empty());
    }

    #[test]
    fn test_capture_logger_level() {
        let capture = CaptureLogger::new().with_level(Level::Warning);

        capture.info("below threshold");
        capture.warning("at threshold");

        let records = capture.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "at threshold");
    }
}
