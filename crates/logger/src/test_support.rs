//! Test support utilities
//!
//! This module provides utilities for capturing logs during tests.
//! It's only available when the `test-support` feature is enabled.

use crate::{Level, Logger, Record};
use std::sync::{Arc, Mutex, MutexGuard};

/// A logger that captures all records in memory for testing
#[derive(Clone)]
pub struct CaptureLogger {
    records: Arc<Mutex<Vec<Record>>>,
    min_level: Level,
}

impl CaptureLogger {
    /// Create a new capture logger
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            min_level: Level::Debug,
        }
    }

    /// Create with a specific level
    pub fn with_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// All captured records, oldest first
    pub fn records(&self) -> Vec<Record> {
        self.lock().clone()
    }

    /// Captured records rendered one per line as `LEVEL [target] file:line message`
    pub fn logs(&self) -> String {
        self.lock()
            .iter()
            .map(|record| {
                format!(
                    "{} [{}] {}:{} {}\n",
                    record.level,
                    record.target,
                    record.filename(),
                    record.line,
                    record.message
                )
            })
            .collect()
    }

    /// Clear captured records
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Check if any captured message contains a specific string
    pub fn contains(&self, text: &str) -> bool {
        self.lock().iter().any(|record| record.message.contains(text))
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Record>> {
        // A panicking test must not hide the records of the others
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CaptureLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for CaptureLogger {
    fn log(&self, record: &Record) {
        if self.is_enabled(record.level) {
            self.lock().push(record.clone());
        }
    }

    fn flush(&self) {
        // No-op for in-memory logger
    }

    #[inline]
    fn is_enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }
}
