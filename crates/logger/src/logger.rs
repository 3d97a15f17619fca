//! Core logger trait

use crate::{Level, Record};

/// Core logger trait
pub trait Logger: Send + Sync + 'static {
    /// Log a record
    fn log(&self, record: &Record);

    /// Flush any buffered logs
    fn flush(&self);

    /// Check if a level is enabled (for fast filtering)
    #[inline]
    fn is_enabled(&self, level: Level) -> bool {
        let _ = level;
        true
    }
}

/// Extension trait for convenient logging methods
///
/// Records built here carry no source location; use the crate macros when
/// file, line and function should be captured.
pub trait LoggerExt: Logger {
    /// Log at an arbitrary level
    fn log_message(&self, level: Level, msg: impl Into<String>) {
        if self.is_enabled(level) {
            self.log(&Record::new(level, msg));
        }
    }

    /// Log debug
    fn debug(&self, msg: impl Into<String>) {
        self.log_message(Level::Debug, msg);
    }

    /// Log info
    fn info(&self, msg: impl Into<String>) {
        self.log_message(Level::Info, msg);
    }

    /// Log a warning
    fn warning(&self, msg: impl Into<String>) {
        self.log_message(Level::Warning, msg);
    }

    /// Log an error
    fn error(&self, msg: impl Into<String>) {
        self.log_message(Level::Error, msg);
    }

    /// Log a critical failure
    fn critical(&self, msg: impl Into<String>) {
        self.log_message(Level::Critical, msg);
    }
}

// Implement for all loggers
impl<T: Logger + ?Sized> LoggerExt for T {}

/// Logger that discards everything; used before [`crate::init`] is called.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&self, _record: &Record) {}

    fn flush(&self) {}

    #[inline]
    fn is_enabled(&self, _level: Level) -> bool {
        false
    }
}
