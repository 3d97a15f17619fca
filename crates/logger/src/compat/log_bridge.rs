//! Bridge from the `log` crate to pocs-logger

use crate::{Level, Logger, Record};
use log::{Log, Metadata, Record as LogRecord};
use std::sync::Arc;

/// Wrapper to implement the log crate's Log trait
pub struct LogBridge {
    logger: Arc<dyn Logger>,
}

impl LogBridge {
    /// Create a new log bridge
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        !super::is_own_target(metadata.target())
            && self.logger.is_enabled(map_level(metadata.level()))
    }

    fn log(&self, record: &LogRecord) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut bridged = Record::new(map_level(record.level()), record.args().to_string())
            .with_target(record.target());

        if let (Some(file), Some(line)) = (record.file(), record.line()) {
            bridged = bridged.with_location(file, line);
        }

        self.logger.log(&bridged);
    }

    fn flush(&self) {
        self.logger.flush();
    }
}

/// Map log levels to our levels; `trace` folds into debug
fn map_level(level: log::Level) -> Level {
    match level {
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warning,
        log::Level::Info => Level::Info,
        log::Level::Debug | log::Level::Trace => Level::Debug,
    }
}

/// Initialize the log crate to use pocs-logger
///
/// This will capture all logs from crates using the `log` crate macros.
pub fn init_log_bridge(logger: Arc<dyn Logger>) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge::new(logger)))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
