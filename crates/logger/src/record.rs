//! Log record type

use crate::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

const UNKNOWN_FILE: &str = "(unknown file)";
const UNKNOWN_FUNCTION: &str = "(unknown function)";

/// A single log record.
///
/// Records are immutable once built: the builder methods consume the record
/// and return a new one, so a record handed to a logger can be shared across
/// sinks without copying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Severity
    pub level: Level,
    /// The log message
    pub message: String,
    /// When the record was created, always UTC
    pub timestamp: DateTime<Utc>,
    /// Dotted logger name the record was emitted through; empty for root
    pub target: String,
    /// Name of the emitting process
    pub process_name: String,
    /// Id of the emitting process
    pub process_id: u32,
    /// Name of the emitting thread
    pub thread_name: String,
    /// Source path as given by `file!()`
    pub file: String,
    /// Source line
    pub line: u32,
    /// Enclosing function name
    pub function: String,
}

impl Record {
    /// Create a record stamped with the current time, process and thread.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            target: String::new(),
            process_name: process_name().to_string(),
            process_id: std::process::id(),
            thread_name: current_thread_name(),
            file: UNKNOWN_FILE.to_string(),
            line: 0,
            function: UNKNOWN_FUNCTION.to_string(),
        }
    }

    /// Builder-style method for setting the logger name
    #[inline]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Builder-style method for setting the source location
    #[inline]
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self
    }

    /// Builder-style method for setting the enclosing function
    #[inline]
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }

    /// Builder-style method for overriding the timestamp
    #[inline]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Builder-style method for overriding the thread name
    #[inline]
    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Base name of the source file.
    pub fn filename(&self) -> &str {
        Path::new(&self.file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.file)
    }

    /// Source file name without its extension.
    pub fn module(&self) -> &str {
        Path::new(&self.file)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.file)
    }
}

/// File stem of the running executable.
fn process_name() -> &'static str {
    static NAME: OnceLock<String> = OnceLock::new();
    NAME.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "MainProcess".to_string())
    })
}

fn current_thread_name() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let record = Record::new(Level::Info, "hello");
        assert_eq!(record.message, "hello");
        assert_eq!(record.process_id, std::process::id());
        assert_eq!(record.filename(), UNKNOWN_FILE);
        assert_eq!(record.function, UNKNOWN_FUNCTION);
        assert_eq!(record.line, 0);
        assert!(record.target.is_empty());
    }

    #[test]
    fn test_location_accessors() {
        let record = Record::new(Level::Debug, "x").with_location("src/mount/serial.rs", 42);
        assert_eq!(record.filename(), "serial.rs");
        assert_eq!(record.module(), "serial");
        assert_eq!(record.line, 42);
    }

    #[test]
    fn test_thread_name_from_named_thread() {
        let name = std::thread::Builder::new()
            .name("camera-0".into())
            .spawn(|| Record::new(Level::Info, "x").thread_name)
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(name, "camera-0");
    }
}
