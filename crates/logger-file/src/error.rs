//! Error types for file-based logging

use std::io;
use std::path::PathBuf;

/// Result type for file logger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during file logging
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration declares a schema version other than 1
    #[error("Unsupported logging configuration version {0}, expected 1")]
    UnsupportedVersion(u32),

    /// A handler or lookup names a formatter that is not registered
    #[error("Unknown formatter: {0}")]
    UnknownFormatter(String),

    /// A format template or date pattern could not be parsed
    #[error("Invalid format for formatter {formatter}: {reason}")]
    InvalidFormat {
        /// The formatter being loaded
        formatter: String,
        /// What is wrong with it
        reason: String,
    },

    /// A level token that does not name a severity
    #[error("Invalid severity {token:?} for {owner}")]
    InvalidSeverity {
        /// The handler or logger carrying the token
        owner: String,
        /// The offending token
        token: String,
    },

    /// A handler class that does not map to a sink kind
    #[error("Unknown handler class {class:?} for handler {handler}")]
    UnknownSinkKind {
        /// The handler being loaded
        handler: String,
        /// The offending class name
        class: String,
    },

    /// A logger binds a handler that is not configured
    #[error("Logger {logger} references unknown handler {handler}")]
    UnknownHandler {
        /// The logger being loaded
        logger: String,
        /// The missing handler
        handler: String,
    },

    /// A rotation cadence or time of day that cannot be honoured
    #[error("Invalid rotation setting {value:?} for handler {handler}")]
    InvalidRotation {
        /// The handler being loaded
        handler: String,
        /// The offending value
        value: String,
    },

    /// The configuration document is not valid YAML for this schema
    #[error("Failed to parse logging configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The configuration file could not be read
    #[error("Failed to read logging configuration at {}: {source}", .path.display())]
    ReadConfig {
        /// The path that failed to be read
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Failed to create log directory
    #[error("Failed to create log directory at {}: {source}", .path.display())]
    CreateDirectory {
        /// The path that failed to be created
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Opening, rotating, writing or syncing a sink's file failed
    #[error("Sink {sink} failed on {}: {source}", .path.display())]
    SinkWrite {
        /// The sink that failed
        sink: String,
        /// The file being written or rotated
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Some of the sinks selected for a record failed
    #[error(
        "Record delivered to {} sink(s), failed on {}: {}",
        .delivered.len(),
        .failures.len(),
        summarize(.failures)
    )]
    Delivery {
        /// Names of the sinks that accepted the record
        delivered: Vec<String>,
        /// One error per failed sink
        failures: Vec<Error>,
    },
}

fn summarize(failures: &[Error]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
