//! Error types for the core logger

use thiserror::Error;

/// Errors that can occur in the core logger
#[derive(Debug, Error)]
pub enum Error {
    /// A severity token that does not name a level
    #[error("Invalid severity: {0:?}")]
    InvalidSeverity(String),

    /// The global logger was already installed
    #[error("Global logger already initialized")]
    AlreadyInitialized,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
