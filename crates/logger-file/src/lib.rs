//! Severity-routed, rotating file logging
//!
//! This crate turns a YAML logging configuration into a set of file sinks
//! and the routers that feed them:
//! - Named `%(field)` formatters (`simple`, `detail`)
//! - Timed rotation (weekly or daily) with bounded retention of rotated files
//! - Routers selecting every sink whose threshold a record meets, with
//!   propagation to ancestors and root
//! - Durable writes: a line is synced to disk before the write returns
//!
//! [`FileLogger`] implements [`pocs_logger::Logger`] so it can be installed
//! as the process-wide logger.

#![warn(missing_docs, unreachable_pub)]
#![forbid(unsafe_code)]

mod clock;
mod config;
mod error;
mod formatter;
mod logger;
mod rotation;
mod router;
mod sink;

pub use pocs_logger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    FileLoggerOptions, FileLoggerOptionsBuilder, FormatterConfig, HandlerConfig, LogConfig,
    LoggerConfig, PANDIR_ENV, RootConfig,
};
pub use error::{Error, Result};
pub use formatter::{DEFAULT_FORMAT, Formatter, FormatterRegistry};
pub use logger::{Delivery, FileLogger, RouterHandle};
pub use rotation::{RotationInterval, RotationPolicy, Zone};
pub use router::{ROOT, Router};
pub use sink::{RotatingFileSink, SinkKind};
