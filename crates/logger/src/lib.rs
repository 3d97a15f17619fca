//! Core logging vocabulary for the observatory control software.
//!
//! This crate defines what a log record is and how it is handed to a
//! logger; it does not decide where records end up. Destinations live in
//! `pocs-logger-file`. The pieces are:
//!
//! - [`Level`]: ordered severities (`DEBUG < INFO < WARNING < ERROR < CRITICAL`)
//! - [`Record`]: an immutable record carrying time, process, thread and source location
//! - [`Logger`]: the trait every destination implements
//! - a process-wide logger installed once with [`init`], fed by the
//!   [`debug!`], [`info!`], [`warning!`], [`error!`] and [`critical!`] macros
//! - optional bridges from the `log` and `tracing` ecosystems

#![warn(missing_docs, unreachable_pub)]
#![forbid(unsafe_code)]

mod error;
mod level;
mod logger;
mod record;

pub mod compat;
#[cfg(feature = "test-support")]
pub mod test_support;

pub use error::{Error, Result};
pub use level::Level;
pub use logger::{Logger, LoggerExt, NoOpLogger};
pub use record::Record;

use std::sync::{Arc, OnceLock};

static LOGGER: OnceLock<Arc<dyn Logger>> = OnceLock::new();
static NOOP: NoOpLogger = NoOpLogger;

/// Install the process-wide logger.
///
/// The logger can be installed once; later calls fail with
/// [`Error::AlreadyInitialized`] and leave the first logger in place.
pub fn init(logger: Arc<dyn Logger>) -> Result<()> {
    LOGGER.set(logger).map_err(|_| Error::AlreadyInitialized)
}

/// The process-wide logger, or a no-op logger if none was installed.
pub fn logger() -> &'static dyn Logger {
    match LOGGER.get() {
        Some(logger) => logger.as_ref(),
        None => &NOOP,
    }
}

/// Expands to the name of the enclosing function.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let name = name.strip_suffix("::f").unwrap_or(name);
        name.rsplit("::")
            .find(|segment| *segment != "{{closure}}")
            .unwrap_or(name)
    }};
}

/// Log a formatted message at the given level through the global logger.
///
/// The record's target is the calling module unless one is named with
/// `target:`, e.g. `log!(target: "error", Level::Error, "disk full")`.
#[macro_export]
macro_rules! log {
    (target: $target:expr, $level:expr, $($arg:tt)+) => {{
        let level = $level;
        let logger = $crate::logger();
        if logger.is_enabled(level) {
            logger.log(
                &$crate::Record::new(level, ::std::format!($($arg)+))
                    .with_target($target)
                    .with_location(::std::file!(), ::std::line!())
                    .with_function($crate::function_name!()),
            );
        }
    }};
    ($level:expr, $($arg:tt)+) => {
        $crate::log!(target: ::std::module_path!(), $level, $($arg)+)
    };
}

/// Log at debug level.
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => { $crate::log!(target: $target, $crate::Level::Debug, $($arg)+) };
    ($($arg:tt)+) => { $crate::log!($crate::Level::Debug, $($arg)+) };
}

/// Log at info level.
#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => { $crate::log!(target: $target, $crate::Level::Info, $($arg)+) };
    ($($arg:tt)+) => { $crate::log!($crate::Level::Info, $($arg)+) };
}

/// Log at warning level.
#[macro_export]
macro_rules! warning {
    (target: $target:expr, $($arg:tt)+) => { $crate::log!(target: $target, $crate::Level::Warning, $($arg)+) };
    ($($arg:tt)+) => { $crate::log!($crate::Level::Warning, $($arg)+) };
}

/// Alias of [`warning!`].
#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => { $crate::log!(target: $target, $crate::Level::Warning, $($arg)+) };
    ($($arg:tt)+) => { $crate::log!($crate::Level::Warning, $($arg)+) };
}

/// Log at error level.
#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => { $crate::log!(target: $target, $crate::Level::Error, $($arg)+) };
    ($($arg:tt)+) => { $crate::log!($crate::Level::Error, $($arg)+) };
}

/// Log at critical level.
#[macro_export]
macro_rules! critical {
    (target: $target:expr, $($arg:tt)+) => { $crate::log!(target: $target, $crate::Level::Critical, $($arg)+) };
    ($($arg:tt)+) => { $crate::log!($crate::Level::Critical, $($arg)+) };
}
