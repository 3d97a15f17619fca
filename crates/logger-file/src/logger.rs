//! The configured logging setup: sinks, routers and the entry points that
//! feed records into them

use crate::config::{FileLoggerOptions, LogConfig};
use crate::error::{Error, Result};
use crate::formatter::{Formatter, FormatterRegistry};
use crate::router::{ROOT, Router, parent_name};
use crate::sink::{RotatingFileSink, SinkKind};
use pocs_logger::{Level, Logger, Record};
use std::collections::{BTreeMap, HashMap};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Sinks that accepted a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    sinks: Vec<String>,
}

impl Delivery {
    /// Names of the sinks written, in delivery order
    pub fn sinks(&self) -> &[String] {
        &self.sinks
    }

    /// Whether `sink` received the record
    pub fn contains(&self, sink: &str) -> bool {
        self.sinks.iter().any(|name| name == sink)
    }

    /// Whether no sink received the record
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

/// File logging built from a [`LogConfig`].
///
/// Holds one [`RotatingFileSink`] per handler and one [`Router`] per
/// configured logger plus root. Everything is immutable after
/// construction, so a `FileLogger` can be shared freely between threads.
#[derive(Debug)]
pub struct FileLogger {
    formatters: FormatterRegistry,
    sinks: BTreeMap<String, Arc<RotatingFileSink>>,
    routers: HashMap<String, Arc<Router>>,
    root: Arc<Router>,
    log_dir: PathBuf,
}

impl FileLogger {
    /// Build formatters, sinks and routers from `config`.
    ///
    /// Creates the log directory but opens no files; sinks open on their
    /// first write.
    pub fn from_config(config: &LogConfig, options: FileLoggerOptions) -> Result<Self> {
        config.check_version()?;
        let zone = config.zone();

        let mut formatters = FormatterRegistry::new();
        for (name, formatter) in &config.formatters {
            formatters.register(formatter.build(name, zone)?);
        }

        let log_dir = options.log_dir();
        create_dir(&log_dir)?;

        let mut sinks = BTreeMap::new();
        for (name, handler) in &config.handlers {
            let sink = match handler.kind(name)? {
                SinkKind::TimedRotatingFile => {
                    let formatter = match &handler.formatter {
                        Some(formatter) => formatters.get(formatter)?,
                        None => Arc::new(Formatter::fallback(zone)),
                    };
                    let path = options.handler_path(&log_dir, name, handler);
                    if let Some(parent) = path.parent() {
                        create_dir(parent)?;
                    }
                    RotatingFileSink::new(name.clone(), path, formatter)
                        .with_threshold(handler.threshold(name)?)
                        .with_policy(handler.rotation(name, zone)?)
                        .with_backup_count(handler.backup_count)
                        .with_clock(options.clock().clone())
                }
            };
            sinks.insert(name.clone(), Arc::new(sink));
        }

        let root_level = config.root.threshold()?;
        let root_sinks = bind("root", &config.root.handlers, &sinks)?;
        let root = Arc::new(Router::new(ROOT, root_level, root_sinks.clone()));

        let mut routers = HashMap::new();
        for name in config.loggers.keys() {
            let router = build_router(config, name, root_level, &root_sinks, &sinks)?;
            routers.insert(name.clone(), Arc::new(router));
        }

        info!(
            log_dir = %log_dir.display(),
            sinks = sinks.len(),
            routers = routers.len() + 1,
            "Configured file logging"
        );

        Ok(Self {
            formatters,
            sinks,
            routers,
            root,
            log_dir,
        })
    }

    /// Read a configuration file and build from it
    pub fn load(path: impl AsRef<Path>, options: FileLoggerOptions) -> Result<Self> {
        Self::from_config(&LogConfig::from_file(path)?, options)
    }

    /// The router for `name`: the logger itself if configured, else its
    /// nearest configured ancestor, else root.
    pub fn router(&self, name: &str) -> &Arc<Router> {
        if let Some(router) = self.routers.get(name) {
            return router;
        }
        let mut current = parent_name(name);
        while let Some(parent) = current {
            if let Some(router) = self.routers.get(parent) {
                return router;
            }
            current = parent_name(parent);
        }
        &self.root
    }

    /// The root router
    pub fn root(&self) -> &Arc<Router> {
        &self.root
    }

    /// A handle for emitting records through `name`; `""` is root.
    pub fn logger(&self, name: &str) -> RouterHandle {
        RouterHandle {
            name: name.to_string(),
            router: self.router(name).clone(),
        }
    }

    /// Write `record` to every sink the router for `name` selects.
    ///
    /// Every selected sink is attempted. If any fail the result is
    /// [`Error::Delivery`], naming the sinks that did receive the record.
    pub fn dispatch(&self, name: &str, record: &Record) -> Result<Delivery> {
        deliver(self.router(name), record)
    }

    /// A sink by handler name
    pub fn sink(&self, name: &str) -> Option<&Arc<RotatingFileSink>> {
        self.sinks.get(name)
    }

    /// All sinks, by handler name
    pub fn sinks(&self) -> impl Iterator<Item = &Arc<RotatingFileSink>> {
        self.sinks.values()
    }

    /// Registered formatters
    pub fn formatters(&self) -> &FormatterRegistry {
        &self.formatters
    }

    /// Directory handler files are placed in
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

impl Logger for FileLogger {
    fn log(&self, record: &Record) {
        // No way to hand the error back through `Logger`
        if let Err(err) = self.dispatch(&record.target, record) {
            eprintln!("--- Logging error ---\n{err}");
        }
    }

    fn flush(&self) {
        for sink in self.sinks.values() {
            if let Err(err) = sink.flush() {
                eprintln!("--- Logging error ---\n{err}");
            }
        }
    }

    fn is_enabled(&self, level: Level) -> bool {
        self.sinks.values().any(|sink| sink.accepts(level))
    }
}

/// Emits records through one router.
///
/// Obtained from [`FileLogger::logger`]. Records carry the handle's name
/// and the caller's file and line. A function cannot see its caller's
/// name, so the level methods leave the function unknown; the [`emit!`]
/// macro fills it in.
///
/// [`emit!`]: crate::emit
#[derive(Debug, Clone)]
pub struct RouterHandle {
    name: String,
    router: Arc<Router>,
}

impl RouterHandle {
    /// The name records are emitted under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The router records go through
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Emit `record` under this handle's name
    pub fn dispatch(&self, record: Record) -> Result<Delivery> {
        deliver(&self.router, &record.with_target(self.name.clone()))
    }

    /// Emit `message` at `level`
    #[track_caller]
    pub fn log(&self, level: Level, message: impl Into<String>) -> Result<Delivery> {
        let caller = Location::caller();
        self.dispatch(Record::new(level, message).with_location(caller.file(), caller.line()))
    }

    /// Emit at DEBUG
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) -> Result<Delivery> {
        self.log(Level::Debug, message)
    }

    /// Emit at INFO
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) -> Result<Delivery> {
        self.log(Level::Info, message)
    }

    /// Emit at WARNING
    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) -> Result<Delivery> {
        self.log(Level::Warning, message)
    }

    /// Emit at ERROR
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) -> Result<Delivery> {
        self.log(Level::Error, message)
    }

    /// Emit at CRITICAL
    #[track_caller]
    pub fn critical(&self, message: impl Into<String>) -> Result<Delivery> {
        self.log(Level::Critical, message)
    }
}

/// Emit a formatted message through a [`RouterHandle`], capturing the
/// caller's file, line and function.
///
/// ```ignore
/// let error = logger.logger("error");
/// emit!(error, Level::Error, "disk {} full", disk)?;
/// ```
#[macro_export]
macro_rules! emit {
    ($handle:expr, $level:expr, $($arg:tt)+) => {
        $handle.dispatch(
            $crate::pocs_logger::Record::new($level, ::std::format!($($arg)+))
                .with_location(::std::file!(), ::std::line!())
                .with_function($crate::pocs_logger::function_name!()),
        )
    };
}

fn deliver(router: &Router, record: &Record) -> Result<Delivery> {
    let mut delivered = Vec::new();
    let mut failures = Vec::new();
    for sink in router.route(record) {
        match sink.write(record) {
            Ok(()) => delivered.push(sink.name().to_string()),
            Err(err) => failures.push(err),
        }
    }

    if failures.is_empty() {
        Ok(Delivery { sinks: delivered })
    } else {
        Err(Error::Delivery {
            delivered,
            failures,
        })
    }
}

/// Resolve the router for configured logger `name`.
///
/// The level comes from the logger or its nearest ancestor that sets one.
/// Sinks are collected up the ancestor chain until a logger that does not
/// propagate; reaching the top adds root's sinks.
fn build_router(
    config: &LogConfig,
    name: &str,
    root_level: Level,
    root_sinks: &[Arc<RotatingFileSink>],
    sinks: &BTreeMap<String, Arc<RotatingFileSink>>,
) -> Result<Router> {
    let mut level = None;
    let mut bound = Vec::new();
    let mut propagating = true;

    let mut current = Some(name);
    while let Some(logger_name) = current {
        let Some(logger) = config.loggers.get(logger_name) else {
            break;
        };
        if level.is_none() {
            level = logger.threshold(logger_name)?;
        }
        if propagating {
            bound.extend(bind(logger_name, &logger.handlers, sinks)?);
            propagating = logger.propagate;
        }
        current = configured_parent(config, logger_name);
    }
    if propagating {
        bound.extend(root_sinks.iter().cloned());
    }

    Ok(Router::new(name, level.unwrap_or(root_level), bound))
}

fn configured_parent<'a>(config: &LogConfig, name: &'a str) -> Option<&'a str> {
    let mut current = parent_name(name);
    while let Some(parent) = current {
        if config.loggers.contains_key(parent) {
            return Some(parent);
        }
        current = parent_name(parent);
    }
    None
}

fn bind(
    logger: &str,
    handlers: &[String],
    sinks: &BTreeMap<String, Arc<RotatingFileSink>>,
) -> Result<Vec<Arc<RotatingFileSink>>> {
    handlers
        .iter()
        .map(|handler| {
            sinks.get(handler).cloned().ok_or_else(|| Error::UnknownHandler {
                logger: logger.to_string(),
                handler: handler.clone(),
            })
        })
        .collect()
}

fn create_dir(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(path).map_err(|source| Error::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NESTED: &str = r#"
handlers:
  all:
    class: TimedRotatingFileHandler
  mount:
    class: TimedRotatingFileHandler
    level: INFO
  serial:
    class: TimedRotatingFileHandler
loggers:
  mount:
    level: WARNING
    handlers: [mount]
  mount.serial:
    handlers: [serial, mount]
  isolated:
    handlers: [serial]
    propagate: false
root:
  level: DEBUG
  handlers: [all]
"#;

    fn build(dir: &TempDir) -> FileLogger {
        let config = LogConfig::from_yaml_str(NESTED).unwrap();
        let options = FileLoggerOptions::builder()
            .log_dir(dir.path())
            .program("test")
            .build();
        FileLogger::from_config(&config, options).unwrap()
    }

    fn sink_names(router: &Router) -> Vec<&str> {
        router.sink_names().collect()
    }

    #[test]
    fn test_propagation_chain() {
        let dir = TempDir::new().unwrap();
        let logger = build(&dir);

        assert_eq!(sink_names(logger.root()), ["all"]);
        assert_eq!(sink_names(logger.router("mount")), ["mount", "all"]);
        assert_eq!(
            sink_names(logger.router("mount.serial")),
            ["serial", "mount", "all"]
        );
        assert_eq!(sink_names(logger.router("isolated")), ["serial"]);
    }

    #[test]
    fn test_level_inherited_from_ancestor() {
        let dir = TempDir::new().unwrap();
        let logger = build(&dir);

        assert_eq!(logger.router("mount.serial").level(), Level::Warning);
        assert_eq!(logger.router("isolated").level(), Level::Debug);
    }

    #[test]
    fn test_unknown_names_fall_back() {
        let dir = TempDir::new().unwrap();
        let logger = build(&dir);

        assert_eq!(logger.router("mount::serial::port").name(), "mount.serial");
        assert_eq!(logger.router("mount.focuser").name(), "mount");
        assert!(logger.router("camera").is_root());
        assert!(logger.router("").is_root());
    }

    #[test]
    fn test_default_file_names() {
        let dir = TempDir::new().unwrap();
        let logger = build(&dir);

        assert_eq!(
            logger.sink("mount").unwrap().path(),
            dir.path().join("test-mount.log")
        );
        assert_eq!(logger.log_dir(), dir.path());
    }

    #[test]
    fn test_handle_for_unconfigured_name_uses_root() {
        let dir = TempDir::new().unwrap();
        let logger = build(&dir);

        let delivery = logger.logger("camera").info("exposing").unwrap();
        assert_eq!(delivery.sinks(), ["all"]);

        let written = std::fs::read_to_string(dir.path().join("test-all.log")).unwrap();
        assert_eq!(written, "exposing\n");
    }

    #[test]
    fn test_unknown_handler_binding() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig::from_yaml_str("loggers:\n  mount:\n    handlers: [nope]\n").unwrap();
        let options = FileLoggerOptions::builder().log_dir(dir.path()).build();

        let err = FileLogger::from_config(&config, options).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownHandler { ref logger, ref handler } if logger == "mount" && handler == "nope"
        ));
    }

    #[test]
    fn test_log_dir_creation_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();

        let config = LogConfig::stock().unwrap();
        let options = FileLoggerOptions::builder().log_dir(blocker.join("logs")).build();
        assert!(matches!(
            FileLogger::from_config(&config, options),
            Err(Error::CreateDirectory { .. })
        ));
    }
}
