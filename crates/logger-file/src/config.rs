//! Logging configuration document and runtime options

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::formatter::{DEFAULT_FORMAT, Formatter};
use crate::rotation::{RotationInterval, RotationPolicy, Zone};
use crate::sink::SinkKind;
use chrono::NaiveTime;
use pocs_logger::Level;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const STOCK_CONFIG: &str = include_str!("../config/log.yaml");

/// Environment variable naming the installation root; logs go under
/// `$PANDIR/logs` unless a directory is given explicitly.
pub const PANDIR_ENV: &str = "PANDIR";

/// The full logging configuration.
///
/// Loaded once and never mutated; `FileLogger` builds its sinks and routers
/// from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Schema version; only 1 is accepted
    #[serde(default = "default_version")]
    pub version: u32,

    /// Render timestamps and place rotation boundaries in UTC
    #[serde(default = "default_use_utc")]
    pub use_utc: bool,

    /// Named formatters
    #[serde(default)]
    pub formatters: BTreeMap<String, FormatterConfig>,

    /// Named sinks
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerConfig>,

    /// Named routers
    #[serde(default)]
    pub loggers: BTreeMap<String, LoggerConfig>,

    /// The root router
    #[serde(default)]
    pub root: RootConfig,
}

/// A formatter entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// `%(field)` template
    #[serde(default = "default_format")]
    pub format: String,

    /// strftime pattern for `%(asctime)s`
    #[serde(default)]
    pub datefmt: Option<String>,
}

/// A handler entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerConfig {
    /// Handler class, e.g. `logging.handlers.TimedRotatingFileHandler`
    pub class: String,

    /// Lowest level written; every level when absent
    #[serde(default)]
    pub level: Option<String>,

    /// Formatter name; the bare message when absent
    #[serde(default)]
    pub formatter: Option<String>,

    /// Rotation cadence: `W0`-`W6` or `midnight`
    #[serde(default = "default_when")]
    pub when: String,

    /// Rotated files kept; 0 keeps all
    #[serde(default)]
    pub backup_count: usize,

    /// Time of day rotation happens, `HH:MM[:SS]`
    #[serde(default)]
    pub at_time: Option<String>,

    /// File to write; relative paths are placed in the log directory
    #[serde(default)]
    pub filename: Option<PathBuf>,
}

/// A named logger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Router-level threshold; inherited when absent
    #[serde(default)]
    pub level: Option<String>,

    /// Handlers bound to this logger
    #[serde(default)]
    pub handlers: Vec<String>,

    /// Also deliver to the ancestors' handlers
    #[serde(default = "default_propagate")]
    pub propagate: bool,
}

/// The root logger entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootConfig {
    /// Root threshold; `DEBUG` when absent
    #[serde(default)]
    pub level: Option<String>,

    /// Handlers bound to root
    #[serde(default)]
    pub handlers: Vec<String>,
}

fn default_version() -> u32 {
    1
}

fn default_use_utc() -> bool {
    true
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

fn default_when() -> String {
    "W6".to_string()
}

fn default_propagate() -> bool {
    true
}

impl LogConfig {
    /// Parse a YAML document, bare or nested under a top-level `logger` key.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut document: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        if let Some(nested) = document.get_mut("logger").map(std::mem::take) {
            document = nested;
        }
        let config: Self = serde_yaml::from_value(document)?;
        config.check_version()?;
        Ok(config)
    }

    /// Read and parse a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// The configuration shipped with the crate: four weekly-rotating
    /// handlers (`all`, `info`, `warn`, `error`) rendered with `detail`.
    pub fn stock() -> Result<Self> {
        Self::from_yaml_str(STOCK_CONFIG)
    }

    pub(crate) fn check_version(&self) -> Result<()> {
        match self.version {
            1 => Ok(()),
            other => Err(Error::UnsupportedVersion(other)),
        }
    }

    /// Timezone for timestamps and rotation boundaries
    pub fn zone(&self) -> Zone {
        Zone::from_use_utc(self.use_utc)
    }

    /// Check every name, level, template and rotation setting without
    /// touching the filesystem.
    pub fn validate(&self) -> Result<()> {
        self.check_version()?;
        let zone = self.zone();
        for (name, formatter) in &self.formatters {
            formatter.build(name, zone)?;
        }

        for (name, handler) in &self.handlers {
            handler.kind(name)?;
            handler.threshold(name)?;
            handler.rotation(name, zone)?;
            if let Some(formatter) = &handler.formatter
                && !self.formatters.contains_key(formatter)
            {
                return Err(Error::UnknownFormatter(formatter.clone()));
            }
        }

        for (name, logger) in &self.loggers {
            logger.threshold(name)?;
            self.check_handlers(name, &logger.handlers)?;
        }
        self.root.threshold()?;
        self.check_handlers("root", &self.root.handlers)
    }

    fn check_handlers(&self, logger: &str, handlers: &[String]) -> Result<()> {
        match handlers.iter().find(|handler| !self.handlers.contains_key(*handler)) {
            Some(handler) => Err(Error::UnknownHandler {
                logger: logger.to_string(),
                handler: handler.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl FormatterConfig {
    pub(crate) fn build(&self, name: &str, zone: Zone) -> Result<Formatter> {
        Formatter::new(name, &self.format, self.datefmt.as_deref(), zone)
    }
}

impl HandlerConfig {
    pub(crate) fn kind(&self, name: &str) -> Result<SinkKind> {
        self.class.parse().map_err(|class| Error::UnknownSinkKind {
            handler: name.to_string(),
            class,
        })
    }

    pub(crate) fn threshold(&self, name: &str) -> Result<Level> {
        Ok(parse_level(name, self.level.as_deref())?.unwrap_or(Level::Debug))
    }

    pub(crate) fn rotation(&self, name: &str, zone: Zone) -> Result<RotationPolicy> {
        let invalid = |value: &str| Error::InvalidRotation {
            handler: name.to_string(),
            value: value.to_string(),
        };

        let interval: RotationInterval = self.when.parse().map_err(|_| invalid(&self.when))?;
        let mut policy = RotationPolicy::new(interval).with_zone(zone);
        if let Some(at) = &self.at_time {
            let at_time = NaiveTime::parse_from_str(at, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(at, "%H:%M"))
                .map_err(|_| invalid(at))?;
            policy = policy.with_at_time(at_time);
        }
        Ok(policy)
    }
}

impl LoggerConfig {
    pub(crate) fn threshold(&self, name: &str) -> Result<Option<Level>> {
        parse_level(name, self.level.as_deref())
    }
}

impl RootConfig {
    pub(crate) fn threshold(&self) -> Result<Level> {
        Ok(parse_level("root", self.level.as_deref())?.unwrap_or(Level::Debug))
    }
}

fn parse_level(owner: &str, token: Option<&str>) -> Result<Option<Level>> {
    token
        .map(|token| {
            token.parse::<Level>().map_err(|_| Error::InvalidSeverity {
                owner: owner.to_string(),
                token: token.to_string(),
            })
        })
        .transpose()
}

/// Where and how a [`LogConfig`] is put to work.
#[derive(Debug, Clone)]
pub struct FileLoggerOptions {
    log_dir: Option<PathBuf>,
    program: String,
    clock: Arc<dyn Clock>,
}

impl Default for FileLoggerOptions {
    fn default() -> Self {
        Self {
            log_dir: None,
            program: default_program(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl FileLoggerOptions {
    /// Start building options
    pub fn builder() -> FileLoggerOptionsBuilder {
        FileLoggerOptionsBuilder::default()
    }

    /// Directory for handler files: the explicit one, else `$PANDIR/logs`,
    /// else `logs` under the system temp directory.
    pub fn log_dir(&self) -> PathBuf {
        if let Some(dir) = &self.log_dir {
            return dir.clone();
        }
        match std::env::var_os(PANDIR_ENV) {
            Some(pandir) if !pandir.is_empty() => PathBuf::from(pandir).join("logs"),
            _ => std::env::temp_dir().join("logs"),
        }
    }

    /// Program name used in default file names
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Time source for rotation
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// File a handler writes to.
    pub fn handler_path(&self, log_dir: &Path, handler: &str, config: &HandlerConfig) -> PathBuf {
        match &config.filename {
            Some(filename) => log_dir.join(filename),
            None => log_dir.join(format!("{}-{handler}.log", self.program)),
        }
    }
}

/// Builder for [`FileLoggerOptions`]
#[derive(Debug, Default)]
pub struct FileLoggerOptionsBuilder {
    log_dir: Option<PathBuf>,
    program: Option<String>,
    clock: Option<Arc<dyn Clock>>,
}

impl FileLoggerOptionsBuilder {
    /// Write handler files under `log_dir`
    pub fn log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    /// Prefix default file names with `program`
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Read time from `clock`
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the options
    pub fn build(self) -> FileLoggerOptions {
        let defaults = FileLoggerOptions::default();
        FileLoggerOptions {
            log_dir: self.log_dir,
            program: self.program.unwrap_or(defaults.program),
            clock: self.clock.unwrap_or(defaults.clock),
        }
    }
}

fn default_program() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "pocs".to_string())
}
