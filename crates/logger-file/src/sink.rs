//! Rotating file sink
//!
//! A sink owns one file. Every write renders the record with the sink's
//! formatter, rotates the file first if a rotation boundary has passed, then
//! appends the line and syncs it to disk before returning. A per-sink mutex
//! serializes writers so lines never interleave and a boundary is only
//! crossed once.

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::formatter::Formatter;
use crate::rotation::{RotationPolicy, is_backup_suffix};
use chrono::{DateTime, Utc, Weekday};
use parking_lot::Mutex;
use pocs_logger::{Level, Record};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handler classes a configuration may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// A file rotated on a fixed schedule
    TimedRotatingFile,
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "logging.handlers.TimedRotatingFileHandler" | "TimedRotatingFileHandler" => {
                Ok(SinkKind::TimedRotatingFile)
            }
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct SinkState {
    file: Option<File>,
    next_rollover: Option<DateTime<Utc>>,
}

/// What a rotation did, reported once the sink lock is released.
#[derive(Debug, Default)]
struct Rotation {
    backup: Option<PathBuf>,
    pruned: Vec<PathBuf>,
    prune_failures: Vec<(PathBuf, io::Error)>,
}

/// A file sink with a severity threshold, weekly rotation and bounded
/// retention of rotated files.
#[derive(Debug)]
pub struct RotatingFileSink {
    name: String,
    threshold: Level,
    formatter: Arc<Formatter>,
    path: PathBuf,
    policy: RotationPolicy,
    backup_count: usize,
    clock: Arc<dyn Clock>,
    state: Mutex<SinkState>,
}

impl RotatingFileSink {
    /// Create a sink writing to `path`.
    ///
    /// Defaults: accepts every level, rotates when Sunday begins (UTC),
    /// keeps every rotated file and reads time from the system clock. The
    /// file is not opened until the first write.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, formatter: Arc<Formatter>) -> Self {
        Self {
            name: name.into(),
            threshold: Level::Debug,
            formatter,
            path: path.into(),
            policy: RotationPolicy::weekly(Weekday::Sun),
            backup_count: 0,
            clock: Arc::new(SystemClock),
            state: Mutex::new(SinkState::default()),
        }
    }

    /// Drop records below `threshold`
    pub fn with_threshold(mut self, threshold: Level) -> Self {
        self.threshold = threshold;
        self
    }

    /// Rotate on `policy`
    pub fn with_policy(mut self, policy: RotationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Keep at most `backup_count` rotated files; 0 keeps all
    pub fn with_backup_count(mut self, backup_count: usize) -> Self {
        self.backup_count = backup_count;
        self
    }

    /// Read the time from `clock`
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Handler name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowest accepted level
    pub fn threshold(&self) -> Level {
        self.threshold
    }

    /// The active file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rotation schedule
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Maximum rotated files kept
    pub fn backup_count(&self) -> usize {
        self.backup_count
    }

    /// The formatter lines are rendered with
    pub fn formatter(&self) -> &Arc<Formatter> {
        &self.formatter
    }

    /// Whether a record at `level` is written
    #[inline]
    pub fn accepts(&self, level: Level) -> bool {
        level >= self.threshold
    }

    /// When the active file rotates next; `None` before the first write.
    pub fn next_rollover(&self) -> Option<DateTime<Utc>> {
        self.state.lock().next_rollover
    }

    /// Append `record` as one line, rotating first if a boundary has passed.
    ///
    /// Records below the threshold are ignored. The line has reached the
    /// disk when this returns `Ok`.
    pub fn write(&self, record: &Record) -> Result<()> {
        if !self.accepts(record.level) {
            return Ok(());
        }

        let mut line = self.formatter.format(record);
        line.push('\n');

        let mut rotation = None;
        let result = {
            let mut state = self.state.lock();
            self.write_locked(&mut state, line.as_bytes(), &mut rotation)
        };

        if let Some(rotation) = rotation {
            self.report(rotation);
        }
        result
    }

    /// Sync the open file, if any, to disk
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(file) = state.file.as_mut() {
            file.flush()
                .and_then(|()| file.sync_all())
                .map_err(|source| self.write_error(&self.path, source))?;
        }
        Ok(())
    }

    /// Rotated files of this sink, oldest first.
    pub fn backups(&self) -> io::Result<Vec<PathBuf>> {
        let Some(file_name) = self.path.file_name().and_then(|name| name.to_str()) else {
            return Ok(Vec::new());
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let prefix = format!("{file_name}.");

        let mut backups = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(suffix) = name.to_str().and_then(|name| name.strip_prefix(&prefix)) else {
                continue;
            };
            if is_backup_suffix(suffix) {
                backups.push((backup_order(suffix), entry.path()));
            }
        }
        backups.sort();
        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    fn write_locked(
        &self,
        state: &mut SinkState,
        bytes: &[u8],
        rotation: &mut Option<Rotation>,
    ) -> Result<()> {
        let now = self.clock.now();

        // Taken out of the state so that any failure below leaves the sink
        // without a handle; the next write reopens the file.
        let mut file = match state.file.take() {
            Some(file) => file,
            None => {
                let existed = self.path.exists();
                let file = self.open()?;
                if state.next_rollover.is_none() {
                    let reference = if existed { modified(&file).unwrap_or(now) } else { now };
                    state.next_rollover = Some(self.policy.next_boundary(reference));
                }
                file
            }
        };

        if let Some(boundary) = state.next_rollover
            && now >= boundary
        {
            drop(file);
            *rotation = Some(self.rotate(boundary)?);
            state.next_rollover = Some(self.policy.next_boundary(now));
            file = self.open()?;
        }

        file.write_all(bytes)
            .and_then(|()| file.sync_data())
            .map_err(|source| self.write_error(&self.path, source))?;
        state.file = Some(file);
        Ok(())
    }

    fn open(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.write_error(&self.path, source))
    }

    /// Move the active file aside as the backup for the period ending at
    /// `boundary`, then enforce retention.
    fn rotate(&self, boundary: DateTime<Utc>) -> Result<Rotation> {
        let backup = self.backup_path(boundary);
        let backup = match fs::rename(&self.path, &backup) {
            Ok(()) => Some(backup),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(source) => return Err(self.write_error(&backup, source)),
        };

        let mut rotation = Rotation {
            backup,
            ..Rotation::default()
        };
        self.prune(&mut rotation);
        Ok(rotation)
    }

    fn backup_path(&self, boundary: DateTime<Utc>) -> PathBuf {
        let mut base = OsString::from(self.path.as_os_str());
        base.push(".");
        base.push(self.policy.backup_suffix(boundary));

        let mut candidate = PathBuf::from(&base);
        let mut counter = 1u32;
        while candidate.exists() {
            let mut name = base.clone();
            name.push(format!(".{counter}"));
            candidate = PathBuf::from(name);
            counter += 1;
        }
        candidate
    }

    fn prune(&self, rotation: &mut Rotation) {
        if self.backup_count == 0 {
            return;
        }
        let backups = match self.backups() {
            Ok(backups) => backups,
            Err(err) => {
                rotation.prune_failures.push((self.path.clone(), err));
                return;
            }
        };
        let excess = backups.len().saturating_sub(self.backup_count);
        for path in backups.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => rotation.pruned.push(path),
                Err(err) => rotation.prune_failures.push((path, err)),
            }
        }
    }

    fn report(&self, rotation: Rotation) {
        match &rotation.backup {
            Some(backup) => info!(
                sink = %self.name,
                backup = %backup.display(),
                "Rotated log file"
            ),
            None => debug!(sink = %self.name, "Rotation found no file to move aside"),
        }
        for path in &rotation.pruned {
            debug!(sink = %self.name, path = %path.display(), "Removed expired log file");
        }
        for (path, err) in &rotation.prune_failures {
            warn!(
                sink = %self.name,
                path = %path.display(),
                error = %err,
                "Failed to remove expired log file"
            );
        }
    }

    fn write_error(&self, path: &Path, source: io::Error) -> Error {
        Error::SinkWrite {
            sink: self.name.clone(),
            path: path.to_path_buf(),
            source,
        }
    }
}

fn modified(file: &File) -> Option<DateTime<Utc>> {
    file.metadata()
        .and_then(|metadata| metadata.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Sort key for a backup suffix: timestamp, then collision counter.
fn backup_order(suffix: &str) -> (String, u32) {
    match suffix.split_once('.') {
        Some((stamp, counter)) => (stamp.to_string(), counter.parse().unwrap_or(0)),
        None => (suffix.to_string(), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::rotation::Zone;
    use chrono::TimeDelta;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn message_only() -> Arc<Formatter> {
        Arc::new(Formatter::fallback(Zone::Utc))
    }

    fn sink(dir: &TempDir, clock: &ManualClock) -> RotatingFileSink {
        RotatingFileSink::new("all", dir.path().join("pocs-all.log"), message_only())
            .with_clock(Arc::new(clock.clone()))
    }

    #[test]
    fn test_parse_sink_kind() {
        assert_eq!(
            "logging.handlers.TimedRotatingFileHandler".parse::<SinkKind>(),
            Ok(SinkKind::TimedRotatingFile)
        );
        assert_eq!(
            "TimedRotatingFileHandler".parse::<SinkKind>(),
            Ok(SinkKind::TimedRotatingFile)
        );
        assert_eq!(
            "logging.StreamHandler".parse::<SinkKind>(),
            Err("logging.StreamHandler".to_string())
        );
    }

    #[test]
    fn test_opens_lazily_and_appends() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(utc("2024-01-03T12:00:00Z"));
        let sink = sink(&dir, &clock);

        assert!(!sink.path().exists());
        assert_eq!(sink.next_rollover(), None);

        sink.write(&Record::new(Level::Info, "one")).unwrap();
        sink.write(&Record::new(Level::Info, "two")).unwrap();

        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "one\ntwo\n");
        assert_eq!(sink.next_rollover(), Some(utc("2024-01-07T00:00:00Z")));
    }

    #[test]
    fn test_threshold_drops_lower_levels() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(utc("2024-01-03T12:00:00Z"));
        let sink = sink(&dir, &clock).with_threshold(Level::Warning);

        sink.write(&Record::new(Level::Info, "quiet")).unwrap();
        assert!(!sink.path().exists());

        sink.write(&Record::new(Level::Critical, "loud")).unwrap();
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "loud\n");
    }

    #[test]
    #[traced_test]
    fn test_rotation_moves_file_aside() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(utc("2024-01-03T12:00:00Z"));
        let sink = sink(&dir, &clock);

        sink.write(&Record::new(Level::Info, "before")).unwrap();
        clock.set(utc("2024-01-07T00:00:00Z"));
        sink.write(&Record::new(Level::Info, "after")).unwrap();

        let backups = sink.backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            backups[0].file_name().unwrap().to_str().unwrap(),
            "pocs-all.log.2023-12-31_00-00-00"
        );
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "before\n");
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "after\n");
        assert_eq!(sink.next_rollover(), Some(utc("2024-01-14T00:00:00Z")));
        assert!(logs_contain("Rotated log file"));
    }

    #[test]
    fn test_colliding_backup_name_gets_counter() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(utc("2024-01-03T12:00:00Z"));
        let sink = sink(&dir, &clock);
        fs::write(dir.path().join("pocs-all.log.2023-12-31_00-00-00"), "older\n").unwrap();

        sink.write(&Record::new(Level::Info, "before")).unwrap();
        clock.set(utc("2024-01-08T00:00:00Z"));
        sink.write(&Record::new(Level::Info, "after")).unwrap();

        let names: Vec<_> = sink
            .backups()
            .unwrap()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            [
                "pocs-all.log.2023-12-31_00-00-00",
                "pocs-all.log.2023-12-31_00-00-00.1"
            ]
        );
    }

    #[test]
    fn test_retention_keeps_newest() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(utc("2024-01-03T12:00:00Z"));
        let sink = sink(&dir, &clock).with_backup_count(2);

        for week in 0..5 {
            sink.write(&Record::new(Level::Info, format!("week {week}"))).unwrap();
            clock.advance(TimeDelta::days(7));
        }

        let backups = sink.backups().unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "week 2\n");
        assert_eq!(fs::read_to_string(&backups[1]).unwrap(), "week 3\n");
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "week 4\n");
    }

    #[test]
    fn test_backup_count_zero_keeps_everything() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(utc("2024-01-03T12:00:00Z"));
        let sink = sink(&dir, &clock);

        for _ in 0..6 {
            sink.write(&Record::new(Level::Info, "tick")).unwrap();
            clock.advance(TimeDelta::days(7));
        }
        assert_eq!(sink.backups().unwrap().len(), 5);
    }

    #[test]
    fn test_unrelated_files_are_not_backups() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(utc("2024-01-03T12:00:00Z"));
        let sink = sink(&dir, &clock).with_backup_count(1);
        fs::write(dir.path().join("pocs-all.log.bak"), "keep").unwrap();
        fs::write(dir.path().join("pocs-warn.log.2023-12-31_00-00-00"), "keep").unwrap();

        for _ in 0..3 {
            sink.write(&Record::new(Level::Info, "tick")).unwrap();
            clock.advance(TimeDelta::days(7));
        }

        assert_eq!(sink.backups().unwrap().len(), 1);
        assert!(dir.path().join("pocs-all.log.bak").exists());
        assert!(dir.path().join("pocs-warn.log.2023-12-31_00-00-00").exists());
    }

    #[test]
    fn test_open_failure_is_sink_write_error() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(utc("2024-01-03T12:00:00Z"));
        let sink = RotatingFileSink::new(
            "broken",
            dir.path().join("missing").join("pocs.log"),
            message_only(),
        )
        .with_clock(Arc::new(clock));

        let err = sink.write(&Record::new(Level::Error, "lost")).unwrap_err();
        assert!(matches!(err, Error::SinkWrite { ref sink, .. } if sink == "broken"));

        // The sink recovers once the directory appears
        fs::create_dir(dir.path().join("missing")).unwrap();
        sink.write(&Record::new(Level::Error, "kept")).unwrap();
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "kept\n");
    }
}
