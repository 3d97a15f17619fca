//! Selection of sinks for a record

use crate::sink::RotatingFileSink;
use pocs_logger::{Level, Record};
use std::collections::HashSet;
use std::sync::Arc;

/// Name under which the root router is reachable
pub const ROOT: &str = "";

/// A named route to a fixed set of sinks.
///
/// The sink set is resolved once at setup: the router's own handlers
/// followed by those of every ancestor it propagates to, with duplicates
/// removed. Routing a record is then a pure filter over that set.
#[derive(Debug, Clone)]
pub struct Router {
    name: String,
    level: Level,
    sinks: Vec<Arc<RotatingFileSink>>,
}

impl Router {
    /// Create a router that drops records below `level` and hands the rest
    /// to every sink in `sinks` whose threshold they meet.
    pub fn new(
        name: impl Into<String>,
        level: Level,
        sinks: impl IntoIterator<Item = Arc<RotatingFileSink>>,
    ) -> Self {
        let mut seen = HashSet::new();
        let sinks = sinks
            .into_iter()
            .filter(|sink| seen.insert(sink.name().to_string()))
            .collect();
        Self {
            name: name.into(),
            level,
            sinks,
        }
    }

    /// Router name; empty for root
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is the root router
    pub fn is_root(&self) -> bool {
        self.name == ROOT
    }

    /// Effective router-level threshold
    pub fn level(&self) -> Level {
        self.level
    }

    /// Every sink this router can deliver to, in delivery order
    pub fn sinks(&self) -> &[Arc<RotatingFileSink>] {
        &self.sinks
    }

    /// Names of [`Router::sinks`]
    pub fn sink_names(&self) -> impl Iterator<Item = &str> {
        self.sinks.iter().map(|sink| sink.name())
    }

    /// Whether a record at `level` reaches at least one sink
    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.level && self.sinks.iter().any(|sink| sink.accepts(level))
    }

    /// The sinks that should receive `record`.
    pub fn route(&self, record: &Record) -> Vec<Arc<RotatingFileSink>> {
        if record.level < self.level {
            return Vec::new();
        }
        self.sinks
            .iter()
            .filter(|sink| sink.accepts(record.level))
            .cloned()
            .collect()
    }
}

/// The enclosing name of a dotted or `::`-separated logger name.
///
/// `None` for top-level names, whose parent is root.
pub(crate) fn parent_name(name: &str) -> Option<&str> {
    let split = name.rfind(['.', ':'])?;
    let parent = name[..split].trim_end_matches(':');
    (!parent.is_empty()).then_some(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::Formatter;
    use crate::rotation::Zone;

    fn sink(name: &str, threshold: Level) -> Arc<RotatingFileSink> {
        Arc::new(
            RotatingFileSink::new(
                name,
                format!("/nonexistent/{name}.log"),
                Arc::new(Formatter::fallback(Zone::Utc)),
            )
            .with_threshold(threshold),
        )
    }

    fn names(sinks: &[Arc<RotatingFileSink>]) -> Vec<&str> {
        sinks.iter().map(|sink| sink.name()).collect()
    }

    #[test]
    fn test_route_filters_by_threshold() {
        let router = Router::new(
            "error",
            Level::Debug,
            [
                sink("error", Level::Error),
                sink("all", Level::Debug),
                sink("warn", Level::Warning),
            ],
        );

        let routed = router.route(&Record::new(Level::Error, "disk full"));
        assert_eq!(names(&routed), ["error", "all", "warn"]);

        let routed = router.route(&Record::new(Level::Debug, "starting"));
        assert_eq!(names(&routed), ["all"]);
    }

    #[test]
    fn test_duplicate_sinks_are_dropped() {
        let all = sink("all", Level::Debug);
        let router = Router::new("all", Level::Debug, [all.clone(), sink("warn", Level::Warning), all]);
        assert_eq!(router.sink_names().collect::<Vec<_>>(), ["all", "warn"]);
    }

    #[test]
    fn test_router_level_drops_first() {
        let router = Router::new("quiet", Level::Error, [sink("all", Level::Debug)]);
        assert!(router.route(&Record::new(Level::Warning, "ignored")).is_empty());
        assert!(!router.is_enabled(Level::Warning));
        assert!(router.is_enabled(Level::Critical));
    }

    #[test]
    fn test_parent_name() {
        assert_eq!(parent_name("all"), None);
        assert_eq!(parent_name("mount.serial"), Some("mount"));
        assert_eq!(parent_name("pocs::mount::serial"), Some("pocs::mount"));
        assert_eq!(parent_name("pocs::mount"), Some("pocs"));
        assert_eq!(parent_name(".hidden"), None);
    }
}
