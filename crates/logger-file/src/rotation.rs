//! When files rotate and what the rotated files are called

use chrono::{
    DateTime, Datelike, Days, Local, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc, Weekday,
};
use std::fmt;
use std::str::FromStr;

const BACKUP_SUFFIX_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const BACKUP_SUFFIX_LEN: usize = "YYYY-MM-DD_HH-MM-SS".len();

/// Timezone in which timestamps are rendered and boundaries fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// Coordinated universal time
    #[default]
    Utc,
    /// The host's local time
    Local,
}

impl Zone {
    /// `Zone::Utc` when `use_utc` is set, else `Zone::Local`
    pub fn from_use_utc(use_utc: bool) -> Self {
        if use_utc { Zone::Utc } else { Zone::Local }
    }

    fn format(self, instant: DateTime<Utc>, pattern: &str) -> String {
        match self {
            Zone::Utc => instant.format(pattern).to_string(),
            Zone::Local => instant.with_timezone(&Local).format(pattern).to_string(),
        }
    }
}

/// How often a sink rotates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationInterval {
    /// Once a week, when the given weekday begins (`W0` = Monday … `W6` = Sunday)
    Weekly(Weekday),
    /// Once a day (`midnight`)
    Daily,
}

impl RotationInterval {
    /// Length of one rotation period
    pub fn period(self) -> TimeDelta {
        match self {
            RotationInterval::Weekly(_) => TimeDelta::days(7),
            RotationInterval::Daily => TimeDelta::days(1),
        }
    }

    fn matches(self, day: Weekday) -> bool {
        match self {
            RotationInterval::Weekly(weekday) => weekday == day,
            RotationInterval::Daily => true,
        }
    }
}

impl FromStr for RotationInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.eq_ignore_ascii_case("midnight") {
            return Ok(RotationInterval::Daily);
        }

        let index = token
            .strip_prefix(['W', 'w'])
            .and_then(|day| day.parse::<u8>().ok())
            .ok_or_else(|| format!("expected W0-W6 or midnight, got {token:?}"))?;
        let weekday = Weekday::try_from(index)
            .map_err(|_| format!("weekday index must be 0-6, got {index}"))?;
        Ok(RotationInterval::Weekly(weekday))
    }
}

impl fmt::Display for RotationInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationInterval::Weekly(weekday) => write!(f, "W{}", weekday.num_days_from_monday()),
            RotationInterval::Daily => f.write_str("midnight"),
        }
    }
}

/// Fixed rotation schedule of a sink: a cadence, a time of day and a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    interval: RotationInterval,
    at: NaiveTime,
    zone: Zone,
}

impl RotationPolicy {
    /// Rotate when `weekday` begins, at midnight UTC
    pub fn weekly(weekday: Weekday) -> Self {
        Self::new(RotationInterval::Weekly(weekday))
    }

    /// Rotate every midnight UTC
    pub fn daily() -> Self {
        Self::new(RotationInterval::Daily)
    }

    /// Rotate on `interval` at midnight UTC
    pub fn new(interval: RotationInterval) -> Self {
        Self {
            interval,
            at: NaiveTime::MIN,
            zone: Zone::Utc,
        }
    }

    /// Rotate at `at` instead of midnight
    pub fn with_at_time(mut self, at: NaiveTime) -> Self {
        self.at = at;
        self
    }

    /// Interpret boundaries in `zone`
    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zone = zone;
        self
    }

    /// The rotation cadence
    pub fn interval(&self) -> RotationInterval {
        self.interval
    }

    /// Length of one rotation period
    pub fn period(&self) -> TimeDelta {
        self.interval.period()
    }

    /// First boundary strictly after `after`.
    pub fn next_boundary(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        match self.zone {
            Zone::Utc => self.next_boundary_in(&Utc, after),
            Zone::Local => self.next_boundary_in(&Local, after),
        }
    }

    fn next_boundary_in<Tz: TimeZone>(&self, tz: &Tz, after: DateTime<Utc>) -> DateTime<Utc> {
        let start = after.with_timezone(tz).date_naive();
        for offset in 0..=7 {
            let Some(date) = start.checked_add_days(Days::new(offset)) else {
                break;
            };
            if !self.interval.matches(date.weekday()) {
                continue;
            }
            if let Some(candidate) = resolve(tz, date.and_time(self.at))
                && candidate > after
            {
                return candidate;
            }
        }
        after + self.period()
    }

    /// Suffix appended to a file rotated at `boundary`: the start of the
    /// period the file covered.
    pub fn backup_suffix(&self, boundary: DateTime<Utc>) -> String {
        self.zone.format(boundary - self.period(), BACKUP_SUFFIX_FORMAT)
    }
}

/// The instant a wall-clock time names in `tz`.
///
/// An ambiguous time takes its earlier reading. A time skipped by a
/// spring-forward gap moves one hour later, so the boundary still falls on
/// its day.
fn resolve<Tz: TimeZone>(tz: &Tz, wall: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&wall)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(wall + TimeDelta::hours(1))).earliest())
        .map(|instant| instant.with_timezone(&Utc))
}

/// True when `suffix` looks like something [`RotationPolicy::backup_suffix`]
/// produced, optionally followed by a `.N` collision counter.
pub(crate) fn is_backup_suffix(suffix: &str) -> bool {
    let Some((stamp, rest)) = suffix
        .get(..BACKUP_SUFFIX_LEN)
        .zip(suffix.get(BACKUP_SUFFIX_LEN..))
    else {
        return false;
    };
    if NaiveDateTime::parse_from_str(stamp, BACKUP_SUFFIX_FORMAT).is_err() {
        return false;
    }
    match rest.strip_prefix('.') {
        None => rest.is_empty(),
        Some(counter) => !counter.is_empty() && counter.bytes().all(|b| b.is_ascii_digit()),
    }
}
