use chrono::Utc;
use thiserror::Error;

const NANOSECONDS_PER_UNIT: [(&str, i64); 8] = [
    ("ns", 1),
    ("us", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
    ("d", 86_400_000_000_000),
    ("w", 604_800_000_000_000),
];

/// Keyword accepted as the end of a window meaning "the current instant".
pub const NOW: &str = "now";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("duration {0:?} has no recognised unit (expected one of ns, us, ms, s, m, h, d, w)")]
    UnknownUnit(String),

    #[error("duration {0:?} does not start with a whole number")]
    InvalidNumber(String),

    #[error("duration {0:?} does not fit in 64 bits of nanoseconds")]
    Overflow(String),
}

/// Parses a signed duration such as `-1d`, `90s` or `250ms` into nanoseconds.
///
/// The value is an optionally signed integer followed by exactly one unit:
/// `ns`, `us`, `ms`, `s`, `m`, `h`, `d` or `w`.
pub fn parse_duration(value: &str) -> Result<i64, DurationError> {
    let value = value.trim();

    // two-letter units are checked first so "ms" never reads as "m"
    let (number, multiplier) = NANOSECONDS_PER_UNIT
        .iter()
        .filter(|(unit, _)| unit.len() == 2)
        .chain(NANOSECONDS_PER_UNIT.iter().filter(|(unit, _)| unit.len() == 1))
        .find_map(|(unit, multiplier)| value.strip_suffix(unit).map(|number| (number, *multiplier)))
        .ok_or_else(|| DurationError::UnknownUnit(value.to_string()))?;

    let number: i64 = number.parse().map_err(|_| DurationError::InvalidNumber(value.to_string()))?;

    number.checked_mul(multiplier).ok_or_else(|| DurationError::Overflow(value.to_string()))
}

/// Current time in nanoseconds since the unix epoch.
pub fn now_nanos() -> i64 {
    // saturates after the year 2262
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// A `[from, to]` range in nanoseconds since the unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: i64,
    pub to: i64,
}

impl TimeWindow {
    /// Resolves a window relative to `now`.
    ///
    /// `to` is either [`NOW`] or an offset from `now`; `from` is always an
    /// offset from the resolved `to`, so `-1d` looks one day back.
    pub fn resolve(from: &str, to: &str, now: i64) -> Result<Self, DurationError> {
        let to = if to.trim() == NOW { now } else { offset(now, to)? };
        let from = offset(to, from)?;

        Ok(Self { from, to })
    }

    /// Same as [`TimeWindow::resolve`] using the system clock.
    pub fn ending_now(from: &str, to: &str) -> Result<Self, DurationError> {
        Self::resolve(from, to, now_nanos())
    }
}

fn offset(base: i64, duration: &str) -> Result<i64, DurationError> {
    base.checked_add(parse_duration(duration)?)
        .ok_or_else(|| DurationError::Overflow(duration.to_string()))
}
