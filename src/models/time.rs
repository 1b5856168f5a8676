//! Core time types: spans, instants, and half-open intervals.
//!
//! All execution timing is carried in microseconds. `TimeSpan` is a
//! non-negative duration saturating at [`TimeSpan::MAX`]; `Timestamp` is a
//! UTC instant with microsecond precision; `TimestampInterval` is the
//! half-open `[start, end)` window used throughout time accounting.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Non-negative time span with microsecond resolution.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimeSpan(u64);

impl TimeSpan {
    pub const ZERO: TimeSpan = TimeSpan(0);

    /// Largest representable span. Categorized-time sums saturate here.
    pub const MAX: TimeSpan = TimeSpan(i64::MAX as u64);

    pub const fn from_microseconds(micros: u64) -> TimeSpan {
        if micros > TimeSpan::MAX.0 {
            TimeSpan::MAX
        } else {
            TimeSpan(micros)
        }
    }

    pub const fn from_milliseconds(millis: u64) -> TimeSpan {
        TimeSpan::from_microseconds(millis.saturating_mul(1_000))
    }

    pub const fn from_seconds(seconds: u64) -> TimeSpan {
        TimeSpan::from_microseconds(seconds.saturating_mul(1_000_000))
    }

    pub const fn from_minutes(minutes: u64) -> TimeSpan {
        TimeSpan::from_seconds(minutes.saturating_mul(60))
    }

    pub const fn from_hours(hours: u64) -> TimeSpan {
        TimeSpan::from_minutes(hours.saturating_mul(60))
    }

    pub const fn from_days(days: u64) -> TimeSpan {
        TimeSpan::from_hours(days.saturating_mul(24))
    }

    /// Span from fractional seconds. Negative or non-finite input yields zero.
    pub fn from_seconds_f64(seconds: f64) -> TimeSpan {
        if !seconds.is_finite() || seconds <= 0.0 {
            return TimeSpan::ZERO;
        }
        TimeSpan::from_microseconds((seconds * 1e6).round() as u64)
    }

    pub const fn microseconds(&self) -> u64 {
        self.0
    }

    pub fn seconds(&self) -> f64 {
        self.0 as f64 / 1e6
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn saturating_add(self, other: TimeSpan) -> TimeSpan {
        TimeSpan::from_microseconds(self.0.saturating_add(other.0))
    }

    pub const fn saturating_sub(self, other: TimeSpan) -> TimeSpan {
        TimeSpan(self.0.saturating_sub(other.0))
    }

    pub const fn saturating_mul(self, factor: u64) -> TimeSpan {
        TimeSpan::from_microseconds(self.0.saturating_mul(factor))
    }

    pub fn min(self, other: TimeSpan) -> TimeSpan {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

impl std::ops::Add for TimeSpan {
    type Output = TimeSpan;

    fn add(self, other: TimeSpan) -> TimeSpan {
        self.saturating_add(other)
    }
}

impl std::ops::Sub for TimeSpan {
    type Output = TimeSpan;

    fn sub(self, other: TimeSpan) -> TimeSpan {
        self.saturating_sub(other)
    }
}

impl std::iter::Sum for TimeSpan {
    fn sum<I: Iterator<Item = TimeSpan>>(iter: I) -> TimeSpan {
        iter.fold(TimeSpan::ZERO, TimeSpan::saturating_add)
    }
}

impl std::fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0 / 1_000_000;
        let micros = self.0 % 1_000_000;
        if micros == 0 {
            write!(f, "{} s", secs)
        } else {
            let frac = format!("{:06}", micros);
            write!(f, "{}.{} s", secs, frac.trim_end_matches('0'))
        }
    }
}

/// UTC instant with microsecond precision.
///
/// Instants outside chrono's representable range cannot be constructed;
/// sub-microsecond precision is truncated on entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// 1970-01-01T00:00:00Z.
    pub const UNIX_EPOCH: Timestamp = Timestamp(DateTime::UNIX_EPOCH);

    pub fn from_microseconds(micros: i64) -> Option<Timestamp> {
        Utc.timestamp_micros(micros).single().map(Timestamp)
    }

    /// Truncates to microsecond precision.
    pub fn from_datetime(dt: DateTime<Utc>) -> Timestamp {
        let micros = dt.timestamp_micros();
        Timestamp(
            Utc.timestamp_micros(micros)
                .single()
                .unwrap_or(DateTime::UNIX_EPOCH),
        )
    }

    pub fn parse(s: &str) -> Result<Timestamp, String> {
        s.parse::<DateTime<Utc>>()
            .map(Timestamp::from_datetime)
            .map_err(|e| format!("'{}' is not a valid timestamp: {}", s, e))
    }

    pub fn microseconds(&self) -> i64 {
        self.0.timestamp_micros()
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn checked_add(self, span: TimeSpan) -> Option<Timestamp> {
        let micros = self.microseconds().checked_add(span.microseconds() as i64)?;
        Timestamp::from_microseconds(micros)
    }

    pub fn checked_sub(self, span: TimeSpan) -> Option<Timestamp> {
        let micros = self.microseconds().checked_sub(span.microseconds() as i64)?;
        Timestamp::from_microseconds(micros)
    }

    /// Span from `self` to `other`, zero when `other` is not after `self`.
    pub fn until(&self, other: Timestamp) -> TimeSpan {
        let delta = other.microseconds().saturating_sub(self.microseconds());
        if delta <= 0 {
            TimeSpan::ZERO
        } else {
            TimeSpan::from_microseconds(delta as u64)
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

/// Half-open interval `[start, end)` over [`Timestamp`].
///
/// `start <= end` always holds; an interval is empty iff `start == end`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimestampInterval {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimestampInterval {
    /// Interval between two instants, in either argument order.
    pub fn between(a: Timestamp, b: Timestamp) -> TimestampInterval {
        if a <= b {
            TimestampInterval { start: a, end: b }
        } else {
            TimestampInterval { start: b, end: a }
        }
    }

    pub fn empty_at(t: Timestamp) -> TimestampInterval {
        TimestampInterval { start: t, end: t }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn duration(&self) -> TimeSpan {
        self.start.until(self.end)
    }

    pub fn contains(&self, t: Timestamp) -> bool {
        self.start <= t && t < self.end
    }

    pub fn contains_interval(&self, other: &TimestampInterval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True when the two intervals share a non-empty range.
    pub fn overlaps(&self, other: &TimestampInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when the two intervals touch end-to-start without overlapping.
    pub fn abuts(&self, other: &TimestampInterval) -> bool {
        self.end == other.start || other.end == self.start
    }

    /// Smallest interval covering both.
    pub fn span(&self, other: &TimestampInterval) -> TimestampInterval {
        TimestampInterval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Non-empty intersection, if any.
    pub fn intersection(&self, other: &TimestampInterval) -> Option<TimestampInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(TimestampInterval { start, end })
    }

    /// The up-to-two non-empty pieces of `self` not covered by `other`.
    pub fn minus(&self, other: &TimestampInterval) -> Vec<TimestampInterval> {
        let mut pieces = Vec::with_capacity(2);
        if other.start > self.start {
            let end = other.start.min(self.end);
            if self.start < end {
                pieces.push(TimestampInterval {
                    start: self.start,
                    end,
                });
            }
        }
        if other.end < self.end {
            let start = other.end.max(self.start);
            if start < self.end {
                pieces.push(TimestampInterval {
                    start,
                    end: self.end,
                });
            }
        }
        if pieces.is_empty() && !self.overlaps(other) && !self.is_empty() {
            pieces.push(*self);
        }
        pieces
    }
}

impl std::fmt::Display for TimestampInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_microseconds(secs * 1_000_000).unwrap()
    }

    #[test]
    fn test_time_span_display() {
        assert_eq!(TimeSpan::from_seconds(769).to_string(), "769 s");
        assert_eq!(TimeSpan::from_milliseconds(769_200).to_string(), "769.2 s");
        assert_eq!(TimeSpan::from_microseconds(1).to_string(), "0.000001 s");
    }

    #[test]
    fn test_time_span_saturates_at_max() {
        assert_eq!(TimeSpan::MAX.saturating_add(TimeSpan::from_seconds(1)), TimeSpan::MAX);
        assert_eq!(
            TimeSpan::ZERO.saturating_sub(TimeSpan::from_seconds(1)),
            TimeSpan::ZERO
        );
    }

    #[test]
    fn test_timestamp_truncates_to_micros() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(1234);
        let t = Timestamp::from_datetime(dt);
        assert_eq!(t.microseconds() % 1_000_000, 1);
    }

    #[test]
    fn test_timestamp_until() {
        assert_eq!(ts(10).until(ts(25)), TimeSpan::from_seconds(15));
        assert_eq!(ts(25).until(ts(10)), TimeSpan::ZERO);
    }

    #[test]
    fn test_interval_between_orders_endpoints() {
        let i = TimestampInterval::between(ts(20), ts(10));
        assert_eq!(i.start, ts(10));
        assert_eq!(i.end, ts(20));
        assert_eq!(i.duration(), TimeSpan::from_seconds(10));
    }

    #[test]
    fn test_interval_contains_is_half_open() {
        let i = TimestampInterval::between(ts(10), ts(20));
        assert!(i.contains(ts(10)));
        assert!(!i.contains(ts(20)));
    }

    #[test]
    fn test_interval_overlap_and_abut() {
        let a = TimestampInterval::between(ts(0), ts(10));
        let b = TimestampInterval::between(ts(10), ts(20));
        let c = TimestampInterval::between(ts(5), ts(15));
        assert!(!a.overlaps(&b));
        assert!(a.abuts(&b));
        assert!(a.overlaps(&c));
        assert!(!a.abuts(&c));
    }

    #[test]
    fn test_interval_minus_splits() {
        let outer = TimestampInterval::between(ts(0), ts(30));
        let inner = TimestampInterval::between(ts(10), ts(20));
        let pieces = outer.minus(&inner);
        assert_eq!(
            pieces,
            vec![
                TimestampInterval::between(ts(0), ts(10)),
                TimestampInterval::between(ts(20), ts(30)),
            ]
        );
    }

    #[test]
    fn test_interval_minus_disjoint_returns_self() {
        let a = TimestampInterval::between(ts(0), ts(5));
        let b = TimestampInterval::between(ts(10), ts(20));
        assert_eq!(a.minus(&b), vec![a]);
    }

    #[test]
    fn test_intersection() {
        let a = TimestampInterval::between(ts(0), ts(10));
        let b = TimestampInterval::between(ts(5), ts(15));
        assert_eq!(
            a.intersection(&b),
            Some(TimestampInterval::between(ts(5), ts(10)))
        );
        let c = TimestampInterval::between(ts(10), ts(15));
        assert_eq!(a.intersection(&c), None);
    }
}
