//! Signed millisecond durations used to compute time-relative arguments.
//!
//! A [`TimeSpan`] is an immutable count of milliseconds bounded by
//! [`MAX_SAFE_MILLIS`]. Spans are built from unit factories, from
//! day/hour/minute/second components, or by parsing the compact interval
//! grammar duplicity itself accepts (`3Y2W`, `1h10m`, ...).
//!
//! ```
//! use duplicity_wrapper::TimeSpan;
//!
//! let span: TimeSpan = "2W1D".parse().unwrap();
//! assert_eq!(span.days(), 15);
//! ```

mod parse;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub use parse::unit_millis;

/// Largest magnitude a span may hold (2^53 - 1).
pub const MAX_SAFE_MILLIS: i64 = 9_007_199_254_740_991;

pub const MILLIS_PER_SECOND: i64 = 1_000;
pub const MILLIS_PER_MINUTE: i64 = MILLIS_PER_SECOND * 60;
pub const MILLIS_PER_HOUR: i64 = MILLIS_PER_MINUTE * 60;
pub const MILLIS_PER_DAY: i64 = MILLIS_PER_HOUR * 24;
pub const MILLIS_PER_WEEK: i64 = MILLIS_PER_DAY * 7;
pub const MILLIS_PER_MONTH: i64 = MILLIS_PER_DAY * 30;
pub const MILLIS_PER_YEAR: i64 = MILLIS_PER_DAY * 365;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeSpanError {
    #[error("value {0} is outside the valid span range")]
    OutOfRange(String),

    #[error("time string '{0}' is invalid")]
    Invalid(String),

    #[error("date arithmetic overflowed")]
    DateOverflow,

    #[error("negative span {0} cannot be used as a duration")]
    Negative(TimeSpan),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeSpan {
    millis: i64,
}

impl TimeSpan {
    pub const ZERO: TimeSpan = TimeSpan { millis: 0 };
    pub const MAX: TimeSpan = TimeSpan {
        millis: MAX_SAFE_MILLIS,
    };
    pub const MIN: TimeSpan = TimeSpan {
        millis: -MAX_SAFE_MILLIS,
    };

    /// Build a span from an exact millisecond count.
    pub fn from_millis_checked(millis: i64) -> Result<Self, TimeSpanError> {
        if millis > MAX_SAFE_MILLIS || millis < -MAX_SAFE_MILLIS {
            return Err(TimeSpanError::OutOfRange(millis.to_string()));
        }
        Ok(Self { millis })
    }

    /// Scale `value` by `scale` milliseconds, rounding half away from zero.
    fn interval(value: f64, scale: i64) -> Result<Self, TimeSpanError> {
        let scaled = value * scale as f64;
        if !scaled.is_finite() || scaled.abs() > MAX_SAFE_MILLIS as f64 {
            return Err(TimeSpanError::OutOfRange(value.to_string()));
        }
        Self::from_millis_checked(scaled.round() as i64)
    }

    pub fn from_days(value: f64) -> Result<Self, TimeSpanError> {
        Self::interval(value, MILLIS_PER_DAY)
    }

    pub fn from_hours(value: f64) -> Result<Self, TimeSpanError> {
        Self::interval(value, MILLIS_PER_HOUR)
    }

    pub fn from_minutes(value: f64) -> Result<Self, TimeSpanError> {
        Self::interval(value, MILLIS_PER_MINUTE)
    }

    pub fn from_seconds(value: f64) -> Result<Self, TimeSpanError> {
        Self::interval(value, MILLIS_PER_SECOND)
    }

    pub fn from_milliseconds(value: f64) -> Result<Self, TimeSpanError> {
        Self::interval(value, 1)
    }

    /// Hours, minutes and seconds summed linearly.
    pub fn from_time(hours: i64, minutes: i64, seconds: i64) -> Result<Self, TimeSpanError> {
        Self::from_components(0, hours, minutes, seconds, 0)
    }

    /// Sum the components without normalizing them, so `minutes = 130`
    /// simply contributes 130 minutes.
    pub fn from_components(
        days: i64,
        hours: i64,
        minutes: i64,
        seconds: i64,
        milliseconds: i64,
    ) -> Result<Self, TimeSpanError> {
        let parts = [
            (days, MILLIS_PER_DAY),
            (hours, MILLIS_PER_HOUR),
            (minutes, MILLIS_PER_MINUTE),
            (seconds, MILLIS_PER_SECOND),
            (milliseconds, 1),
        ];

        let mut total: i64 = 0;
        for (value, scale) in parts {
            total = value
                .checked_mul(scale)
                .and_then(|ms| total.checked_add(ms))
                .ok_or_else(|| {
                    TimeSpanError::OutOfRange(format!(
                        "{days}d {hours}h {minutes}m {seconds}s {milliseconds}ms"
                    ))
                })?;
        }

        Self::from_millis_checked(total)
    }

    /// Parse the compact interval grammar, e.g. `2W1D1h130m`.
    pub fn parse(value: &str) -> Result<Self, TimeSpanError> {
        parse::parse_compact(value).and_then(Self::from_millis_checked)
    }

    pub fn days(&self) -> i64 {
        self.millis / MILLIS_PER_DAY
    }

    pub fn hours(&self) -> i64 {
        (self.millis / MILLIS_PER_HOUR) % 24
    }

    pub fn minutes(&self) -> i64 {
        (self.millis / MILLIS_PER_MINUTE) % 60
    }

    pub fn seconds(&self) -> i64 {
        (self.millis / MILLIS_PER_SECOND) % 60
    }

    pub fn milliseconds(&self) -> i64 {
        self.millis % MILLIS_PER_SECOND
    }

    pub fn total_days(&self) -> f64 {
        self.millis as f64 / MILLIS_PER_DAY as f64
    }

    pub fn total_hours(&self) -> f64 {
        self.millis as f64 / MILLIS_PER_HOUR as f64
    }

    pub fn total_minutes(&self) -> f64 {
        self.millis as f64 / MILLIS_PER_MINUTE as f64
    }

    pub fn total_seconds(&self) -> f64 {
        self.millis as f64 / MILLIS_PER_SECOND as f64
    }

    pub fn total_milliseconds(&self) -> i64 {
        self.millis
    }

    pub fn is_negative(&self) -> bool {
        self.millis < 0
    }

    pub fn checked_add(&self, other: TimeSpan) -> Result<Self, TimeSpanError> {
        // Both operands are within 2^53, so the i64 sum cannot overflow.
        Self::from_millis_checked(self.millis + other.millis)
    }

    pub fn checked_sub(&self, other: TimeSpan) -> Result<Self, TimeSpanError> {
        Self::from_millis_checked(self.millis - other.millis)
    }

    pub fn add_to_date<Tz: TimeZone>(&self, date: DateTime<Tz>) -> Result<DateTime<Tz>, TimeSpanError> {
        date.checked_add_signed(chrono::Duration::milliseconds(self.millis))
            .ok_or(TimeSpanError::DateOverflow)
    }

    pub fn subtract_from_date<Tz: TimeZone>(
        &self,
        date: DateTime<Tz>,
    ) -> Result<DateTime<Tz>, TimeSpanError> {
        date.checked_sub_signed(chrono::Duration::milliseconds(self.millis))
            .ok_or(TimeSpanError::DateOverflow)
    }
}

impl std::ops::Neg for TimeSpan {
    type Output = TimeSpan;

    fn neg(self) -> TimeSpan {
        // The range is symmetric so negation always stays in bounds.
        TimeSpan {
            millis: -self.millis,
        }
    }
}

impl FromStr for TimeSpan {
    type Err = TimeSpanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<TimeSpan> for std::time::Duration {
    type Error = TimeSpanError;

    fn try_from(span: TimeSpan) -> Result<Self, Self::Error> {
        if span.is_negative() {
            return Err(TimeSpanError::Negative(span));
        }
        Ok(std::time::Duration::from_millis(span.millis as u64))
    }
}

impl TryFrom<std::time::Duration> for TimeSpan {
    type Error = TimeSpanError;

    fn try_from(duration: std::time::Duration) -> Result<Self, Self::Error> {
        let millis = i64::try_from(duration.as_millis())
            .map_err(|_| TimeSpanError::OutOfRange(format!("{duration:?}")))?;
        Self::from_millis_checked(millis)
    }
}

/// Renders the compact grammar, largest unit first. Months and years are
/// never emitted since they are not exact multiples of the smaller units.
impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.millis == 0 {
            return f.write_str("0s");
        }
        if self.millis < 0 {
            f.write_str("-")?;
        }

        let mut rest = self.millis.unsigned_abs();
        for (unit, scale) in [
            ('W', MILLIS_PER_WEEK),
            ('D', MILLIS_PER_DAY),
            ('h', MILLIS_PER_HOUR),
            ('m', MILLIS_PER_MINUTE),
        ] {
            let scale = scale as u64;
            if rest >= scale {
                write!(f, "{}{}", rest / scale, unit)?;
                rest %= scale;
            }
        }

        let seconds = rest / MILLIS_PER_SECOND as u64;
        let millis = rest % MILLIS_PER_SECOND as u64;
        match (seconds, millis) {
            (0, 0) => Ok(()),
            (s, 0) => write!(f, "{s}s"),
            (s, ms) => write!(f, "{s}.{ms:03}s"),
        }
    }
}

impl Serialize for TimeSpan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.millis)
    }
}

impl<'de> Deserialize<'de> for TimeSpan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Millis(i64),
            Compact(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => TimeSpan::from_millis_checked(ms),
            Raw::Compact(s) => TimeSpan::parse(&s),
        }
        .map_err(serde::de::Error::custom)
    }
}
