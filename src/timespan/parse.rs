//! Parser for duplicity's compact interval strings.
//!
//! The grammar is zero or more `<digits><unit>` tokens, e.g. `3Y2W` or
//! `1h10m`. Months and years are fixed at 30 and 365 days, matching the
//! duplicity manual.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    TimeSpanError, MILLIS_PER_DAY, MILLIS_PER_HOUR, MILLIS_PER_MINUTE, MILLIS_PER_MONTH,
    MILLIS_PER_SECOND, MILLIS_PER_WEEK, MILLIS_PER_YEAR,
};

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)([smhDWMY])").expect("interval token pattern is valid")
});

/// Milliseconds per unit letter, or `None` for an unknown letter.
pub fn unit_millis(unit: char) -> Option<i64> {
    match unit {
        's' => Some(MILLIS_PER_SECOND),
        'm' => Some(MILLIS_PER_MINUTE),
        'h' => Some(MILLIS_PER_HOUR),
        'D' => Some(MILLIS_PER_DAY),
        'W' => Some(MILLIS_PER_WEEK),
        'M' => Some(MILLIS_PER_MONTH),
        'Y' => Some(MILLIS_PER_YEAR),
        _ => None,
    }
}

/// Sum the tokens of `value` into a millisecond count.
///
/// Tokens must be contiguous and cover the whole (trimmed) input; a gap or
/// trailing garbage rejects the string instead of being skipped.
pub(super) fn parse_compact(value: &str) -> Result<i64, TimeSpanError> {
    let trimmed = value.trim();
    let invalid = || TimeSpanError::Invalid(trimmed.to_string());

    let mut expected_start = 0;
    let mut total: i64 = 0;

    for caps in TOKEN.captures_iter(trimmed) {
        let whole = caps.get(0).ok_or_else(invalid)?;
        if whole.start() != expected_start {
            return Err(invalid());
        }
        expected_start = whole.end();

        let count: i64 = caps[1].parse().map_err(|_| invalid())?;
        let unit = caps[2].chars().next().and_then(unit_millis).ok_or_else(invalid)?;

        total = count
            .checked_mul(unit)
            .and_then(|ms| total.checked_add(ms))
            .ok_or_else(|| TimeSpanError::OutOfRange(trimmed.to_string()))?;
    }

    if expected_start != trimmed.len() {
        return Err(invalid());
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::super::TimeSpan;
    use super::*;

    #[test]
    fn test_parse_two_weeks() {
        let span = TimeSpan::parse("2W").unwrap();
        assert_eq!(span.total_milliseconds(), 14 * 86_400_000);
    }

    #[test]
    fn test_parse_mixed_units_sum() {
        let span = TimeSpan::parse("2W1D1h130m").unwrap();
        assert_eq!(
            span.total_milliseconds(),
            2 * 7 * 86_400_000 + 86_400_000 + 3_600_000 + 130 * 60_000
        );
    }

    #[test]
    fn test_parse_month_and_year_lengths() {
        assert_eq!(TimeSpan::parse("1M").unwrap().days(), 30);
        assert_eq!(TimeSpan::parse("1Y").unwrap().days(), 365);
        assert_eq!(TimeSpan::parse("3Y2W").unwrap().days(), 3 * 365 + 14);
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(TimeSpan::parse("1m").unwrap().total_minutes(), 1.0);
        assert_eq!(TimeSpan::parse("1M").unwrap().total_days(), 30.0);
        assert!(TimeSpan::parse("1d").is_err());
        assert!(TimeSpan::parse("1H").is_err());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(TimeSpan::parse("  10s \n").unwrap().total_seconds(), 10.0);
    }

    #[test]
    fn test_parse_empty_is_zero() {
        assert_eq!(TimeSpan::parse("").unwrap(), TimeSpan::ZERO);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["abc", "2W!", "x2W", "2W 1D", "2", "W", "1h-5m", "1.5h", "+3s"] {
            assert!(
                matches!(TimeSpan::parse(bad), Err(TimeSpanError::Invalid(_))),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(matches!(
            TimeSpan::parse("99999999999999Y"),
            Err(TimeSpanError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_unit_millis_table() {
        assert_eq!(unit_millis('W'), Some(MILLIS_PER_WEEK));
        assert_eq!(unit_millis('x'), None);
    }
}
