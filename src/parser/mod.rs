//! Duplicity output parsers
//!
//! Each parser targets the text one duplicity command prints and fails with
//! a parse error when an expected line is missing, rather than guessing.

pub mod listing;
pub mod remove;
pub mod stats;
pub mod verify;

use chrono::{DateTime, Duration, Local, NaiveDateTime, Offset, TimeZone};

use crate::error::{DuplicityError, ErrorCode, Result};
use crate::subprocess::ProcessOutput;

pub use listing::parse_file_listing;
pub use remove::{parse_remove_all_but_n_full, parse_remove_older_than, RemovalSummary};
pub use stats::parse_backup_statistics;
pub use verify::{parse_verify, VerifySummary};

/// Printed by `incr` when it decided to run a full backup instead.
pub const LAST_FULL_TOO_OLD: Marker = Marker("Last full backup is too old");
/// Printed by the remove commands when `--force` was not given.
pub const RERUN_WITH_FORCE: Marker = Marker("Rerun command with --force");
pub const NO_OLD_BACKUP_SETS: Marker = Marker("No old backup sets found");

/// Line prefixes of timestamped listing lines.
const WEEKDAYS: [&str; 7] = ["Mon ", "Tue ", "Wed ", "Thu ", "Fri ", "Sat ", "Sun "];

/// Longer than any DST transition gap.
const GAP_LOOKBACK_HOURS: i64 = 3;

/// Format of the ctime-style dates duplicity prints.
const CTIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Number of whitespace-separated fields in a ctime-style date.
pub(crate) const DATE_FIELDS: usize = 5;

/// Literal text anywhere in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker(pub &'static str);

impl Marker {
    pub fn present(&self, text: &str) -> bool {
        text.contains(self.0)
    }
}

/// A line of the form `<Label> <value> ...` starting at column zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabeledLine(pub &'static str);

impl LabeledLine {
    /// First whitespace-delimited token after the label, if the label occurs.
    pub fn find<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.lines().find_map(|line| {
            let rest = line.strip_prefix(self.0)?.strip_prefix(' ')?;
            rest.split_whitespace().next()
        })
    }

    /// Like [`find`](Self::find) but parsed, failing loudly on absence or
    /// malformed numbers.
    pub fn parse<T: std::str::FromStr>(&self, text: &str) -> Result<T> {
        let raw = self.find(text).ok_or_else(|| {
            DuplicityError::parse(
                ErrorCode::PARSE_MISSING_LABEL,
                format!("missing '{}' in output", self.0),
                text,
            )
        })?;
        raw.parse().map_err(|_| {
            DuplicityError::parse(
                ErrorCode::PARSE_INVALID_NUMBER,
                format!("invalid value '{}' for '{}'", raw, self.0),
                text,
            )
        })
    }
}

/// Fail with an execution error unless the process exited with status 0.
pub fn ensure_success(output: &ProcessOutput, command: &str) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(DuplicityError::execution(
        command,
        output.status.code(),
        output.stderr.clone(),
    ))
}

/// Lines that begin with an abbreviated weekday.
pub(crate) fn weekday_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .filter(|line| WEEKDAYS.iter().any(|day| line.starts_with(day)))
}

/// Parse a ctime-style date in local time.
///
/// Runs of whitespace are collapsed first, so day-of-month padding does not
/// matter.
pub(crate) fn parse_ctime(value: &str, output: &str) -> Result<DateTime<Local>> {
    let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
    let invalid = || {
        DuplicityError::parse(
            ErrorCode::PARSE_INVALID_DATE,
            format!("invalid date '{}'", value.trim()),
            output,
        )
    };

    let naive = NaiveDateTime::parse_from_str(&normalized, CTIME_FORMAT).map_err(|_| invalid())?;
    resolve_local(&Local, &naive).ok_or_else(invalid)
}

/// Map a wall-clock time onto `tz`.
///
/// Ambiguous times take the earlier instant. Times skipped by a forward
/// jump are read with the offset in force before the jump, so they land as
/// far past the gap as they were into it.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(naive).earliest().or_else(|| {
        let before = *naive - Duration::hours(GAP_LOOKBACK_HOURS);
        let offset = tz.offset_from_local_datetime(&before).earliest()?.fix();
        Some(tz.from_utc_datetime(&(*naive - offset)))
    })
}

/// Split a listing line into its date part and whatever follows it.
pub(crate) fn split_dated_line(line: &str) -> (String, String) {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let split = fields.len().min(DATE_FIELDS);
    (fields[..split].join(" "), fields[split..].join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::ExitStatus;
    use chrono::{Datelike, Timelike};
    use std::time::Duration;

    fn output(status: ExitStatus, stderr: &str) -> ProcessOutput {
        ProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.to_string(),
            duration: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_labeled_line_matches_at_line_start_only() {
        let text = "xNewFiles 9\nNewFileSize 10 (10 bytes)\nNewFiles 3\n";
        assert_eq!(LabeledLine("NewFiles").find(text), Some("3"));
        assert_eq!(LabeledLine("NewFileSize").find(text), Some("10"));
        assert_eq!(LabeledLine("Errors").find(text), None);
    }

    #[test]
    fn test_labeled_line_parse_errors() {
        let missing = LabeledLine("Errors").parse::<u64>("SourceFiles 1\n").unwrap_err();
        assert_eq!(missing.code(), ErrorCode::PARSE_MISSING_LABEL);
        assert!(missing.to_string().contains("Errors"));

        let invalid = LabeledLine("Errors").parse::<u64>("Errors many\n").unwrap_err();
        assert_eq!(invalid.code(), ErrorCode::PARSE_INVALID_NUMBER);
    }

    #[test]
    fn test_marker() {
        assert!(RERUN_WITH_FORCE.present("...\nRerun command with --force option to actually delete.\n"));
        assert!(!NO_OLD_BACKUP_SETS.present("nothing here"));
    }

    #[test]
    fn test_ensure_success() {
        assert!(ensure_success(&output(ExitStatus::Success, ""), "full").is_ok());

        let err = ensure_success(&output(ExitStatus::Error(23), "broken\n"), "full").unwrap_err();
        match err {
            DuplicityError::Execution {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, Some(23));
                assert_eq!(stderr, "broken\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_weekday_lines_include_sunday() {
        let text = "Last full backup date: none\nSun Mar 10 12:00:00 2024 .\nSunday is not a date\nMon Mar 11 01:02:03 2024 a\n";
        let lines: Vec<_> = weekday_lines(text).collect();
        assert_eq!(
            lines,
            vec!["Sun Mar 10 12:00:00 2024 .", "Mon Mar 11 01:02:03 2024 a"]
        );
    }

    #[test]
    fn test_parse_ctime_handles_padding() {
        let date = parse_ctime("Sun Mar  3 12:00:05 2024", "").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 3));
        assert_eq!((date.hour(), date.minute(), date.second()), (12, 0, 5));

        let err = parse_ctime("none", "").unwrap_err();
        assert_eq!(err.code(), ErrorCode::PARSE_INVALID_DATE);
    }

    /// UTC until 2024-03-10 02:00, one hour ahead from then on.
    #[derive(Debug, Clone, Copy)]
    struct SpringForward;

    impl SpringForward {
        fn jump() -> NaiveDateTime {
            NaiveDateTime::parse_from_str("2024-03-10 02:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
        }

        fn offset_at_utc(utc: &NaiveDateTime) -> chrono::FixedOffset {
            let hours = if *utc < Self::jump() { 0 } else { 1 };
            chrono::FixedOffset::east_opt(hours * 3600).unwrap()
        }
    }

    impl TimeZone for SpringForward {
        type Offset = chrono::FixedOffset;

        fn from_offset(_: &chrono::FixedOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(
            &self,
            local: &chrono::NaiveDate,
        ) -> chrono::LocalResult<chrono::FixedOffset> {
            self.offset_from_local_datetime(&local.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_local_datetime(
            &self,
            local: &NaiveDateTime,
        ) -> chrono::LocalResult<chrono::FixedOffset> {
            let gap_end = Self::jump() + chrono::Duration::hours(1);
            if *local < Self::jump() {
                chrono::LocalResult::Single(Self::offset_at_utc(local))
            } else if *local < gap_end {
                chrono::LocalResult::None
            } else {
                chrono::LocalResult::Single(Self::offset_at_utc(&gap_end))
            }
        }

        fn offset_from_utc_date(&self, utc: &chrono::NaiveDate) -> chrono::FixedOffset {
            Self::offset_at_utc(&utc.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> chrono::FixedOffset {
            Self::offset_at_utc(utc)
        }
    }

    fn naive(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, CTIME_FORMAT).unwrap()
    }

    #[test]
    fn test_time_skipped_by_dst_jump_moves_forward() {
        let resolved = resolve_local(&SpringForward, &naive("Sun Mar 10 02:30:00 2024")).unwrap();
        assert_eq!(resolved.naive_local(), naive("Sun Mar 10 03:30:00 2024"));
        assert_eq!(resolved.naive_utc(), naive("Sun Mar 10 02:30:00 2024"));
    }

    #[test]
    fn test_times_around_dst_jump_resolve_directly() {
        let before = resolve_local(&SpringForward, &naive("Sun Mar 10 01:59:59 2024")).unwrap();
        assert_eq!(before.naive_local(), naive("Sun Mar 10 01:59:59 2024"));

        let after = resolve_local(&SpringForward, &naive("Sun Mar 10 03:00:00 2024")).unwrap();
        assert_eq!(after.naive_utc(), naive("Sun Mar 10 02:00:00 2024"));
    }

    #[test]
    fn test_split_dated_line() {
        let (date, rest) = split_dated_line("Thu Jan 27 08:00:00 2022 dir/a   b.txt");
        assert_eq!(date, "Thu Jan 27 08:00:00 2022");
        assert_eq!(rest, "dir/a b.txt");

        let (date, rest) = split_dated_line("Thu Jan 27");
        assert_eq!(date, "Thu Jan 27");
        assert_eq!(rest, "");
    }
}
