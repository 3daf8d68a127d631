//! Summary printed by `verify`.

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;

use super::parse_ctime;
use crate::error::{DuplicityError, ErrorCode, Result};

static VERIFY_COMPLETE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Verify complete: (\d+) files compared, (\d+) ").expect("valid regex")
});

static LAST_FULL_BACKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)Last full backup date: (.*)$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifySummary {
    pub files_compared: u64,
    pub differences_found: u64,
    pub last_full_backup_date: DateTime<Local>,
}

pub fn parse_verify(stdout: &str) -> Result<VerifySummary> {
    let missing = |what: &str| {
        DuplicityError::parse(
            ErrorCode::PARSE_MISSING_SUMMARY,
            format!("Unable to parse verify output: missing {}", what),
            stdout,
        )
    };

    let counts = VERIFY_COMPLETE
        .captures(stdout)
        .ok_or_else(|| missing("'Verify complete' summary"))?;
    let backup = LAST_FULL_BACKUP
        .captures(stdout)
        .ok_or_else(|| missing("'Last full backup date'"))?;

    let number = |value: &str| {
        value.parse::<u64>().map_err(|_| {
            DuplicityError::parse(
                ErrorCode::PARSE_INVALID_NUMBER,
                format!("invalid count '{}' in verify summary", value),
                stdout,
            )
        })
    };

    Ok(VerifySummary {
        files_compared: number(&counts[1])?,
        differences_found: number(&counts[2])?,
        last_full_backup_date: parse_ctime(&backup[1], stdout)?,
    })
}
