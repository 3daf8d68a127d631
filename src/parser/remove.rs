//! Output of the `remove-*` commands.

use chrono::{DateTime, Local};

use super::{parse_ctime, split_dated_line, weekday_lines, NO_OLD_BACKUP_SETS, RERUN_WITH_FORCE};
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalSummary {
    pub require_force: bool,
    pub entries: Vec<DateTime<Local>>,
}

/// Backup set dates are only collected when duplicity reports that no old
/// sets were found.
pub fn parse_remove_older_than(stdout: &str) -> Result<RemovalSummary> {
    let mut summary = RemovalSummary {
        require_force: RERUN_WITH_FORCE.present(stdout),
        entries: Vec::new(),
    };

    if NO_OLD_BACKUP_SETS.present(stdout) {
        for line in weekday_lines(stdout) {
            let (date, _) = split_dated_line(line);
            summary.entries.push(parse_ctime(&date, stdout)?);
        }
    }

    Ok(summary)
}

pub fn parse_remove_all_but_n_full(stdout: &str) -> bool {
    RERUN_WITH_FORCE.present(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_require_force() {
        let output = "Found old backup chains at the following times:\n\
                      Rerun command with --force option to actually delete.\n";
        let summary = parse_remove_older_than(output).unwrap();
        assert!(summary.require_force);
        assert!(summary.entries.is_empty());
        assert!(parse_remove_all_but_n_full(output));
    }

    #[test]
    fn test_entries_collected_only_with_no_old_sets_marker() {
        let dates = "Thu Jan 27 08:00:00 2022\nFri Jan 28 09:30:00 2022\n";
        let summary = parse_remove_older_than(dates).unwrap();
        assert!(summary.entries.is_empty());

        let output = format!(
            "Last full backup date: Fri Jan 28 09:30:00 2022\n{}No old backup sets found, nothing deleted.\n",
            dates
        );
        let summary = parse_remove_older_than(&output).unwrap();
        assert!(!summary.require_force);
        assert_eq!(summary.entries.len(), 2);
        assert_eq!(summary.entries[1].day(), 28);
    }

    #[test]
    fn test_remove_all_but_n_full_without_force_marker() {
        assert!(!parse_remove_all_but_n_full("Deleting backup chain at time:\n"));
    }
}
