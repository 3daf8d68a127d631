//! Backup statistics block printed by `full` and `incr`.

use super::{LabeledLine, LAST_FULL_TOO_OLD};
use crate::args::CommandKind;
use crate::error::Result;
use crate::results::BackupStatistics;

const ELAPSED_TIME: LabeledLine = LabeledLine("ElapsedTime");
const SOURCE_FILES: LabeledLine = LabeledLine("SourceFiles");
const SOURCE_FILE_SIZE: LabeledLine = LabeledLine("SourceFileSize");
const NEW_FILES: LabeledLine = LabeledLine("NewFiles");
const NEW_FILE_SIZE: LabeledLine = LabeledLine("NewFileSize");
const DELETED_FILES: LabeledLine = LabeledLine("DeletedFiles");
const CHANGED_FILES: LabeledLine = LabeledLine("ChangedFiles");
const CHANGED_FILE_SIZE: LabeledLine = LabeledLine("ChangedFileSize");
const DELTA_ENTRIES: LabeledLine = LabeledLine("DeltaEntries");
const TOTAL_DESTINATION_SIZE_CHANGE: LabeledLine = LabeledLine("TotalDestinationSizeChange");
const ERRORS: LabeledLine = LabeledLine("Errors");

pub fn parse_backup_statistics(stdout: &str, kind: CommandKind) -> Result<BackupStatistics> {
    Ok(BackupStatistics {
        elapsed_time: ELAPSED_TIME.parse(stdout)?,
        source_files: SOURCE_FILES.parse(stdout)?,
        source_file_size: SOURCE_FILE_SIZE.parse(stdout)?,
        new_files: NEW_FILES.parse(stdout)?,
        new_file_size: NEW_FILE_SIZE.parse(stdout)?,
        deleted_files: DELETED_FILES.parse(stdout)?,
        changed_files: CHANGED_FILES.parse(stdout)?,
        changed_file_size: CHANGED_FILE_SIZE.parse(stdout)?,
        delta_entries: DELTA_ENTRIES.parse(stdout)?,
        total_destination_size_change: TOTAL_DESTINATION_SIZE_CHANGE.parse(stdout)?,
        errors: ERRORS.parse(stdout)?,
        full_backup: kind == CommandKind::Full || LAST_FULL_TOO_OLD.present(stdout),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DuplicityError, ErrorCode};

    const FULL_OUTPUT: &str = "\
Local and Remote metadata are synchronized, no sync needed.
Last full backup date: none
--------------[ Backup Statistics ]--------------
StartTime 1710072000.12 (Sun Mar 10 12:00:00 2024)
EndTime 1710072000.54 (Sun Mar 10 12:00:00 2024)
ElapsedTime 0.42 (0.42 seconds)
SourceFiles 4
SourceFileSize 12345 (12.1 KB)
NewFiles 4
NewFileSize 12345 (12.1 KB)
DeletedFiles 0
ChangedFiles 0
ChangedFileSize 0 (0 bytes)
ChangedDeltaSize 0 (0 bytes)
DeltaEntries 4
RawDeltaSize 8249 (8.06 KB)
TotalDestinationSizeChange 1633 (1.59 KB)
Errors 0
-------------------------------------------------
";

    #[test]
    fn test_parse_full_statistics() {
        let stats = parse_backup_statistics(FULL_OUTPUT, CommandKind::Full).unwrap();
        assert_eq!(stats.elapsed_time, 0.42);
        assert_eq!(stats.source_files, 4);
        assert_eq!(stats.source_file_size, 12345);
        assert_eq!(stats.new_files, 4);
        assert_eq!(stats.new_file_size, 12345);
        assert_eq!(stats.changed_file_size, 0);
        assert_eq!(stats.delta_entries, 4);
        assert_eq!(stats.total_destination_size_change, 1633);
        assert_eq!(stats.errors, 0);
        assert!(stats.full_backup);
    }

    #[test]
    fn test_incr_is_full_only_when_promoted() {
        let stats = parse_backup_statistics(FULL_OUTPUT, CommandKind::Incr).unwrap();
        assert!(!stats.full_backup);

        let promoted = format!(
            "Last full backup is too old, forcing full backup\n{}",
            FULL_OUTPUT
        );
        let stats = parse_backup_statistics(&promoted, CommandKind::Incr).unwrap();
        assert!(stats.full_backup);
    }

    #[test]
    fn test_negative_size_change() {
        let output = FULL_OUTPUT.replace(
            "TotalDestinationSizeChange 1633",
            "TotalDestinationSizeChange -512",
        );
        let stats = parse_backup_statistics(&output, CommandKind::Incr).unwrap();
        assert_eq!(stats.total_destination_size_change, -512);
    }

    #[test]
    fn test_missing_errors_label_is_parse_error() {
        let output = FULL_OUTPUT.replace("Errors 0\n", "");
        let err = parse_backup_statistics(&output, CommandKind::Full).unwrap_err();
        match err {
            DuplicityError::Parse { code, message, .. } => {
                assert_eq!(code, ErrorCode::PARSE_MISSING_LABEL);
                assert!(message.contains("Errors"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_output_is_parse_error() {
        assert!(parse_backup_statistics("", CommandKind::Full).is_err());
    }
}
