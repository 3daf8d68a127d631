//! Typed records returned by the facade.
//!
//! Every record carries the exit code, the command keyword and the raw
//! console output next to the parsed values.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::subprocess::ProcessOutput;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsoleOutput {
    pub stdout: String,
    pub stderr: String,
}

impl From<ProcessOutput> for ConsoleOutput {
    fn from(output: ProcessOutput) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// The statistics block printed at the end of a backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackupStatistics {
    /// Seconds.
    pub elapsed_time: f64,
    pub source_files: u64,
    pub source_file_size: u64,
    pub new_files: u64,
    pub new_file_size: u64,
    pub deleted_files: u64,
    pub changed_files: u64,
    pub changed_file_size: u64,
    pub delta_entries: u64,
    /// Bytes; negative when the destination shrank.
    pub total_destination_size_change: i64,
    pub errors: u64,
    /// True for `full`, and for `incr` when duplicity promoted it to a full
    /// backup.
    pub full_backup: bool,
}

/// Result of `full` and `incr`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupResults {
    pub rc: i32,
    pub command: String,
    #[serde(flatten)]
    pub statistics: BackupStatistics,
    pub output: ConsoleOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyResults {
    pub rc: i32,
    pub command: String,
    pub files_compared: u64,
    pub differences_found: u64,
    pub last_full_backup_date: DateTime<Local>,
    pub output: ConsoleOutput,
}

/// One line of `list-current-files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub file_name: String,
    pub file_time: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListCurrentFilesResults {
    pub rc: i32,
    pub command: String,
    pub entries: Vec<FileEntry>,
    pub output: ConsoleOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveOlderThanResults {
    pub rc: i32,
    pub command: String,
    /// Duplicity declined to delete anything without `--force`.
    pub require_force: bool,
    pub entries: Vec<DateTime<Local>>,
    pub output: ConsoleOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveAllButNFullResults {
    pub rc: i32,
    pub command: String,
    pub require_force: bool,
    pub output: ConsoleOutput,
}
