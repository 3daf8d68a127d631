//! File listing printed by `list-current-files`.

use super::{parse_ctime, split_dated_line, weekday_lines};
use crate::error::Result;
use crate::results::FileEntry;

/// Every timestamped line becomes one entry, in output order.
pub fn parse_file_listing(stdout: &str) -> Result<Vec<FileEntry>> {
    weekday_lines(stdout)
        .map(|line| -> Result<FileEntry> {
            let (date, file_name) = split_dated_line(line);
            Ok(FileEntry {
                file_name,
                file_time: parse_ctime(&date, stdout)?,
            })
        })
        .collect()
}
