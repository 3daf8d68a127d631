//! Common test utilities and helpers
//!
//! `FakeDuplicity` writes a small shell script that behaves like the real
//! tool: it answers `--version`, records its arguments and passphrase, and
//! replays canned output per command keyword.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use duplicity_wrapper::{Duplicity, DuplicityError, EnvSource};

pub const VERSION: &str = "duplicity 2.1.4";

pub const STATS_OUTPUT: &str = "\
Local and Remote metadata are synchronized, no sync needed.
Last full backup date: none
--------------[ Backup Statistics ]--------------
StartTime 1710072000.12 (Sun Mar 10 12:00:00 2024)
EndTime 1710072001.62 (Sun Mar 10 12:00:01 2024)
ElapsedTime 1.50 (1.50 seconds)
SourceFiles 3
SourceFileSize 4096 (4.00 KB)
NewFiles 3
NewFileSize 4096 (4.00 KB)
DeletedFiles 0
ChangedFiles 0
ChangedFileSize 0 (0 bytes)
ChangedDeltaSize 0 (0 bytes)
DeltaEntries 3
RawDeltaSize 0 (0 bytes)
TotalDestinationSizeChange 1024 (1.00 KB)
Errors 0
-------------------------------------------------
";

pub const LISTING_OUTPUT: &str = "\
Local and Remote metadata are synchronized, no sync needed.
Last full backup date: Thu Jan 27 08:00:00 2022
Thu Jan 27 08:00:00 2022 .
Thu Jan 27 08:00:00 2022 file1.txt
Thu Jan 27 08:00:01 2022 a b.txt
";

pub const VERIFY_OUTPUT: &str = "\
Local and Remote metadata are synchronized, no sync needed.
Last full backup date: Thu Jan 27 08:00:00 2022
Verify complete: 3 files compared, 0 differences found.
";

/// A fake duplicity executable in a private temporary directory.
pub struct FakeDuplicity {
    dir: TempDir,
}

impl FakeDuplicity {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let state = dir.path().display().to_string();
        let script = format!(
            r#"#!/bin/sh
STATE="{state}"
if [ "$1" = "--version" ]; then
    echo "{VERSION}"
    exit 0
fi
printf '%s\n' "$@" > "$STATE/args"
printf '%s' "$PASSPHRASE" > "$STATE/passphrase"
pwd > "$STATE/cwd"
if [ -f "$STATE/$1.sleep" ]; then sleep "$(cat "$STATE/$1.sleep")"; fi
if [ -f "$STATE/$1.stdout" ]; then cat "$STATE/$1.stdout"; fi
if [ -f "$STATE/$1.stderr" ]; then cat "$STATE/$1.stderr" >&2; fi
if [ -f "$STATE/$1.rc" ]; then exit "$(cat "$STATE/$1.rc")"; fi
exit 0
"#
        );

        let path = dir.path().join("duplicity");
        fs::write(&path, script).expect("write fake duplicity");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("duplicity")
    }

    pub fn path_str(&self) -> String {
        self.path().display().to_string()
    }

    pub fn state_dir(&self) -> &Path {
        self.dir.path()
    }

    fn set(&self, keyword: &str, suffix: &str, content: &str) {
        fs::write(self.dir.path().join(format!("{keyword}.{suffix}")), content)
            .expect("write fixture");
    }

    pub fn stdout(self, keyword: &str, content: &str) -> Self {
        self.set(keyword, "stdout", content);
        self
    }

    pub fn stderr(self, keyword: &str, content: &str) -> Self {
        self.set(keyword, "stderr", content);
        self
    }

    pub fn exit_code(self, keyword: &str, rc: i32) -> Self {
        self.set(keyword, "rc", &rc.to_string());
        self
    }

    pub fn sleeps(self, keyword: &str, seconds: u64) -> Self {
        self.set(keyword, "sleep", &seconds.to_string());
        self
    }

    /// Arguments of the last non-version invocation, if any.
    pub fn recorded_args(&self) -> Option<Vec<String>> {
        fs::read_to_string(self.dir.path().join("args"))
            .ok()
            .map(|text| text.lines().map(str::to_string).collect())
    }

    pub fn recorded_passphrase(&self) -> Option<String> {
        fs::read_to_string(self.dir.path().join("passphrase")).ok()
    }

    pub fn recorded_cwd(&self) -> Option<PathBuf> {
        fs::read_to_string(self.dir.path().join("cwd"))
            .ok()
            .map(|text| PathBuf::from(text.trim_end()))
    }

    /// Bind a facade to the script with a fixed environment.
    ///
    /// Freshly written scripts can briefly fail with ETXTBSY while another
    /// test thread is forking, so binding is retried a few times.
    pub async fn bind(&self, env: EnvSource) -> Duplicity {
        let mut attempts = 0;
        loop {
            let result = Duplicity::builder()
                .executable(self.path_str())
                .env(env.clone())
                .build()
                .await;
            match result {
                Ok(duplicity) => return duplicity,
                Err(DuplicityError::Spawn { .. }) if attempts < 5 => {
                    attempts += 1;
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                Err(e) => panic!("failed to bind fake duplicity: {e}"),
            }
        }
    }
}
