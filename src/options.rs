//! Operation requests.
//!
//! One options type per supported duplicity command. Required fields go
//! through `new`, everything else through chainable `with_*` setters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::timespan::TimeSpan;

/// Value of `--verbosity`: either a numeric level or a level word such as
/// `info`. Passed through as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Verbosity {
    Level(u8),
    Word(String),
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verbosity::Level(level) => write!(f, "{level}"),
            Verbosity::Word(word) => f.write_str(word),
        }
    }
}

impl From<u8> for Verbosity {
    fn from(level: u8) -> Self {
        Verbosity::Level(level)
    }
}

impl From<&str> for Verbosity {
    fn from(word: &str) -> Self {
        match word.parse::<u8>() {
            Ok(level) => Verbosity::Level(level),
            Err(_) => Verbosity::Word(word.to_string()),
        }
    }
}

/// Additional arguments appended verbatim before the positionals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraArgs {
    /// A single string, split on whitespace.
    Line(String),
    /// Already tokenized arguments.
    List(Vec<String>),
}

impl ExtraArgs {
    pub fn to_args(&self) -> Vec<String> {
        match self {
            ExtraArgs::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            ExtraArgs::List(list) => list.clone(),
        }
    }
}

impl From<&str> for ExtraArgs {
    fn from(line: &str) -> Self {
        ExtraArgs::Line(line.to_string())
    }
}

impl From<Vec<String>> for ExtraArgs {
    fn from(list: Vec<String>) -> Self {
        ExtraArgs::List(list)
    }
}

/// A point in time, absolute or relative to the moment the command is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    At(DateTime<Utc>),
    Ago(TimeSpan),
}

impl From<DateTime<Utc>> for Cutoff {
    fn from(instant: DateTime<Utc>) -> Self {
        Cutoff::At(instant)
    }
}

impl From<TimeSpan> for Cutoff {
    fn from(span: TimeSpan) -> Self {
        Cutoff::Ago(span)
    }
}

/// Settings shared by every command.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CommonOptions {
    pub url: String,
    /// When absent, `PASSPHRASE` must already be set in the environment.
    pub passphrase: Option<String>,
    pub verbosity: Option<Verbosity>,
    pub archive_dir: Option<PathBuf>,
    pub name: Option<String>,
    pub dry_run: bool,
    pub extra_args: Option<ExtraArgs>,
    /// `None` or zero disables the timer.
    pub timeout: Option<Duration>,
}

impl fmt::Debug for CommonOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommonOptions")
            .field("url", &self.url)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("verbosity", &self.verbosity)
            .field("archive_dir", &self.archive_dir)
            .field("name", &self.name)
            .field("dry_run", &self.dry_run)
            .field("extra_args", &self.extra_args)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CommonOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Setters shared by every options type through its `common` field.
macro_rules! common_setters {
    ($ty:ty) => {
        impl $ty {
            pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
                self.common.passphrase = Some(passphrase.into());
                self
            }

            pub fn with_verbosity(mut self, verbosity: impl Into<Verbosity>) -> Self {
                self.common.verbosity = Some(verbosity.into());
                self
            }

            pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
                self.common.archive_dir = Some(dir.into());
                self
            }

            pub fn with_name(mut self, name: impl Into<String>) -> Self {
                self.common.name = Some(name.into());
                self
            }

            pub fn with_dry_run(mut self, dry_run: bool) -> Self {
                self.common.dry_run = dry_run;
                self
            }

            pub fn with_extra_args(mut self, extra: impl Into<ExtraArgs>) -> Self {
                self.common.extra_args = Some(extra.into());
                self
            }

            pub fn with_timeout(mut self, timeout: Duration) -> Self {
                self.common.timeout = Some(timeout);
                self
            }

            pub fn common(&self) -> &CommonOptions {
                &self.common
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullOptions {
    pub common: CommonOptions,
    pub cwd: PathBuf,
    pub target: String,
}

impl FullOptions {
    pub fn new(url: impl Into<String>, cwd: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            common: CommonOptions::new(url),
            cwd: cwd.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrOptions {
    pub common: CommonOptions,
    pub cwd: PathBuf,
    pub target: String,
    pub full_if_older_than: Option<Cutoff>,
}

impl IncrOptions {
    pub fn new(url: impl Into<String>, cwd: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            common: CommonOptions::new(url),
            cwd: cwd.into(),
            target: target.into(),
            full_if_older_than: None,
        }
    }

    pub fn with_full_if_older_than(mut self, cutoff: impl Into<Cutoff>) -> Self {
        self.full_if_older_than = Some(cutoff.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    pub common: CommonOptions,
    pub cwd: PathBuf,
    pub target: String,
    pub time: Option<Cutoff>,
    pub compare_data: bool,
    /// Restrict verification to one path inside the backup.
    pub file_to_restore: Option<String>,
}

impl VerifyOptions {
    pub fn new(url: impl Into<String>, cwd: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            common: CommonOptions::new(url),
            cwd: cwd.into(),
            target: target.into(),
            time: None,
            compare_data: false,
            file_to_restore: None,
        }
    }

    pub fn with_time(mut self, time: impl Into<Cutoff>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn with_compare_data(mut self, compare_data: bool) -> Self {
        self.compare_data = compare_data;
        self
    }

    pub fn with_file_to_restore(mut self, path: impl Into<String>) -> Self {
        self.file_to_restore = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCurrentFilesOptions {
    pub common: CommonOptions,
    pub cwd: Option<PathBuf>,
    pub time: Option<Cutoff>,
}

impl ListCurrentFilesOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            common: CommonOptions::new(url),
            cwd: None,
            time: None,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_time(mut self, time: impl Into<Cutoff>) -> Self {
        self.time = Some(time.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOlderThanOptions {
    pub common: CommonOptions,
    pub cwd: Option<PathBuf>,
    pub time: Cutoff,
    pub force: bool,
}

impl RemoveOlderThanOptions {
    pub fn new(url: impl Into<String>, time: impl Into<Cutoff>) -> Self {
        Self {
            common: CommonOptions::new(url),
            cwd: None,
            time: time.into(),
            force: false,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveAllButNFullOptions {
    pub common: CommonOptions,
    pub cwd: Option<PathBuf>,
    pub count: u32,
    pub force: bool,
}

impl RemoveAllButNFullOptions {
    pub fn new(url: impl Into<String>, count: u32) -> Self {
        Self {
            common: CommonOptions::new(url),
            cwd: None,
            count,
            force: false,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

common_setters!(FullOptions);
common_setters!(IncrOptions);
common_setters!(VerifyOptions);
common_setters!(ListCurrentFilesOptions);
common_setters!(RemoveOlderThanOptions);
common_setters!(RemoveAllButNFullOptions);
