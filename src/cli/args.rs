//! CLI argument structures

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use humantime_serde::re::humantime;
use std::path::PathBuf;
use std::time::Duration;

use crate::options::{CommonOptions, Cutoff, ExtraArgs, Verbosity};
use crate::timespan::TimeSpan;

/// Run duplicity backups and print the parsed results as JSON
#[derive(Parser)]
#[command(name = "dupwrap")]
#[command(about = "dupwrap - typed wrapper around the duplicity backup tool", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path of the duplicity executable (overrides configuration)
    #[arg(long, global = true)]
    pub executable: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every backup command. The passphrase is read from the
/// `PASSPHRASE` environment variable.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Backup location, e.g. file:///mnt/backup or sftp://host/path
    pub url: String,

    /// Backup name passed as --name
    #[arg(long)]
    pub name: Option<String>,

    /// Pass --dryrun to duplicity
    #[arg(long)]
    pub dry_run: bool,

    /// Archive directory passed as --archive-dir
    #[arg(long)]
    pub archive_dir: Option<PathBuf>,

    /// Duplicity verbosity (number or level name)
    #[arg(long)]
    pub verbosity: Option<String>,

    /// Kill duplicity after this long, e.g. "90s" or "2h"
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Extra arguments passed to duplicity as-is
    #[arg(last = true)]
    pub extra: Vec<String>,
}

impl CommonArgs {
    pub fn to_options(&self) -> CommonOptions {
        CommonOptions {
            url: self.url.clone(),
            passphrase: None,
            verbosity: self.verbosity.as_deref().map(Verbosity::from),
            archive_dir: self.archive_dir.clone(),
            name: self.name.clone(),
            dry_run: self.dry_run,
            extra_args: (!self.extra.is_empty()).then(|| ExtraArgs::List(self.extra.clone())),
            timeout: self.timeout,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the version reported by duplicity
    Version,

    /// Run a full backup
    Full {
        /// Directory to back up
        #[arg(long)]
        target: String,

        /// Working directory for duplicity
        #[arg(long, default_value = ".")]
        cwd: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Run an incremental backup
    #[command(alias = "incremental")]
    Incr {
        #[arg(long)]
        target: String,

        #[arg(long, default_value = ".")]
        cwd: PathBuf,

        /// Force a full backup when the last one is older than this
        /// (RFC 3339 date or span such as "2W")
        #[arg(long, value_parser = parse_cutoff)]
        full_if_older_than: Option<Cutoff>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Compare a backup with the local files
    Verify {
        #[arg(long)]
        target: String,

        #[arg(long, default_value = ".")]
        cwd: PathBuf,

        /// Verify the backup as of this time
        #[arg(long, value_parser = parse_cutoff)]
        time: Option<Cutoff>,

        /// Compare file contents, not just metadata
        #[arg(long)]
        compare_data: bool,

        /// Only verify this path
        #[arg(long)]
        file_to_restore: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// List the files in the latest (or a past) backup
    #[command(name = "list")]
    ListCurrentFiles {
        #[arg(long, value_parser = parse_cutoff)]
        time: Option<Cutoff>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Delete backup chains older than a given time
    RemoveOlderThan {
        /// RFC 3339 date or span such as "6M"
        #[arg(value_parser = parse_cutoff)]
        time: Cutoff,

        /// Actually delete instead of listing
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Keep only the newest N full backup chains
    RemoveAllButNFull {
        count: u32,

        #[arg(long)]
        force: bool,

        #[command(flatten)]
        common: CommonArgs,
    },
}

/// An RFC 3339 instant, or a compact span counted back from now.
pub fn parse_cutoff(value: &str) -> Result<Cutoff, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(Cutoff::At(instant.with_timezone(&Utc)));
    }
    value
        .parse::<TimeSpan>()
        .map(Cutoff::Ago)
        .map_err(|e| format!("expected RFC 3339 date or time span: {e}"))
}

pub fn parse_timeout(value: &str) -> Result<Duration, String> {
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(value).map_err(|e| e.to_string())
}
