//! Translation of operation requests into duplicity invocations.
//!
//! Everything here is pure: the clock and the ambient environment come in
//! through [`BuildContext`], so the same request always produces the same
//! argument vector.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DuplicityError, ErrorCode, Result};
use crate::options::{
    CommonOptions, Cutoff, FullOptions, IncrOptions, ListCurrentFilesOptions,
    RemoveAllButNFullOptions, RemoveOlderThanOptions, VerifyOptions,
};
use crate::subprocess::ProcessCommand;

/// Environment variable duplicity reads the encryption passphrase from.
pub const PASSPHRASE_VAR: &str = "PASSPHRASE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    Full,
    Incr,
    Verify,
    ListCurrentFiles,
    RemoveOlderThan,
    RemoveAllButNFull,
}

impl CommandKind {
    /// Keyword duplicity expects as its first argument.
    pub fn keyword(&self) -> &'static str {
        match self {
            CommandKind::Full => "full",
            CommandKind::Incr => "incr",
            CommandKind::Verify => "verify",
            CommandKind::ListCurrentFiles => "list-current-files",
            CommandKind::RemoveOlderThan => "remove-older-than",
            CommandKind::RemoveAllButNFull => "remove-all-but-n-full",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Inputs that are not part of the request itself.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub now: DateTime<Utc>,
    pub env: HashMap<String, String>,
}

impl BuildContext {
    pub fn new(now: DateTime<Utc>, env: HashMap<String, String>) -> Self {
        Self { now, env }
    }

    /// Current time and a snapshot of the process environment.
    pub fn current() -> Self {
        Self::new(Utc::now(), std::env::vars().collect())
    }
}

/// A fully resolved duplicity call, minus the executable path.
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    pub kind: CommandKind,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut env_keys: Vec<_> = self.env.keys().collect();
        env_keys.sort();
        f.debug_struct("Invocation")
            .field("kind", &self.kind)
            .field("args", &self.args)
            .field("env_keys", &env_keys)
            .field("working_dir", &self.working_dir)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Invocation {
    fn new(kind: CommandKind, common: &CommonOptions, ctx: &BuildContext) -> Result<Self> {
        Ok(Self {
            kind,
            args: vec![kind.keyword().to_string()],
            env: resolve_environment(common, &ctx.env)?,
            working_dir: None,
            timeout: common.timeout.filter(|t| !t.is_zero()),
        })
    }

    fn push(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    fn finish(mut self, common: &CommonOptions, positionals: &[&str]) -> Self {
        self.args.extend(common_flags(common));
        self.args.extend(extra_args(common));
        self.args.extend(positionals.iter().map(|p| p.to_string()));
        self
    }

    fn in_dir(mut self, dir: Option<&PathBuf>) -> Self {
        self.working_dir = dir.cloned();
        self
    }

    /// Bind the invocation to an executable.
    pub fn into_command(self, program: &str) -> ProcessCommand {
        ProcessCommand::new(program, self.args)
            .with_env(self.env)
            .with_working_dir(self.working_dir)
            .with_timeout(self.timeout)
    }
}

/// Resolve a cutoff against `now`. The result must lie strictly in the past.
pub fn resolve_cutoff(cutoff: &Cutoff, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let instant = match cutoff {
        Cutoff::At(instant) => *instant,
        Cutoff::Ago(span) => span.subtract_from_date(now)?,
    };

    if instant >= now {
        return Err(DuplicityError::config_with_code(
            ErrorCode::CONFIG_INVALID_CUTOFF,
            format!("Invalid date {} - must be before {}", instant.to_rfc3339(), now.to_rfc3339()),
        ));
    }
    Ok(instant)
}

/// Resolve a cutoff and render it as whole epoch seconds.
pub fn format_time(cutoff: &Cutoff, now: DateTime<Utc>) -> Result<String> {
    let instant = resolve_cutoff(cutoff, now)?;
    Ok(instant.timestamp_millis().div_euclid(1000).to_string())
}

/// `--name`, `--dryrun`, `--archive-dir`, `--verbosity`, in that order.
pub fn common_flags(common: &CommonOptions) -> Vec<String> {
    let mut flags = Vec::new();
    if let Some(name) = &common.name {
        flags.push("--name".to_string());
        flags.push(name.clone());
    }
    if common.dry_run {
        flags.push("--dryrun".to_string());
    }
    if let Some(dir) = &common.archive_dir {
        flags.push("--archive-dir".to_string());
        flags.push(dir.display().to_string());
    }
    if let Some(verbosity) = &common.verbosity {
        flags.push("--verbosity".to_string());
        flags.push(verbosity.to_string());
    }
    flags
}

pub fn extra_args(common: &CommonOptions) -> Vec<String> {
    common
        .extra_args
        .as_ref()
        .map(|extra| extra.to_args())
        .unwrap_or_default()
}

/// Child environment: the ambient snapshot plus the passphrase.
pub fn resolve_environment(
    common: &CommonOptions,
    ambient: &HashMap<String, String>,
) -> Result<HashMap<String, String>> {
    let mut env = ambient.clone();
    match common.passphrase.as_deref() {
        Some(passphrase) if !passphrase.is_empty() => {
            env.insert(PASSPHRASE_VAR.to_string(), passphrase.to_string());
        }
        _ => {
            let present = env.get(PASSPHRASE_VAR).is_some_and(|value| !value.is_empty());
            if !present {
                return Err(DuplicityError::config_with_code(
                    ErrorCode::CONFIG_MISSING_PASSPHRASE,
                    "Pass phrase must be provided",
                ));
            }
        }
    }
    Ok(env)
}

pub fn build_full(opts: &FullOptions, ctx: &BuildContext) -> Result<Invocation> {
    let invocation = Invocation::new(CommandKind::Full, &opts.common, ctx)?;
    Ok(invocation
        .finish(&opts.common, &[opts.target.as_str(), opts.common.url.as_str()])
        .in_dir(Some(&opts.cwd)))
}

pub fn build_incr(opts: &IncrOptions, ctx: &BuildContext) -> Result<Invocation> {
    let mut invocation = Invocation::new(CommandKind::Incr, &opts.common, ctx)?;
    if let Some(cutoff) = &opts.full_if_older_than {
        invocation.push("--full-if-older-than");
        invocation.push(format_time(cutoff, ctx.now)?);
    }
    Ok(invocation
        .finish(&opts.common, &[opts.target.as_str(), opts.common.url.as_str()])
        .in_dir(Some(&opts.cwd)))
}

pub fn build_verify(opts: &VerifyOptions, ctx: &BuildContext) -> Result<Invocation> {
    let mut invocation = Invocation::new(CommandKind::Verify, &opts.common, ctx)?;
    if let Some(time) = &opts.time {
        invocation.push("--time");
        invocation.push(format_time(time, ctx.now)?);
    }
    if opts.compare_data {
        invocation.push("--compare-data");
    }
    if let Some(path) = &opts.file_to_restore {
        invocation.push("--file-to-restore");
        invocation.push(path.as_str());
    }
    Ok(invocation
        .finish(&opts.common, &[opts.common.url.as_str(), opts.target.as_str()])
        .in_dir(Some(&opts.cwd)))
}

pub fn build_list_current_files(
    opts: &ListCurrentFilesOptions,
    ctx: &BuildContext,
) -> Result<Invocation> {
    let mut invocation = Invocation::new(CommandKind::ListCurrentFiles, &opts.common, ctx)?;
    if let Some(time) = &opts.time {
        invocation.push("--time");
        invocation.push(format_time(time, ctx.now)?);
    }
    Ok(invocation
        .finish(&opts.common, &[opts.common.url.as_str()])
        .in_dir(opts.cwd.as_ref()))
}

pub fn build_remove_older_than(
    opts: &RemoveOlderThanOptions,
    ctx: &BuildContext,
) -> Result<Invocation> {
    let mut invocation = Invocation::new(CommandKind::RemoveOlderThan, &opts.common, ctx)?;
    invocation.push(format_time(&opts.time, ctx.now)?);
    if opts.force {
        invocation.push("--force");
    }
    Ok(invocation
        .finish(&opts.common, &[opts.common.url.as_str()])
        .in_dir(opts.cwd.as_ref()))
}

pub fn build_remove_all_but_n_full(
    opts: &RemoveAllButNFullOptions,
    ctx: &BuildContext,
) -> Result<Invocation> {
    let mut invocation = Invocation::new(CommandKind::RemoveAllButNFull, &opts.common, ctx)?;
    invocation.push(opts.count.to_string());
    if opts.force {
        invocation.push("--force");
    }
    Ok(invocation
        .finish(&opts.common, &[opts.common.url.as_str()])
        .in_dir(opts.cwd.as_ref()))
}
