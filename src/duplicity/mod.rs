//! Command facade bound to one duplicity executable.

mod operation;

pub use operation::Operation;

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::args::BuildContext;
use crate::error::{DuplicityError, Result};
use crate::options::{
    FullOptions, IncrOptions, ListCurrentFilesOptions, RemoveAllButNFullOptions,
    RemoveOlderThanOptions, VerifyOptions,
};
use crate::parser;
use crate::results::{
    BackupResults, ListCurrentFilesResults, RemoveAllButNFullResults, RemoveOlderThanResults,
    VerifyResults,
};
use crate::subprocess::{EventSink, ProcessCommand, ProcessRunner, TokioProcessRunner};

pub const DEFAULT_EXECUTABLE: &str = "/usr/bin/duplicity";

/// Where the child environment comes from.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// Snapshot of the current process environment, taken per call.
    #[default]
    Process,
    /// A fixed set of variables.
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    pub fn snapshot(&self) -> HashMap<String, String> {
        match self {
            EnvSource::Process => std::env::vars().collect(),
            EnvSource::Fixed(vars) => vars.clone(),
        }
    }
}

/// Handle on an installed duplicity.
///
/// Construction runs `<executable> --version` once; after that the handle
/// is immutable and can be shared freely between tasks.
#[derive(Clone)]
pub struct Duplicity {
    executable: String,
    version: String,
    runner: Arc<dyn ProcessRunner>,
    env: EnvSource,
}

impl std::fmt::Debug for Duplicity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Duplicity")
            .field("executable", &self.executable)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

pub struct DuplicityBuilder {
    executable: String,
    runner: Arc<dyn ProcessRunner>,
    env: EnvSource,
}

impl Default for DuplicityBuilder {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            runner: Arc::new(TokioProcessRunner),
            env: EnvSource::Process,
        }
    }
}

impl DuplicityBuilder {
    pub fn executable(mut self, path: impl Into<String>) -> Self {
        self.executable = path.into();
        self
    }

    pub fn runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn env(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    /// Query the version and return the bound handle.
    pub async fn build(self) -> Result<Duplicity> {
        let command =
            ProcessCommand::new(&self.executable, ["--version"]).with_env(self.env.snapshot());

        let output = self.runner.run(command, None).await?;
        parser::ensure_success(&output, "--version")?;
        let version = output.stdout.trim_end().to_string();
        debug!("Bound {} ({})", self.executable, version);

        Ok(Duplicity {
            executable: self.executable,
            version,
            runner: self.runner,
            env: self.env,
        })
    }
}

impl Duplicity {
    /// Bind to the executable at `path`, or the default location.
    pub async fn new(path: Option<&str>) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(path) = path {
            builder = builder.executable(path);
        }
        builder.build().await
    }

    pub fn builder() -> DuplicityBuilder {
        DuplicityBuilder::default()
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Trimmed output of `--version`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Run one operation end to end.
    ///
    /// Request errors surface before anything is spawned; a non-zero exit
    /// is reported before the output is parsed.
    pub async fn execute<O: Operation>(
        &self,
        op: &O,
        events: Option<&EventSink>,
    ) -> Result<O::Output> {
        let keyword = O::KIND.keyword();
        let ctx = BuildContext::new(Utc::now(), self.env.snapshot());
        let invocation = op.build(&ctx)?;
        let command = invocation.into_command(&self.executable);
        debug!("Running duplicity {}", keyword);

        let output = match self.runner.run(command, events).await {
            Ok(output) => output,
            Err(err) => {
                let err = DuplicityError::from(err);
                if matches!(err, DuplicityError::Timeout { .. }) {
                    warn!("duplicity {} timed out", keyword);
                }
                return Err(err);
            }
        };

        parser::ensure_success(&output, keyword)?;
        let result = op.parse(output)?;
        info!("duplicity {} completed", keyword);
        Ok(result)
    }

    pub async fn full(&self, opts: &FullOptions) -> Result<BackupResults> {
        self.execute(opts, None).await
    }

    pub async fn incremental(&self, opts: &IncrOptions) -> Result<BackupResults> {
        self.execute(opts, None).await
    }

    /// Alias of [`incremental`](Self::incremental).
    pub async fn incr(&self, opts: &IncrOptions) -> Result<BackupResults> {
        self.incremental(opts).await
    }

    pub async fn verify(&self, opts: &VerifyOptions) -> Result<VerifyResults> {
        self.execute(opts, None).await
    }

    pub async fn list_current_files(
        &self,
        opts: &ListCurrentFilesOptions,
    ) -> Result<ListCurrentFilesResults> {
        self.execute(opts, None).await
    }

    pub async fn remove_older_than(
        &self,
        opts: &RemoveOlderThanOptions,
    ) -> Result<RemoveOlderThanResults> {
        self.execute(opts, None).await
    }

    pub async fn remove_all_but_n_full(
        &self,
        opts: &RemoveAllButNFullOptions,
    ) -> Result<RemoveAllButNFullResults> {
        self.execute(opts, None).await
    }

    pub async fn collection_status(&self) -> Result<()> {
        Err(DuplicityError::unsupported("collection-status"))
    }

    pub async fn restore(&self) -> Result<()> {
        Err(DuplicityError::unsupported("restore"))
    }

    pub async fn remove_all_inc_of_but_n_full(&self) -> Result<()> {
        Err(DuplicityError::unsupported("remove-all-inc-of-but-n-full"))
    }

    pub async fn cleanup(&self) -> Result<()> {
        Err(DuplicityError::unsupported("cleanup"))
    }

    pub async fn replicate(&self) -> Result<()> {
        Err(DuplicityError::unsupported("replicate"))
    }
}
