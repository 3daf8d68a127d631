use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

use super::error::ProcessError;
use super::events::{self, CommandEvent, EventSink};

/// How long a timed-out process gets to exit after SIGTERM before it is
/// killed outright.
const KILL_GRACE: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl ProcessCommand {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            env: HashMap::new(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Replace the environment. The runner passes nothing else through
    /// except `PATH`.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    /// A zero timeout disables the timer.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    /// Program and arguments joined by single spaces.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

// Environment values may hold the passphrase, so only keys are shown.
impl fmt::Debug for ProcessCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.env.keys().collect();
        keys.sort();
        f.debug_struct("ProcessCommand")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env_keys", &keys)
            .field("working_dir", &self.working_dir)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Error(i32),
    Signal(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Success => Some(0),
            ExitStatus::Error(code) => Some(*code),
            ExitStatus::Signal(_) => None,
        }
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` to completion, reporting lifecycle events to `events`.
    ///
    /// Resolves once with the exit status and the full captured output, or
    /// fails if the process cannot be launched or outlives its timeout.
    async fn run(
        &self,
        command: ProcessCommand,
        events: Option<&EventSink>,
    ) -> Result<ProcessOutput, ProcessError>;
}

/// Exit status plus the fully drained output streams.
type Settled = (std::process::ExitStatus, String, String);

pub struct TokioProcessRunner;

impl TokioProcessRunner {
    /// Log command execution details
    fn log_command_start(command: &ProcessCommand) {
        tracing::debug!("Executing subprocess: {}", command.command_line());
        tracing::trace!(
            "Environment variables count: {}, working directory: {:?}, timeout: {:?}",
            command.env.len(),
            command.working_dir,
            command.timeout
        );
    }

    /// Configure the command with environment, working directory and pipes
    fn configure_command(command: &ProcessCommand) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&command.program);

        // Own process group so a timeout can signal the whole tree
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        cmd.args(&command.args);

        // The caller supplies the complete environment snapshot
        cmd.env_clear();
        if !command.env.contains_key("PATH") {
            match std::env::var("PATH") {
                Ok(path) => {
                    cmd.env("PATH", path);
                }
                Err(_) => tracing::debug!(
                    "No PATH in environment snapshot or parent process for '{}'",
                    command.program
                ),
            }
        }
        cmd.envs(&command.env);

        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        cmd
    }

    /// Map spawn error to ProcessError
    fn map_spawn_error(error: std::io::Error, command: &ProcessCommand) -> ProcessError {
        tracing::error!(
            "Failed to spawn '{}': {:?} (kind: {:?})",
            command.program,
            error,
            error.kind()
        );

        if error.kind() == std::io::ErrorKind::NotFound {
            ProcessError::CommandNotFound(command.program.clone())
        } else {
            ProcessError::SpawnFailed {
                command: command.command_line(),
                source: error,
            }
        }
    }

    /// Extract a stream from a child process, converting None to error
    fn extract_stream<T>(stream: Option<T>, stream_name: &str) -> Result<T, ProcessError> {
        stream.ok_or_else(|| ProcessError::InternalError {
            message: format!("Failed to capture {}", stream_name),
        })
    }

    /// Read a pipe to EOF on its own task so neither stream can block the other
    fn spawn_drain<R>(reader: R) -> JoinHandle<std::io::Result<String>>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        tokio::spawn(async move {
            let mut reader = reader;
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await?;
            Ok(String::from_utf8_lossy(&buf).into_owned())
        })
    }

    async fn collect_drain(
        handle: &mut JoinHandle<std::io::Result<String>>,
        command_line: &str,
    ) -> Result<String, ProcessError> {
        match handle.await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(source)) => Err(ProcessError::Io {
                command: command_line.to_string(),
                source,
            }),
            Err(join_error) => Err(ProcessError::InternalError {
                message: format!("output reader for '{}' failed: {}", command_line, join_error),
            }),
        }
    }

    /// A call is settled once the child has exited and both pipes hit EOF.
    /// Descendants that inherited a pipe keep the call open.
    async fn settle(
        child: &mut tokio::process::Child,
        stdout: &mut JoinHandle<std::io::Result<String>>,
        stderr: &mut JoinHandle<std::io::Result<String>>,
        command_line: &str,
    ) -> Result<Settled, ProcessError> {
        let status = child.wait().await.map_err(|source| ProcessError::Io {
            command: command_line.to_string(),
            source,
        })?;
        let stdout = Self::collect_drain(stdout, command_line).await?;
        let stderr = Self::collect_drain(stderr, command_line).await?;
        Ok((status, stdout, stderr))
    }

    /// Send SIGTERM to the whole process group and leave a detached task to
    /// reap the child, escalating to a kill if it ignores the signal.
    ///
    /// `pgid` is captured at spawn time; once the child is reaped `id()`
    /// returns `None` but its group may still hold pipe-bearing descendants.
    fn terminate(mut child: tokio::process::Child, pgid: Option<u32>, command_line: &str) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            if let Some(pgid) = pgid {
                if let Err(e) = killpg(Pid::from_raw(pgid as i32), Signal::SIGTERM) {
                    tracing::warn!("Failed to send SIGTERM to '{}': {}", command_line, e);
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = pgid;
            if let Err(e) = child.start_kill() {
                tracing::warn!("Failed to kill '{}': {}", command_line, e);
            }
        }

        let command_line = command_line.to_string();
        tokio::spawn(async move {
            if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
                tracing::warn!(
                    "Process '{}' ignored SIGTERM for {:?}; killing",
                    command_line,
                    KILL_GRACE
                );
                let _ = child.kill().await;
            }
            // Stragglers left in the group after the leader is gone.
            #[cfg(unix)]
            {
                use nix::sys::signal::{killpg, Signal};
                use nix::unistd::Pid;

                if let Some(pgid) = pgid {
                    let _ = killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL);
                }
            }
        });
    }

    /// Convert process exit status to our ExitStatus enum
    fn parse_exit_status(status: std::process::ExitStatus) -> ExitStatus {
        if status.success() {
            ExitStatus::Success
        } else if let Some(code) = status.code() {
            ExitStatus::Error(code)
        } else {
            Self::parse_signal_status(status)
        }
    }

    /// Parse signal status on Unix systems
    #[cfg(unix)]
    fn parse_signal_status(status: std::process::ExitStatus) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            ExitStatus::Signal(signal)
        } else {
            ExitStatus::Error(1)
        }
    }

    #[cfg(not(unix))]
    fn parse_signal_status(_status: std::process::ExitStatus) -> ExitStatus {
        ExitStatus::Error(1)
    }

    /// Log the process execution result
    fn log_result(result: &ProcessOutput, command_line: &str) {
        match &result.status {
            ExitStatus::Success => {
                tracing::debug!(
                    "Subprocess completed successfully in {:?}: {}",
                    result.duration,
                    command_line
                );
            }
            ExitStatus::Error(code) => {
                tracing::debug!(
                    "Subprocess failed with exit code {} in {:?}: {}",
                    code,
                    result.duration,
                    command_line
                );
            }
            ExitStatus::Signal(signal) => {
                tracing::warn!(
                    "Subprocess terminated by signal {} in {:?}: {}",
                    signal,
                    result.duration,
                    command_line
                );
            }
        }
        tracing::trace!("Stdout length: {} bytes", result.stdout.len());
        tracing::trace!("Stderr length: {} bytes", result.stderr.len());
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        command: ProcessCommand,
        events: Option<&EventSink>,
    ) -> Result<ProcessOutput, ProcessError> {
        let start = Instant::now();
        let command_line = command.command_line();

        Self::log_command_start(&command);
        events::emit(events, CommandEvent::Command(command_line.clone()));

        let mut child = Self::configure_command(&command)
            .spawn()
            .map_err(|e| Self::map_spawn_error(e, &command))?;

        let pgid = child.id();
        let mut stdout = Self::spawn_drain(Self::extract_stream(child.stdout.take(), "stdout")?);
        let mut stderr = Self::spawn_drain(Self::extract_stream(child.stderr.take(), "stderr")?);

        let settled = Self::settle(&mut child, &mut stdout, &mut stderr, &command_line);
        let (status, stdout, stderr) = match command.timeout {
            None => settled.await?,
            Some(timeout) => match tokio::time::timeout(timeout, settled).await.ok() {
                Some(result) => result?,
                None => {
                    tracing::warn!(
                        "Subprocess timed out after {:?}: {}",
                        timeout,
                        command_line
                    );
                    // Late output is discarded; the call settles as a timeout.
                    stdout.abort();
                    stderr.abort();
                    Self::terminate(child, pgid, &command_line);
                    events::emit(events, CommandEvent::Closed);
                    return Err(ProcessError::Timeout {
                        command: command_line,
                        timeout,
                    });
                }
            },
        };

        let result = ProcessOutput {
            status: Self::parse_exit_status(status),
            stdout,
            stderr,
            duration: start.elapsed(),
        };

        Self::log_result(&result, &command_line);

        events::emit(events, CommandEvent::Stdout(result.stdout.clone()));
        events::emit(events, CommandEvent::Stderr(result.stderr.clone()));
        events::emit(events, CommandEvent::Closed);

        Ok(result)
    }
}
