use std::time::Duration;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

use crate::subprocess::ProcessError;
use crate::timespan::TimeSpanError;

/// Longest stdout excerpt carried by a parse error.
const EXCERPT_LIMIT: usize = 2048;

/// Every failure a duplicity call can surface.
///
/// Configuration problems are detected before any process is spawned; the
/// remaining variants describe what happened to the subprocess or to the
/// interpretation of its output.
#[derive(Error, Debug)]
pub enum DuplicityError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Failed to launch '{command}': {message}")]
    Spawn {
        code: u16,
        message: String,
        command: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Execution error: {message}")]
    Execution {
        code: u16,
        message: String,
        command: Option<String>,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("[E{code:04}] Command {command} timed out after {timeout:?} - check for input prompt")]
    Timeout {
        code: u16,
        command: String,
        timeout: Duration,
    },

    #[error("[E{code:04}] Parsing error: {message} (output: {excerpt:?})")]
    Parse {
        code: u16,
        message: String,
        excerpt: String,
    },

    #[error("[E{code:04}] Command '{operation}' is not supported")]
    Unsupported { code: u16, operation: String },
}

impl DuplicityError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create an error for a command that ran but exited non-zero.
    pub fn execution(command: impl Into<String>, exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        let code = match exit_code {
            Some(_) => ErrorCode::EXEC_SUBPROCESS_FAILED,
            None => ErrorCode::EXEC_SIGNAL_RECEIVED,
        };
        let message = match exit_code {
            Some(rc) => format!("Return code = {}: {}", rc, stderr.trim_end()),
            None => format!("Terminated by signal: {}", stderr.trim_end()),
        };

        Self::Execution {
            code,
            message,
            command: Some(command.into()),
            exit_code,
            stderr,
        }
    }

    /// Create a parse error carrying a bounded excerpt of the raw output.
    pub fn parse(code: u16, message: impl Into<String>, output: &str) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            excerpt: excerpt(output),
        }
    }

    pub fn timeout(command: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            code: ErrorCode::EXEC_TIMEOUT,
            command: command.into(),
            timeout,
        }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            code: ErrorCode::OTHER_NOT_IMPLEMENTED,
            operation: operation.into(),
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. } | Self::Spawn { source: src, .. } => {
                *src = Some(source.into());
            }
            _ => {}
        }
        self
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Spawn { code, .. }
            | Self::Execution { code, .. }
            | Self::Timeout { code, .. }
            | Self::Parse { code, .. }
            | Self::Unsupported { code, .. } => *code,
        }
    }

    /// Get the process exit code the CLI should report for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Spawn { .. } => 3,
            Self::Execution { .. } => 4,
            Self::Timeout { .. } => 5,
            Self::Parse { .. } => 6,
            Self::Unsupported { .. } => 7,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, .. } => format!("Configuration problem: {}", message),
            Self::Spawn {
                command, message, ..
            } => format!("Could not run '{}': {}", command, message),
            Self::Execution {
                command, stderr, ..
            } => {
                let command = command.as_deref().unwrap_or("duplicity");
                if stderr.trim().is_empty() {
                    format!("Command '{}' failed without output on stderr", command)
                } else {
                    format!("Command '{}' failed: {}", command, stderr.trim())
                }
            }
            Self::Timeout { command, timeout, .. } => format!(
                "Command '{}' did not finish within {:?}; it may be waiting for input",
                command, timeout
            ),
            Self::Parse { message, .. } => format!(
                "Unexpected duplicity output ({}); the installed version may not be supported",
                message
            ),
            Self::Unsupported { operation, .. } => {
                format!("'{}' is not supported by this wrapper", operation)
            }
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

/// Convert ProcessError to DuplicityError
impl From<ProcessError> for DuplicityError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::CommandNotFound(program) => Self::Spawn {
                code: ErrorCode::EXEC_COMMAND_NOT_FOUND,
                message: "executable not found".to_string(),
                command: program,
                source: None,
            },
            ProcessError::SpawnFailed { command, source } => Self::Spawn {
                code: ErrorCode::EXEC_SPAWN_FAILED,
                message: source.to_string(),
                command,
                source: Some(Box::new(source)),
            },
            ProcessError::Timeout { command, timeout } => Self::timeout(command, timeout),
            ProcessError::Io { command, source } => Self::Execution {
                code: ErrorCode::EXEC_OUTPUT_ERROR,
                message: format!("I/O error while running process: {}", source),
                command: Some(command),
                exit_code: None,
                stderr: String::new(),
            },
            other => Self::Execution {
                code: ErrorCode::EXEC_GENERIC,
                message: other.to_string(),
                command: None,
                exit_code: None,
                stderr: String::new(),
            },
        }
    }
}

impl From<TimeSpanError> for DuplicityError {
    fn from(err: TimeSpanError) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_INVALID_TIMESPAN, err.to_string()).with_source(err)
    }
}

/// Result type alias using DuplicityError
pub type Result<T> = std::result::Result<T, DuplicityError>;

fn excerpt(output: &str) -> String {
    if output.len() <= EXCERPT_LIMIT {
        return output.to_string();
    }
    let mut end = EXCERPT_LIMIT;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &output[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = DuplicityError::config_with_code(
            ErrorCode::CONFIG_MISSING_PASSPHRASE,
            "Pass phrase must be provided",
        );
        assert_eq!(
            err.to_string(),
            "[E1003] Configuration error: Pass phrase must be provided"
        );
        assert!(err.is_config());
    }

    #[test]
    fn test_execution_error_carries_stderr() {
        let err = DuplicityError::execution("duplicity full", Some(23), "boom\n");
        match &err {
            DuplicityError::Execution {
                exit_code, stderr, ..
            } => {
                assert_eq!(*exit_code, Some(23));
                assert_eq!(stderr, "boom\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("Return code = 23: boom"));
        assert_eq!(err.code(), ErrorCode::EXEC_SUBPROCESS_FAILED);
    }

    #[test]
    fn test_timeout_message_names_command() {
        let err = DuplicityError::timeout("duplicity full src file://dst", Duration::from_secs(1));
        assert!(err.to_string().contains("duplicity full src file://dst"));
        assert!(err.to_string().contains("check for input prompt"));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_parse_error_truncates_excerpt() {
        let output = "x".repeat(EXCERPT_LIMIT + 100);
        match DuplicityError::parse(ErrorCode::PARSE_GENERIC, "bad", &output) {
            DuplicityError::Parse { excerpt, .. } => {
                assert_eq!(excerpt.len(), EXCERPT_LIMIT + 3);
                assert!(excerpt.ends_with("..."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let output = "é".repeat(EXCERPT_LIMIT);
        let cut = excerpt(&output);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= EXCERPT_LIMIT + 3);
    }

    #[test]
    fn test_process_errors_are_classified() {
        let err: DuplicityError = ProcessError::CommandNotFound("/no/such/duplicity".into()).into();
        assert!(matches!(err, DuplicityError::Spawn { .. }));

        let err: DuplicityError = ProcessError::Timeout {
            command: "duplicity verify".into(),
            timeout: Duration::from_millis(50),
        }
        .into();
        assert!(matches!(err, DuplicityError::Timeout { .. }));
    }

    #[test]
    fn test_timespan_errors_are_configuration_errors() {
        let err: DuplicityError = TimeSpanError::Invalid("2X".into()).into();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_TIMESPAN);
        assert!(std::error::Error::source(&err).is_some());
    }
}
