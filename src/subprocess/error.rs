use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command {command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("IO error while running '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error("Mock expectation not met: {0}")]
    MockExpectationNotMet(String),
}
