/// Error code registry for duplicity-wrapper
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 4000-4999: Execution errors
/// - 8000-8999: Output parse errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_PARSE_ERROR: u16 = 1002;
    pub const CONFIG_MISSING_PASSPHRASE: u16 = 1003;
    pub const CONFIG_INVALID_CUTOFF: u16 = 1004;
    pub const CONFIG_INVALID_TIMESPAN: u16 = 1005;

    // Execution errors (4000-4999)
    pub const EXEC_GENERIC: u16 = 4000;
    pub const EXEC_COMMAND_NOT_FOUND: u16 = 4001;
    pub const EXEC_TIMEOUT: u16 = 4002;
    pub const EXEC_SUBPROCESS_FAILED: u16 = 4003;
    pub const EXEC_SIGNAL_RECEIVED: u16 = 4005;
    pub const EXEC_SPAWN_FAILED: u16 = 4007;
    pub const EXEC_OUTPUT_ERROR: u16 = 4008;
    pub const EXEC_ENVIRONMENT_ERROR: u16 = 4010;

    // Output parse errors (8000-8999)
    pub const PARSE_GENERIC: u16 = 8000;
    pub const PARSE_MISSING_LABEL: u16 = 8001;
    pub const PARSE_MISSING_SUMMARY: u16 = 8002;
    pub const PARSE_INVALID_DATE: u16 = 8003;
    pub const PARSE_INVALID_NUMBER: u16 = 8004;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
    pub const OTHER_NOT_IMPLEMENTED: u16 = 9002;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        // Configuration errors
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Failed to parse configuration",
        1003 => "No passphrase supplied and PASSPHRASE is not set",
        1004 => "Cutoff time is not in the past",
        1005 => "Invalid time span",

        // Execution errors
        4000 => "Generic execution error",
        4001 => "Command not found",
        4002 => "Command execution timeout",
        4003 => "Subprocess failed",
        4005 => "Command received signal",
        4007 => "Failed to spawn subprocess",
        4008 => "Command output error",
        4010 => "Command environment error",

        // Parse errors
        8000 => "Generic output parse error",
        8001 => "Expected statistics label missing from output",
        8002 => "Expected summary line missing from output",
        8003 => "Unparseable date in output",
        8004 => "Unparseable number in output",

        // Other errors
        9000 => "Generic error",
        9002 => "Operation not implemented",

        _ => "Unknown error code",
    }
}
