/// Error code registry for claudo
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Prompt resolution errors
/// - 3000-3999: Output destination errors
/// - 4000-4999: Execution errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_TOML: u16 = 1002;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;

    // Prompt errors (2000-2999)
    pub const PROMPT_GENERIC: u16 = 2000;
    pub const PROMPT_NOT_FOUND: u16 = 2001;
    pub const PROMPT_UNREADABLE: u16 = 2002;
    pub const PROMPT_UNKNOWN_ROLE: u16 = 2003;

    // Output errors (3000-3999)
    pub const OUTPUT_GENERIC: u16 = 3000;
    pub const OUTPUT_PATH_UNRESOLVABLE: u16 = 3001;
    pub const OUTPUT_OPEN_FAILED: u16 = 3002;

    // Execution errors (4000-4999)
    pub const EXEC_GENERIC: u16 = 4000;
    pub const EXEC_COMMAND_NOT_FOUND: u16 = 4001;
    pub const EXEC_TIMEOUT: u16 = 4002;
    pub const EXEC_SUBPROCESS_FAILED: u16 = 4003;
    pub const EXEC_SIGNAL_RECEIVED: u16 = 4005;
    pub const EXEC_SPAWN_FAILED: u16 = 4007;
    pub const EXEC_OUTPUT_ERROR: u16 = 4008;
    pub const EXEC_CONTAINER_NOT_FOUND: u16 = 4011;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Invalid TOML syntax in configuration",
        1005 => "Invalid value in configuration",

        2000 => "Generic prompt error",
        2001 => "Prompt file not found",
        2002 => "Prompt file could not be read",
        2003 => "Unknown agent role",

        3000 => "Generic output error",
        3001 => "Output destination path cannot be resolved",
        3002 => "Output destination could not be opened",

        4000 => "Generic execution error",
        4001 => "Command not found",
        4002 => "Command execution timeout",
        4003 => "Subprocess failed",
        4005 => "Command received signal",
        4007 => "Failed to spawn subprocess",
        4008 => "Command output error",
        4011 => "Container not found",

        9000 => "Generic error",
        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_known_codes() {
        assert_eq!(
            describe_error_code(ErrorCode::PROMPT_NOT_FOUND),
            "Prompt file not found"
        );
        assert_eq!(
            describe_error_code(ErrorCode::OUTPUT_OPEN_FAILED),
            "Output destination could not be opened"
        );
    }

    #[test]
    fn test_describe_unknown_code() {
        assert_eq!(describe_error_code(1234), "Unknown error code");
    }
}
