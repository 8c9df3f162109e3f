use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// The unified error type for claudo
#[derive(Error, Debug)]
pub enum ClaudoError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Prompt error: {message}")]
    Prompt {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Output error: {message}")]
    Output {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Execution error: {message}")]
    Execution {
        code: u16,
        message: String,
        command: Option<String>,
        exit_code: Option<i32>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] {message}")]
    Other {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ClaudoError {
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

    /// Create a prompt error with specific code and path
    pub fn prompt_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Prompt {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create a prompt-not-found error for the given path
    pub fn prompt_not_found(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::prompt_with_code(
            ErrorCode::PROMPT_NOT_FOUND,
            format!("Default prompt file not found: {}", path.display()),
            Some(path),
        )
    }

    /// Create an output destination error
    pub fn output_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Output {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create an execution error with default code
    pub fn execution(message: impl Into<String>) -> Self {
        Self::execution_with_code(ErrorCode::EXEC_GENERIC, message, None)
    }

    /// Create an execution error with specific code
    pub fn execution_with_code(
        code: u16,
        message: impl Into<String>,
        command: Option<String>,
    ) -> Self {
        Self::Execution {
            code,
            message: message.into(),
            command,
            exit_code: None,
            source: None,
        }
    }

    /// Create a generic other error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: ErrorCode::OTHER_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Prompt { source: src, .. }
            | Self::Output { source: src, .. }
            | Self::Execution { source: src, .. }
            | Self::Other { source: src, .. } => {
                *src = Some(source.into());
            }
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::Prompt { message, .. }
            | Self::Output { message, .. }
            | Self::Execution { message, .. }
            | Self::Other { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Set the exit code for an execution error
    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        if let Self::Execution {
            exit_code: ref mut ec,
            ..
        } = self
        {
            *ec = Some(exit_code);
        }
        self
    }

    /// Get the process exit code for this error
    ///
    /// An execution error carrying the child's own nonzero status passes
    /// that status through.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Execution {
                exit_code: Some(code),
                ..
            } if (1..=255).contains(code) => *code,
            Self::Config { .. } => 2,
            Self::Prompt { .. } => 3,
            Self::Output { .. } => 4,
            Self::Execution { .. } => 5,
            Self::Other { .. } => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Prompt { code, .. }
            | Self::Output { code, .. }
            | Self::Execution { code, .. }
            | Self::Other { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, .. } => format!("Configuration problem: {}", message),
            Self::Prompt { message, path, .. } => match path {
                Some(p) => format!("Prompt error at {}: {}", p.display(), message),
                None => format!("Prompt error: {}", message),
            },
            Self::Output { message, path, .. } => match path {
                Some(p) => format!("Cannot write transcript to {}: {}", p.display(), message),
                None => format!("Output error: {}", message),
            },
            Self::Execution {
                message, command, ..
            } => {
                if let Some(cmd) = command {
                    format!("Command '{}' failed: {}", cmd, message)
                } else {
                    format!("Execution error: {}", message)
                }
            }
            Self::Other { message, .. } => message.clone(),
        }
    }

    /// Get a developer-friendly error message with full chain
    pub fn developer_message(&self) -> String {
        let mut out = format!("{}", self);
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        out
    }

    /// Whether the prompt or file this error refers to was simply missing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::PROMPT_NOT_FOUND
                | ErrorCode::CONFIG_NOT_FOUND
                | ErrorCode::EXEC_COMMAND_NOT_FOUND
                | ErrorCode::EXEC_CONTAINER_NOT_FOUND
        )
    }
}

/// Type alias for Results using ClaudoError
pub type Result<T> = std::result::Result<T, ClaudoError>;
