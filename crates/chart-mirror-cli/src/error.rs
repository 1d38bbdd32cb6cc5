//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use chart_mirror_core::CoreError;
use chart_mirror_engine::{EngineError, ErrorKind};
use chart_mirror_repo::RepoError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Configuration file missing or invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(chart_mirror::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Release index unreadable
    #[error("Release index error: {message}")]
    #[diagnostic(
        code(chart_mirror::cli::index),
        help("pass --index-file to read a local index, or --from-tags to use the destination's release tags")
    )]
    Index { message: String },

    /// Remote call failed
    #[error("Fetch failed: {message}")]
    #[diagnostic(code(chart_mirror::cli::fetch))]
    Fetch { message: String },

    /// Some versions or dependencies were skipped
    #[error("{skipped} version(s) skipped, {incomplete} published without every dependency")]
    #[diagnostic(code(chart_mirror::cli::partial), help("see the log above for the reason of each skip"))]
    Partial { skipped: usize, incomplete: usize },

    /// Sources that produced nothing
    #[error("Nothing could be mirrored for: {}", .sources.join(", "))]
    #[diagnostic(code(chart_mirror::cli::source_failed))]
    SourceFailed { sources: Vec<String> },

    #[error("Interrupted")]
    #[diagnostic(code(chart_mirror::cli::cancelled))]
    Cancelled,

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chart_mirror::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(chart_mirror::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Index { .. } => exit_codes::ERROR,
            CliError::Fetch { .. } => exit_codes::ERROR,
            CliError::Partial { .. } => exit_codes::PARTIAL,
            CliError::SourceFailed { .. } => exit_codes::SOURCE_FAILED,
            CliError::Cancelled => exit_codes::CANCELLED,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::io(err)
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidConfig { message } => CliError::config(message),
            CoreError::Io(e) => CliError::io(e),
            other => CliError::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::IndexNotFound { .. } | RepoError::IndexParseError { .. } => {
                CliError::Index {
                    message: err.to_string(),
                }
            }
            RepoError::Io(e) => CliError::io(e),
            RepoError::Chart(e) => e.into(),
            other => CliError::Fetch {
                message: other.to_string(),
            },
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Repo(e) => e.into(),
            EngineError::Core(e) => e.into(),
            other => {
                let message = other.to_string();
                match other.kind() {
                    ErrorKind::Fetch => CliError::Fetch { message },
                    _ => CliError::Other { message },
                }
            }
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::config("missing").exit_code(), 4);
        assert_eq!(
            CliError::Partial {
                skipped: 1,
                incomplete: 0
            }
            .exit_code(),
            2
        );
        assert_eq!(
            CliError::SourceFailed {
                sources: vec!["gardener".to_string()]
            }
            .exit_code(),
            3
        );
        assert_eq!(CliError::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_conversions() {
        let err: CliError = CoreError::InvalidConfig {
            message: "bad".to_string(),
        }
        .into();
        assert!(matches!(err, CliError::Config { .. }));

        let err: CliError = EngineError::Repo(RepoError::IndexNotFound {
            location: "index.yaml".to_string(),
        })
        .into();
        assert!(matches!(err, CliError::Index { .. }));

        let err: CliError = RepoError::Io(std::io::Error::other("disk full")).into();
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);

        let err: CliError = EngineError::Core(CoreError::InvalidConfig {
            message: "no sources".to_string(),
        })
        .into();
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);

        let err: CliError = EngineError::Fetch {
            message: "all manifest locations failed".to_string(),
        }
        .into();
        assert!(matches!(err, CliError::Fetch { .. }));
    }
}
