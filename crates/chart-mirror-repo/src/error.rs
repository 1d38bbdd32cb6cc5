//! Error types for collaborator operations

use thiserror::Error;

/// Collaborator errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Network Errors ============
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timed out: {message}")]
    Timeout { message: String },

    #[error("{operation} exceeded the {seconds}s deadline")]
    DeadlineExceeded { operation: String, seconds: u64 },

    #[error("Rate limited by server. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Not found: {url}")]
    NotFound { url: String },

    // ============ Authentication Errors ============
    #[error("Authentication required for {url}")]
    AuthRequired { url: String },

    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    // ============ Release Errors ============
    #[error("Release {tag} not found in {repo}")]
    ReleaseNotFound { repo: String, tag: String },

    // ============ Index Errors ============
    #[error("Index not found at {location}")]
    IndexNotFound { location: String },

    #[error("Index parse error: {message}")]
    IndexParseError { message: String },

    // ============ Import Errors ============
    #[error("Git error: {message}")]
    Git { message: String },

    #[error("Invalid chart path '{path}' in {repo}")]
    InvalidChartPath { repo: String, path: String },

    #[error(transparent)]
    Chart(#[from] chart_mirror_core::CoreError),

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

/// Result type for collaborator operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl RepoError {
    /// Whether the remote reported that the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RepoError::NotFound { .. }
                | RepoError::ReleaseNotFound { .. }
                | RepoError::IndexNotFound { .. }
        )
    }
}

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RepoError::Timeout {
                message: e.to_string(),
            }
        } else if e.is_connect() {
            RepoError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            RepoError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            RepoError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<git2::Error> for RepoError {
    fn from(e: git2::Error) -> Self {
        RepoError::Git {
            message: e.message().to_string(),
        }
    }
}

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(e: serde_json::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for RepoError {
    fn from(e: url::ParseError) -> Self {
        RepoError::Other(format!("Invalid URL: {}", e))
    }
}
