//! Engine error types

use chart_mirror_core::CoreError;
use chart_mirror_repo::RepoError;
use thiserror::Error;

/// Main engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Fetch failed: {message}")]
    Fetch { message: String },

    #[error("Invalid version tag '{tag}' of {name}: {message}")]
    InvalidTag {
        name: String,
        tag: String,
        message: String,
    },

    #[error("Cannot transform chart '{chart}': {message}")]
    Transform { chart: String, message: String },

    #[error("Publishing {chart} failed: {message}")]
    Publish { chart: String, message: String },

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error kind for categorizing failures
///
/// Note: This enum is non-exhaustive - new variants may be added in future versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Remote unavailable, or not found at any location tried
    Fetch,
    /// Malformed version tag or YAML
    Parse,
    /// Chart tree lacks the structure a patch rule needs
    Transform,
    /// Release index unreadable or malformed
    Index,
    /// Chart tree could not be written
    Publish,
    /// Invalid source configuration
    Config,
}

impl ErrorKind {
    /// Convert to a code string for diagnostics
    pub fn to_code_string(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Parse => "parse",
            Self::Transform => "transform",
            Self::Index => "index",
            Self::Publish => "publish",
            Self::Config => "config",
        }
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::InvalidTag { .. } => ErrorKind::Parse,
            Self::Transform { .. } => ErrorKind::Transform,
            Self::Publish { .. } => ErrorKind::Publish,
            Self::Repo(e) => repo_kind(e),
            Self::Core(e) => core_kind(e),
        }
    }

    /// Wrap a values error raised while patching `chart`
    pub(crate) fn transform(chart: &str, err: CoreError) -> Self {
        Self::Transform {
            chart: chart.to_string(),
            message: err.to_string(),
        }
    }
}

fn repo_kind(err: &RepoError) -> ErrorKind {
    match err {
        RepoError::IndexNotFound { .. } | RepoError::IndexParseError { .. } => ErrorKind::Index,
        RepoError::Serialization(_) => ErrorKind::Parse,
        RepoError::Chart(e) => core_kind(e),
        _ => ErrorKind::Fetch,
    }
}

fn core_kind(err: &CoreError) -> ErrorKind {
    match err {
        CoreError::ValuesPath { .. } => ErrorKind::Transform,
        CoreError::InvalidConfig { .. } => ErrorKind::Config,
        CoreError::Io(_) | CoreError::Archive { .. } => ErrorKind::Publish,
        _ => ErrorKind::Parse,
    }
}
