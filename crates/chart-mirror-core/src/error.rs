//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Chart not found: {path}")]
    ChartNotFound { path: String },

    #[error("Invalid chart: {message}")]
    InvalidChart { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid version '{input}': {message}")]
    InvalidVersion { input: String, message: String },

    #[error("Cannot set '{path}': '{segment}' is not a mapping")]
    ValuesPath { path: String, segment: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Invalid .helmignore pattern '{pattern}': {message}")]
    IgnorePattern { pattern: String, message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
