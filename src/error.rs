//! Error types for the configuration core

use thiserror::Error;

/// Errors surfaced to host entry points.
///
/// `Persistence` and `Serialize` are retryable: the canonical configuration
/// and the persisted file are left intact. `Validation` rejects an import or
/// working copy in full, naming the offending field. `ConcurrentEdit` means
/// another entry point already holds the editing slot; `NoActiveEdit` means
/// a commit arrived with no working copy checked out.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to persist configuration: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid configuration field '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("another configuration edit is already in progress")]
    ConcurrentEdit,

    #[error("no configuration edit is in progress")]
    NoActiveEdit,
}

impl ConfigError {
    /// Shorthand used by the schema validators and import checks
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
