//! Error types for the registry synthesis pipeline.
//!
//! Two classes of failure exist: validation errors raised while resolving a
//! registry spec (terminal, never retried) and persistence errors raised by the
//! artifact store (conflicts are retried, everything else is surfaced).

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the synthesis pipeline.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Artifact persistence errors.
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The manifest file was not found.
    #[error("Manifest file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The manifest (or an embedded template) could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("{message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// Duplicate resource definition.
    #[error("duplicate {resource_type} name: {name:?}")]
    DuplicateName {
        /// Type of resource (registry, provider).
        resource_type: String,
        /// The duplicated name.
        name: String,
    },
}

/// Artifact persistence errors.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The version token presented on write is stale, or another writer won a race.
    #[error("conflict writing artifact {key}: {message}")]
    Conflict {
        /// Artifact key.
        key: String,
        /// Description of the conflict.
        message: String,
    },

    /// Create was attempted on an artifact that already exists.
    #[error("artifact {key} already exists")]
    AlreadyExists {
        /// Artifact key.
        key: String,
    },

    /// Update was attempted on an artifact that does not exist.
    #[error("artifact {key} not found")]
    NotFound {
        /// Artifact key.
        key: String,
    },

    /// Artifact could not be (de)serialized.
    #[error("artifact serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
    },

    /// Backend operation failed for a reason other than a conflict.
    #[error("failed to {operation} artifact {key}: {message}")]
    Backend {
        /// Operation that failed (get, create, update, delete).
        operation: String,
        /// Artifact key.
        key: String,
        /// Underlying failure.
        message: String,
    },

    /// The owner reference cannot be attached.
    #[error("invalid owner reference: {message}")]
    InvalidOwnerReference {
        /// Description of the problem.
        message: String,
    },

    /// Conflicts kept occurring until the retry policy gave up.
    #[error("gave up writing artifact {key} after {attempts} conflicting attempts")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Artifact key.
        key: String,
    },
}

/// Result type alias for synthesis operations.
pub type Result<T> = std::result::Result<T, SynthError>;

impl SynthError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error signals an optimistic-concurrency conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Persist(PersistError::Conflict { .. }))
    }

    /// Returns true if this error is retryable.
    ///
    /// Only conflicts qualify: validation input is static and every other
    /// backend failure is fatal for the cycle.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.is_conflict()
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }

    /// Prefixes the message of a validation error, keeping its field.
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn context(self, prefix: &str) -> Self {
        match self {
            Self::ValidationError { message, field } => Self::ValidationError {
                message: format!("{prefix}: {message}"),
                field,
            },
            other => other,
        }
    }
}

impl PersistError {
    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a backend error for the given operation.
    #[must_use]
    pub fn backend(
        operation: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Backend {
            operation: operation.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}
