//! Error types for word_rank_grader
//!
//! This module defines the library-level error type. Failures that belong to
//! a single grading run (a missing capability, a crashing candidate) are not
//! Rust errors; they are reported as diagnostics in
//! [`crate::grading::errors`].

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, GraderError>;

/// Main error type for word_rank_grader
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraderError {
    /// Input word, corpus, or source text is empty
    #[error("Empty input: {message}")]
    EmptyInput { message: String },

    /// The embedding provider has no vector for a word
    #[error("Unknown word: '{word}' is not covered by the embedding provider")]
    UnknownWord { word: String },

    /// The dense embedding provider could not be constructed or is required but missing
    #[error("Embedding provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    /// Two vector representations cannot be compared
    #[error("Incompatible vectors: {message}")]
    IncompatibleVectors { message: String },

    /// Configuration validation failed
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Filesystem or process I/O failed
    #[error("I/O error: {message}")]
    Io { message: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Internal error (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GraderError {
    /// Create an empty input error
    pub fn empty_input(message: impl Into<String>) -> Self {
        Self::EmptyInput {
            message: message.into(),
        }
    }

    /// Create an unknown word error
    pub fn unknown_word(word: impl Into<String>) -> Self {
        Self::UnknownWord { word: word.into() }
    }

    /// Create a provider unavailable error
    pub fn provider_unavailable(message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            message: message.into(),
        }
    }

    /// Create an incompatible vectors error
    pub fn incompatible_vectors(message: impl Into<String>) -> Self {
        Self::IncompatibleVectors {
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error means the dense provider cannot be used
    pub fn is_provider_unavailable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. })
    }
}

impl From<serde_json::Error> for GraderError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for GraderError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}
