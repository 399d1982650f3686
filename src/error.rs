// src/error.rs

//! Unified error handling for the movies API.

use std::fmt;

use thiserror::Error;

/// Result type alias for movie catalog operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Client input failed validation
    #[error("{0}")]
    Validation(String),

    /// Multipart body or its Content-Type could not be parsed
    #[error("{0}")]
    Multipart(String),

    /// Another record already uses the normalized title
    #[error("movie with same title already exists")]
    Duplicate,

    /// Record or result set not found
    #[error("{0}")]
    NotFound(String),

    /// Record store request failed
    #[error("Record store error: {0}")]
    Store(String),

    /// Object store request failed
    #[error("Object store error: {0}")]
    ObjectStore(String),

    /// Summary generation failed
    #[error("Summary generation error: {0}")]
    Summary(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AppError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a multipart parsing error.
    pub fn multipart(message: impl fmt::Display) -> Self {
        Self::Multipart(message.to_string())
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a record store error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    /// Create an object store error.
    pub fn object_store(message: impl fmt::Display) -> Self {
        Self::ObjectStore(message.to_string())
    }

    /// Create a summary generation error.
    pub fn summary(message: impl fmt::Display) -> Self {
        Self::Summary(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// HTTP status code reported for this error.
    ///
    /// Upstream dependency failures are reported as client errors carrying the
    /// underlying message; only local faults map to 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_)
            | Self::Multipart(_)
            | Self::Duplicate
            | Self::Store(_)
            | Self::ObjectStore(_)
            | Self::Summary(_) => 400,
            Self::NotFound(_) => 404,
            Self::Config(_) | Self::Io(_) | Self::Json(_) | Self::Toml(_) => 500,
        }
    }
}
