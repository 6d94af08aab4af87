//! Error handling module for tailtrim

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for tailtrim operations outside the trim pipeline
#[derive(Error, Debug)]
pub enum TailTrimError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Malformed TOML configuration
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Logging could not be initialized
    #[error("Failed to initialize logging: {message}")]
    Logging { message: String },

    /// Input file not found or inaccessible
    #[error("Input file not found: {path}")]
    InputFileNotFound { path: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error raised by the domain layer
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Result type alias for tailtrim operations
pub type TailTrimResult<T> = std::result::Result<T, TailTrimError>;
