//! Error types for the Marquee service.

use thiserror::Error;

use crate::movies::StoreError;

/// Main error type for Marquee operations.
#[derive(Error, Debug)]
pub enum MarqueeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Movie store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Marquee operations.
pub type Result<T> = std::result::Result<T, MarqueeError>;
