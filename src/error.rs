//! Error types for herald.

use thiserror::Error;

use crate::command::CommandError;
use crate::feed::FetchError;
use crate::messaging::MessagingError;

/// Common error type for herald.
#[derive(Error, Debug)]
pub enum HeraldError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for configuration values or user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Feed could not be fetched or parsed.
    #[error("feed error: {0}")]
    Fetch(#[from] FetchError),

    /// Messaging platform error.
    #[error("messaging error: {0}")]
    Messaging(#[from] MessagingError),

    /// Operator command error.
    #[error("command error: {0}")]
    Command(#[from] CommandError),
}

/// Result type alias for herald operations.
pub type Result<T> = std::result::Result<T, HeraldError>;
