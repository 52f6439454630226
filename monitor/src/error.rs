//! Error types for the void-mc Monitor.
//!
//! Each component has its own error enum; this module gathers them into
//! [`MonitorError`] for callers that handle several components at once.
//! The monitoring loops themselves never return these errors: they log them
//! and carry on.

use thiserror::Error;

use crate::config::ConfigError;
use crate::counters::CounterError;
use crate::messaging::MessagingError;
use crate::status::StatusError;
use crate::tailer::TailerError;

/// Errors that can occur during monitor operations.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Log tailing error.
    #[error("log error: {0}")]
    Tailer(#[from] TailerError),

    /// Death counter persistence error.
    #[error("counter error: {0}")]
    Counter(#[from] CounterError),

    /// Status query error.
    #[error("status error: {0}")]
    Status(#[from] StatusError),

    /// Messaging service error.
    #[error("messaging error: {0}")]
    Messaging(#[from] MessagingError),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
