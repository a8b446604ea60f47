//! Error types for agenda-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// A collaborator call failed in a way that may succeed on a later cycle.
    #[error("Transient failure in {collaborator}: {message}")]
    Transient {
        collaborator: &'static str,
        message: String,
    },

    /// A single upstream record could not be interpreted.
    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
