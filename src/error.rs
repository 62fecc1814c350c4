//! Custom error types for the application.
//!
//! `StripError` consolidates the failure modes of the viewer: configuration
//! loading and validation, filesystem I/O, and the file watcher. Note that
//! most runtime conditions in the tail-and-render pipeline are deliberately
//! *not* errors: a missing session file, a malformed sample line, or a file
//! that is momentarily unavailable are all retried or skipped silently, so
//! they never surface through this type.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, StripError>;

#[derive(Error, Debug)]
pub enum StripError {
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Display error: {0}")]
    Display(String),
}
