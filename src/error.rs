//! Error type shared by every operation handler.

use thiserror::Error;

/// Operation error. Every variant renders to the `message` field of the
/// failure JSON printed on stdout.
#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("AI request failed: {0}")]
    Ai(String),

    #[error("{0}")]
    Invalid(String),
}

impl Error {
    /// Application-level invalid state or bad input, reported as an explicit
    /// failure message rather than a crash.
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::Invalid(message.into())
    }
}
