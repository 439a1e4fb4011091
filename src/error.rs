use thiserror::Error;

/// Library error type for photo browsing operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A controller was asked about a cell that is not materialized yet.
    #[error("index {index} is outside the {len} loaded photos")]
    IndexOutOfRange { index: usize, len: usize },

    /// The background task behind a handle has stopped.
    #[error("{0} task is no longer running")]
    SessionClosed(&'static str),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Photo list could not be decoded.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
