//! Classification of failed HTTP requests.

use reqwest::StatusCode;
use thiserror::Error;

/// Why a GET did not yield a usable body.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The server answered, but not with a 2xx status.
    #[error("HTTP {0}")]
    Status(StatusCode),
    /// No response was obtained, or the body could not be read.
    #[error("transport error")]
    Transport(#[source] reqwest::Error),
    /// The body arrived but could not be written locally.
    #[error("failed to write response body")]
    Write(#[source] std::io::Error),
}

/// Map a reqwest error to a status failure when it carries one, otherwise to
/// a transport failure.
pub fn classify_error(error: reqwest::Error) -> HttpError {
    match error.status() {
        Some(status) => HttpError::Status(status),
        None => HttpError::Transport(error),
    }
}
