//! Top-level error types for lfsctl.

use thiserror::Error;

use crate::api::ApiError;
use crate::session::SessionError;
use crate::store::StoreError;

/// Top-level error type encompassing all client errors.
///
/// `Usage` errors are reported immediately and never retried; `Api` errors
/// carry the normalized status/message/details of a failed remote call.
#[derive(Debug, Error)]
pub enum Error {
    /// The invocation cannot proceed as typed (missing endpoint, missing
    /// tenant selection, missing token, unknown tenant).
    #[error("{message}")]
    Usage { message: String },

    /// Normalized error from a remote call.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Error from secret storage operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error from session directory persistence.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl Error {
    /// Construct a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }
}
