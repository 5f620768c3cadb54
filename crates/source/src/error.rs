//! Source error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("login failed: {0}")]
    Login(String),

    #[error("no upstream credentials configured")]
    MissingCredentials,

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl SourceError {
    /// Whether upstream rejected the request's credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, SourceError::Status { status: 401 | 403, .. })
    }
}
