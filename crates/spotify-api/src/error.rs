//! Error types for resource API calls

/// Errors from authenticated Web API requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable access token and refresh was impossible or failed.
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("API returned {status}: {reason}")]
    Api { status: u16, reason: String },

    /// The response claimed JSON but didn't parse (or didn't match the
    /// expected shape).
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Whether the UI should fall back to its signed-out state.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Error::NotAuthenticated | Error::Api { status: 401, .. }
        )
    }
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;
