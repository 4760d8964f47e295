//! Error types for the authorization flow and token lifecycle

/// Generic marker recorded when the token endpoint gives no usable error code.
pub const EXCHANGE_FAILED: &str = "token_exchange_failed";

/// Errors from OAuth authorization and credential operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("authorization state mismatch")]
    StateMismatch,

    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("no PKCE verifier stored for this callback")]
    MissingVerifier,

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("credential storage error: {0}")]
    Storage(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Stable code persisted in the credential store's `error` field.
    ///
    /// Provider-supplied codes (`access_denied`, `invalid_grant`, ...) pass
    /// through unchanged.
    pub fn code(&self) -> &str {
        match self {
            Error::NotAuthenticated => "not_authenticated",
            Error::StateMismatch => "state_mismatch",
            Error::AuthorizationDenied(code) | Error::TokenExchangeFailed(code) => code,
            Error::MissingVerifier => "missing_code_verifier",
            Error::Http(_) => EXCHANGE_FAILED,
            Error::Storage(_) | Error::CredentialParse(_) => "storage_error",
            Error::InvalidConfig(_) => "invalid_config",
        }
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_codes_pass_through() {
        assert_eq!(
            Error::AuthorizationDenied("access_denied".into()).code(),
            "access_denied"
        );
        assert_eq!(
            Error::TokenExchangeFailed("invalid_grant".into()).code(),
            "invalid_grant"
        );
    }

    #[test]
    fn local_failures_have_fixed_codes() {
        assert_eq!(Error::StateMismatch.code(), "state_mismatch");
        assert_eq!(Error::MissingVerifier.code(), "missing_code_verifier");
        assert_eq!(Error::Http("connection reset".into()).code(), EXCHANGE_FAILED);
    }

    #[test]
    fn display_includes_detail() {
        let err = Error::TokenExchangeFailed("invalid_grant".into());
        assert_eq!(err.to_string(), "token exchange failed: invalid_grant");
    }
}
