//! OAuth token endpoint calls
//!
//! Handles the two token endpoint interactions:
//! 1. Authorization code exchange (callback completion)
//! 2. Token refresh (on demand, before an API call)
//!
//! Both POST a form-encoded body to the configured token endpoint with
//! different grant types. As a public PKCE client there is no client secret;
//! `client_id` goes in the body.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AuthConfig;
use crate::constants::{DEFAULT_EXPIRES_IN_SECS, DEFAULT_TOKEN_TYPE};
use crate::error::{EXCHANGE_FAILED, Error, Result};

/// Response from the token endpoint for both exchange and refresh.
///
/// `expires_in` is a delta in seconds from the response time; the caller
/// converts it to an absolute unix millisecond timestamp when storing.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Absent on refresh unless the server rotates the refresh token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenResponse {
    pub fn token_type(&self) -> &str {
        self.token_type.as_deref().unwrap_or(DEFAULT_TOKEN_TYPE)
    }

    /// Absolute expiry in unix milliseconds, given the time the response arrived.
    pub fn expires_at(&self, now_millis: u64) -> u64 {
        let lifetime = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        now_millis.saturating_add(lifetime.saturating_mul(1000))
    }
}

/// RFC 6749 §5.2 error body.
#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchange an authorization code for tokens.
///
/// The user has authorized in the browser and we received the code on the
/// redirect. We send it with the PKCE verifier to prove we started the flow.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &AuthConfig,
    code: &str,
    verifier: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(&config.token_endpoint)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("client_id", config.client_id.as_str()),
            ("code_verifier", verifier),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    read_token_response(response).await
}

/// Refresh an access token using a refresh token.
pub async fn refresh_token(
    client: &reqwest::Client,
    config: &AuthConfig,
    refresh: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(&config.token_endpoint)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("client_id", config.client_id.as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    read_token_response(response).await
}

/// Turn a token endpoint response into tokens or the server's error code.
async fn read_token_response(response: reqwest::Response) -> Result<TokenResponse> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("reading token response: {e}")))?;

    if !status.is_success() {
        let code = match serde_json::from_str::<TokenErrorBody>(&body) {
            Ok(err) => {
                debug!(
                    %status,
                    error = %err.error,
                    description = err.error_description.as_deref().unwrap_or(""),
                    "token endpoint rejected request"
                );
                err.error
            }
            Err(_) => {
                debug!(%status, "token endpoint returned non-OAuth error body");
                EXCHANGE_FAILED.to_string()
            }
        };
        return Err(Error::TokenExchangeFailed(code));
    }

    serde_json::from_str::<TokenResponse>(&body).map_err(|e| {
        debug!(error = %e, "token endpoint returned unparseable success body");
        Error::TokenExchangeFailed(EXCHANGE_FAILED.to_string())
    })
}
