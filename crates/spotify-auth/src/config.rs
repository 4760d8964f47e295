//! Client configuration for the authorization flow
//!
//! Built once at startup and shared behind an `Arc`; nothing in the flow
//! mutates it.

use serde::Deserialize;

use crate::constants::{API_BASE_URL, AUTHORIZE_ENDPOINT, DEFAULT_SCOPES, TOKEN_ENDPOINT};
use crate::error::{Error, Result};

/// Public-client OAuth settings plus the endpoints they are used against.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Empty when omitted so an environment overlay can supply it;
    /// `validate()` rejects it if nothing does.
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_authorize_endpoint")]
    pub authorize_endpoint: String,
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

fn default_authorize_endpoint() -> String {
    AUTHORIZE_ENDPOINT.to_string()
}

fn default_token_endpoint() -> String {
    TOKEN_ENDPOINT.to_string()
}

fn default_api_base_url() -> String {
    API_BASE_URL.to_string()
}

impl AuthConfig {
    /// Config against the production Spotify endpoints with default scopes.
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: default_scopes(),
            authorize_endpoint: default_authorize_endpoint(),
            token_endpoint: default_token_endpoint(),
            api_base_url: default_api_base_url(),
        }
    }

    /// Space-joined scope list as sent in the `scope` parameter.
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }

    /// Reject configurations the flow cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::InvalidConfig("client_id must not be empty".into()));
        }

        for (name, value) in [
            ("redirect_uri", &self.redirect_uri),
            ("authorize_endpoint", &self.authorize_endpoint),
            ("token_endpoint", &self.token_endpoint),
            ("api_base_url", &self.api_base_url),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(Error::InvalidConfig(format!(
                    "{name} must start with http:// or https://, got: {value}"
                )));
            }
            url::Url::parse(value)
                .map_err(|e| Error::InvalidConfig(format!("{name} is not a valid URL: {e}")))?;
        }

        Ok(())
    }
}
