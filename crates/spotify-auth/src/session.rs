//! Token lifecycle
//!
//! Owns the authorization state machine:
//!
//! ```text
//! Unauthenticated --login--> Authorizing --callback ok--> Authorized
//! Authorized --expiry / 401--> Stale --refresh ok--> Authorized
//! Stale --refresh failed--> Unauthenticated (failure code recorded)
//! any --logout--> Unauthenticated
//! ```
//!
//! The state is never held in memory; it is derived from the credential
//! store on every call, so several managers (or pages) sharing one store
//! agree on it.

use std::sync::Arc;

use common::Secret;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::constants::{DEFAULT_TOKEN_TYPE, EXPIRY_SKEW_MILLIS, keys};
use crate::error::Result;
use crate::host::Host;
use crate::store::{PersistentStore, StoreWrite};
use crate::token::{self, TokenResponse};

/// Where the session currently sits in the authorization lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// Login started; waiting for the provider to redirect back.
    Authorizing,
    Authorized,
    /// Access token expired or revoked, refresh token on hand.
    Stale,
}

impl AuthState {
    pub fn label(&self) -> &'static str {
        match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::Authorizing => "authorizing",
            AuthState::Authorized => "authorized",
            AuthState::Stale => "stale",
        }
    }
}

/// A usable bearer credential read from the store.
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub token_type: String,
    pub access_token: Secret<String>,
    /// Unix milliseconds
    pub expires_at: u64,
}

impl BearerToken {
    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token.expose())
    }
}

/// Token lifecycle manager.
///
/// Cheap to share behind an `Arc`. `refresh_lock` only serializes
/// [`ensure_fresh`](Self::ensure_fresh); token tuples are written as one
/// store batch regardless, so racing refreshes resolve last-writer-wins on
/// the whole tuple.
pub struct TokenManager {
    config: Arc<AuthConfig>,
    host: Host,
    http: reqwest::Client,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(config: Arc<AuthConfig>, host: Host, http: reqwest::Client) -> Self {
        Self {
            config,
            host,
            http,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    /// The stored access token, if present and not within the expiry skew.
    pub fn current_token(&self) -> Option<BearerToken> {
        let view = self
            .host
            .store
            .snapshot(&[keys::ACCESS_TOKEN, keys::TOKEN_TYPE, keys::EXPIRES_AT]);
        let [access, token_type, expires_at] = <[Option<String>; 3]>::try_from(view).ok()?;

        let access = access.filter(|a| !a.is_empty())?;
        let expires_at = expires_at
            .and_then(|e| e.parse::<u64>().ok())
            .unwrap_or(0);
        let now = self.host.clock.now_millis();
        if now.saturating_add(EXPIRY_SKEW_MILLIS) >= expires_at {
            return None;
        }

        Some(BearerToken {
            token_type: token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            access_token: Secret::new(access),
            expires_at,
        })
    }

    /// True iff an access token exists and `now < expires_at - 5s`.
    pub fn has_valid_token(&self) -> bool {
        self.current_token().is_some()
    }

    pub fn auth_state(&self) -> AuthState {
        if self.has_valid_token() {
            return AuthState::Authorized;
        }
        let store = &self.host.store;
        // A recorded failure means the last refresh (or callback) didn't
        // produce a token, so the refresh token on hand is not trusted.
        if store.get(keys::REFRESH_TOKEN).is_some() && store.get(keys::ERROR).is_none() {
            AuthState::Stale
        } else if store.get(keys::CODE_VERIFIER).is_some() {
            AuthState::Authorizing
        } else {
            AuthState::Unauthenticated
        }
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Returns false without touching the network when no refresh token is
    /// stored. Any failure leaves the stored tokens exactly as they were and
    /// records the failure code, which moves the session to `Unauthenticated`.
    pub async fn refresh(&self) -> bool {
        let Some(refresh) = self.host.store.get(keys::REFRESH_TOKEN) else {
            debug!("no refresh token stored, skipping refresh");
            return false;
        };
        let refresh = Secret::new(refresh);

        let token = match token::refresh_token(&self.http, &self.config, refresh.expose()).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, code = e.code(), "token refresh failed");
                if let Err(e) = self.host.store.set(keys::ERROR, e.code()) {
                    warn!(error = %e, "failed to record refresh failure");
                }
                return false;
            }
        };

        let rotated = token.refresh_token.is_some();
        match self.host.store.apply(self.token_writes(&token)) {
            Ok(()) => {
                info!(rotated, "token refresh succeeded");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to persist refreshed token");
                false
            }
        }
    }

    /// Make sure a valid access token is stored, refreshing if needed.
    ///
    /// Overlapping callers queue on `refresh_lock`; whoever gets it second
    /// sees the first caller's token and skips its own refresh.
    pub async fn ensure_fresh(&self) -> bool {
        if self.has_valid_token() {
            return true;
        }
        let _guard = self.refresh_lock.lock().await;
        if self.has_valid_token() {
            debug!("token refreshed by a concurrent caller");
            return true;
        }
        self.refresh().await
    }

    /// Remove every credential key. Idempotent.
    pub fn logout(&self) -> Result<()> {
        self.host.store.clear(keys::ALL)?;
        info!("logged out, credentials cleared");
        Ok(())
    }

    /// Drop the access token so the next call must refresh or re-authorize.
    pub fn invalidate_access_token(&self) -> Result<()> {
        self.host.store.remove(keys::ACCESS_TOKEN)?;
        debug!("access token invalidated");
        Ok(())
    }

    /// Code of the last authorization or exchange failure.
    pub fn last_error(&self) -> Option<String> {
        self.host.store.get(keys::ERROR)
    }

    /// Path saved at login, returned once.
    pub fn take_post_login_redirect(&self) -> Result<Option<String>> {
        self.host.store.take(keys::POST_LOGIN_REDIRECT)
    }

    /// The full token tuple as one batch, clearing any recorded failure.
    /// The refresh token is only overwritten when the server rotated it.
    pub(crate) fn token_writes(&self, token: &TokenResponse) -> Vec<StoreWrite> {
        let now = self.host.clock.now_millis();
        let mut writes = vec![
            StoreWrite::set(keys::ACCESS_TOKEN, token.access_token.as_str()),
            StoreWrite::set(keys::TOKEN_TYPE, token.token_type()),
            StoreWrite::set(keys::EXPIRES_AT, token.expires_at(now).to_string()),
            StoreWrite::remove(keys::ERROR),
        ];
        if let Some(refresh) = &token.refresh_token {
            writes.push(StoreWrite::set(keys::REFRESH_TOKEN, refresh.as_str()));
        }
        writes
    }
}
