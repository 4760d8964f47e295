//! Authorization callback handling
//!
//! Runs on every page load. If the location carries an authorization
//! response (`code` or `error`), validates it, exchanges the code for tokens,
//! and scrubs the response parameters from the visible URL so a reload can't
//! replay a spent code.
//!
//! The pending `state` and verifier are consumed with `take` before
//! anything else, so each login attempt can complete at most once. A second
//! visit with the same code finds no verifier and is rejected without
//! contacting the token endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use common::Secret;
use tracing::{debug, info, warn};
use url::Url;

use crate::constants::keys;
use crate::error::{Error, Result};
use crate::navigator::Navigator;
use crate::session::TokenManager;
use crate::store::PersistentStore;
use crate::token;

/// Query parameters the provider appends to the redirect URI.
const RESPONSE_PARAMS: &[&str] = &["code", "state", "error", "error_description"];

pub struct CallbackHandler {
    tokens: Arc<TokenManager>,
}

impl CallbackHandler {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self { tokens }
    }

    /// Process the current location as an authorization response.
    ///
    /// Returns `Ok(false)` when the page is not a callback visit (no side
    /// effects). Otherwise returns `Ok(true)` once the visit is handled;
    /// failures are recorded in the store's `error` field rather than
    /// returned. `Err` only surfaces when the failure itself can't be
    /// recorded.
    pub async fn handle_callback(&self) -> Result<bool> {
        let host = self.tokens.host();
        let Some(location) = host.navigator.current_url() else {
            return Ok(false);
        };

        let params: HashMap<String, String> = location.query_pairs().into_owned().collect();
        let code = params.get("code").filter(|c| !c.is_empty());
        let denied = params.get("error").filter(|e| !e.is_empty());

        let outcome = match (denied, code) {
            (None, None) => return Ok(false),
            (Some(error), _) => self.discard_pending(error),
            (None, Some(code)) => self.complete(code, params.get("state")).await,
        };

        match outcome {
            Ok(()) => info!("authorization complete"),
            Err(e) => {
                warn!(error = %e, code = e.code(), "authorization callback failed");
                host.store.set(keys::ERROR, e.code())?;
            }
        }

        host.navigator.replace(&strip_response_params(&location));
        Ok(true)
    }

    /// The provider refused; drop the pending attempt.
    fn discard_pending(&self, error: &str) -> Result<()> {
        self.tokens
            .host()
            .store
            .clear(&[keys::STATE, keys::CODE_VERIFIER])?;
        Err(Error::AuthorizationDenied(error.to_string()))
    }

    async fn complete(&self, code: &str, returned_state: Option<&String>) -> Result<()> {
        let store = &self.tokens.host().store;

        if let Some(expected) = store.take(keys::STATE)? {
            if returned_state != Some(&expected) {
                store.remove(keys::CODE_VERIFIER)?;
                return Err(Error::StateMismatch);
            }
        }

        let verifier = store
            .take(keys::CODE_VERIFIER)?
            .map(Secret::new)
            .ok_or(Error::MissingVerifier)?;

        debug!("exchanging authorization code");
        let token = token::exchange_code(
            self.tokens.http_client(),
            self.tokens.config(),
            code,
            verifier.expose(),
        )
        .await?;

        store.apply(self.tokens.token_writes(&token))
    }
}

/// `location` without the authorization response parameters; anything else
/// in the query (and the fragment) is kept.
pub fn strip_response_params(location: &Url) -> Url {
    let kept: Vec<(String, String)> = location
        .query_pairs()
        .filter(|(k, _)| !RESPONSE_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut clean = location.clone();
    if kept.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(kept);
    }
    clean
}
