//! Authorization initiator
//!
//! Starts the PKCE flow: mints `state` and the code verifier, records them
//! along with the page the user should come back to, and sends the browser
//! to the provider's authorize endpoint.

use std::sync::Arc;

use common::Secret;
use tracing::{debug, info};

use crate::config::AuthConfig;
use crate::constants::{STATE_LEN, VERIFIER_LEN, keys};
use crate::error::Result;
use crate::host::Host;
use crate::navigator::Navigator;
use crate::pkce::{build_authorization_url, derive_challenge, random_string};
use crate::store::{PersistentStore, StoreWrite};

pub struct Authorizer {
    config: Arc<AuthConfig>,
    host: Host,
}

impl Authorizer {
    pub fn new(config: Arc<AuthConfig>, host: Host) -> Self {
        Self { config, host }
    }

    /// Begin authorization and navigate away.
    ///
    /// A fresh `state`/verifier pair replaces any pending one. Without a page
    /// location (detached host) nothing is stored and nothing happens.
    pub fn login(&self) -> Result<()> {
        let Some(current) = self.host.navigator.current_url() else {
            debug!("no page location, login is a no-op");
            return Ok(());
        };

        let random = self.host.random.as_ref();
        let state = random_string(random, STATE_LEN);
        let verifier = Secret::new(random_string(random, VERIFIER_LEN));
        let challenge = derive_challenge(verifier.expose());
        let authorize_url = build_authorization_url(&self.config, &state, &challenge)?;

        let return_to = match current.path() {
            "" => "/",
            path => path,
        };

        self.host.store.apply(vec![
            StoreWrite::set(keys::STATE, state.as_str()),
            StoreWrite::set(keys::CODE_VERIFIER, verifier.expose().as_str()),
            StoreWrite::set(keys::POST_LOGIN_REDIRECT, return_to),
        ])?;

        info!(
            scopes = self.config.scopes.len(),
            return_to, "starting authorization"
        );
        self.host.navigator.assign(&authorize_url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::test_support::{config_for, fixture};

    #[test]
    fn login_persists_pkce_state_and_navigates() {
        let fx = fixture("http://app.local/library?tab=albums");
        let config = config_for("https://accounts.example");
        Authorizer::new(config.clone(), fx.host.clone())
            .login()
            .unwrap();

        let state = fx.store.get(keys::STATE).unwrap();
        let verifier = fx.store.get(keys::CODE_VERIFIER).unwrap();
        assert_eq!(state.len(), STATE_LEN);
        assert_eq!(verifier.len(), VERIFIER_LEN);
        assert_eq!(
            fx.store.get(keys::POST_LOGIN_REDIRECT).as_deref(),
            Some("/library")
        );

        let url = fx.navigator.last_assigned().unwrap();
        assert_eq!(url.path(), "/authorize");
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-abc");
        assert_eq!(params["redirect_uri"], "http://app.local/callback");
        assert_eq!(params["scope"], config.scope_param());
        assert_eq!(params["state"], state);
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["code_challenge"], derive_challenge(&verifier));

        // Navigating away does not rewrite the current location.
        assert_eq!(
            fx.navigator.current_url().unwrap().as_str(),
            "http://app.local/library?tab=albums"
        );
    }

    #[test]
    fn second_login_supersedes_pending_attempt() {
        let fx = fixture("http://app.local/");
        let authorizer = Authorizer::new(config_for("https://accounts.example"), fx.host.clone());

        authorizer.login().unwrap();
        let first_state = fx.store.get(keys::STATE).unwrap();
        authorizer.login().unwrap();
        let second_state = fx.store.get(keys::STATE).unwrap();

        assert_ne!(first_state, second_state);
        assert_eq!(fx.navigator.assigned().len(), 2);
    }

    #[test]
    fn login_without_page_is_noop() {
        let authorizer = Authorizer::new(config_for("https://accounts.example"), Host::detached());
        authorizer.login().unwrap();
    }
}
