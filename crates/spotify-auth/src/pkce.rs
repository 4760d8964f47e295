//! PKCE (Proof Key for Code Exchange) implementation per RFC 7636
//!
//! Generates the anti-forgery `state`, the code verifier, and the S256
//! challenge used during the authorization flow. The verifier stays in the
//! credential store and is sent during token exchange; the challenge goes
//! into the authorization URL so the authorization server can check that the
//! exchange came from the party that started the flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::host::RandomSource;

/// RFC 3986 unreserved characters.
const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Bytes at or above this are rejected so every character is equally likely.
const ACCEPT_BELOW: u8 = (256 - 256 % UNRESERVED.len()) as u8;

/// Generate `len` characters drawn uniformly from the unreserved alphabet.
pub fn random_string(random: &dyn RandomSource, len: usize) -> String {
    let mut out = String::with_capacity(len);
    let mut buf = [0u8; 64];
    while out.len() < len {
        random.fill_bytes(&mut buf);
        for &b in buf.iter().filter(|&&b| b < ACCEPT_BELOW) {
            if out.len() == len {
                break;
            }
            out.push(UNRESERVED[b as usize % UNRESERVED.len()] as char);
        }
    }
    out
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`, no padding.
pub fn derive_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Build the authorization URL with every required OAuth parameter.
///
/// Values are form-encoded, so the space-joined scope list goes out as
/// `scope=a+b+c`.
pub fn build_authorization_url(config: &AuthConfig, state: &str, challenge: &str) -> Result<Url> {
    let scope = config.scope_param();
    Url::parse_with_params(
        &config.authorize_endpoint,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge_method", "S256"),
            ("code_challenge", challenge),
        ],
    )
    .map_err(|e| Error::InvalidConfig(format!("authorize_endpoint is not a valid URL: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU8, Ordering};

    use super::*;
    use crate::host::OsRandom;

    /// Emits 0, 1, 2, ... wrapping at 256.
    struct CountingRandom(AtomicU8);

    impl RandomSource for CountingRandom {
        fn fill_bytes(&self, buf: &mut [u8]) {
            for b in buf.iter_mut() {
                *b = self.0.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[test]
    fn random_string_has_requested_length_and_alphabet() {
        for len in [16, 43, 64, 128] {
            let s = random_string(&OsRandom, len);
            assert_eq!(s.len(), len);
            assert!(
                s.bytes().all(|b| UNRESERVED.contains(&b)),
                "unexpected character in {s}"
            );
        }
    }

    #[test]
    fn random_strings_are_unique() {
        let a = random_string(&OsRandom, 64);
        let b = random_string(&OsRandom, 64);
        assert_ne!(a, b, "two verifiers must not collide");
    }

    #[test]
    fn random_string_rejects_biased_bytes() {
        // A full 0..=255 cycle accepts exactly 198 bytes: three per character.
        let random = CountingRandom(AtomicU8::new(0));
        let s = random_string(&random, 198);

        let mut counts: HashMap<char, usize> = HashMap::new();
        for c in s.chars() {
            *counts.entry(c).or_default() += 1;
        }
        assert_eq!(counts.len(), UNRESERVED.len());
        assert!(counts.values().all(|&n| n == 3), "counts: {counts:?}");
    }

    #[test]
    fn challenge_is_deterministic() {
        let verifier = "test-verifier-value";
        assert_eq!(derive_challenge(verifier), derive_challenge(verifier));
    }

    #[test]
    fn challenge_is_url_safe_base64() {
        for _ in 0..32 {
            let challenge = derive_challenge(&random_string(&OsRandom, 64));
            // SHA-256 produces 32 bytes → 43 base64url chars (no padding)
            assert_eq!(challenge.len(), 43);
            assert!(
                !challenge.contains(['+', '/', '=']),
                "challenge must be base64url without padding: {challenge}"
            );
        }
    }

    #[test]
    fn challenge_matches_rfc7636_appendix_b() {
        let challenge = derive_challenge("dBjftJeZ4CVP-mJ92K9cHgrSGgmpNoCLXUBAANqCQ3Q");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn authorization_url_contains_required_params() {
        let config = AuthConfig::new("client-abc", "http://127.0.0.1:8888/callback");
        let challenge = derive_challenge("verifier");
        let url = build_authorization_url(&config, "state-123", &challenge).unwrap();

        assert_eq!(url.host_str(), Some("accounts.spotify.com"));
        assert_eq!(url.path(), "/authorize");

        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-abc");
        assert_eq!(params["redirect_uri"], "http://127.0.0.1:8888/callback");
        assert_eq!(params["scope"], config.scope_param());
        assert_eq!(params["state"], "state-123");
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["code_challenge"], challenge);
    }
}
