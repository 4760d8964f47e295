//! Spotify OAuth (Authorization Code + PKCE) for public clients
//!
//! Everything a page-resident client needs to get and keep a Spotify access
//! token without a backend secret. The host page is abstracted behind the
//! capabilities in [`host`] and [`navigator`], so this crate has no browser
//! dependency and the whole flow is unit-testable.
//!
//! Flow:
//! 1. UI calls `Authorizer::login()` → state + verifier stored, browser sent
//!    to the authorize endpoint
//! 2. Provider redirects back; `CallbackHandler::handle_callback()` checks
//!    `state`, calls `token::exchange_code()`, stores the token tuple
//! 3. Before each API call, `TokenManager::ensure_fresh()` refreshes via
//!    `token::refresh_token()` when the access token is stale
//! 4. `TokenManager::logout()` wipes every credential key

pub mod authorize;
pub mod callback;
pub mod config;
pub mod constants;
pub mod error;
pub mod host;
pub mod navigator;
pub mod pkce;
pub mod session;
pub mod store;
pub mod token;

#[cfg(test)]
mod test_support;

pub use authorize::Authorizer;
pub use callback::CallbackHandler;
pub use config::AuthConfig;
pub use constants::*;
pub use error::{Error, Result};
pub use host::{Clock, Host, ManualClock, OsRandom, RandomSource, SystemClock};
pub use navigator::{MemoryNavigator, Navigator};
pub use pkce::{build_authorization_url, derive_challenge, random_string};
pub use session::{AuthState, BearerToken, TokenManager};
pub use store::{FileStore, MemoryStore, NullStore, PersistentStore, StoreWrite};
pub use token::{TokenResponse, exchange_code, refresh_token};
