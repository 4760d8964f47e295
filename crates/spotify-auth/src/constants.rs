//! Spotify OAuth endpoints, scopes, and credential store keys
//!
//! The client is a public PKCE client: there is no client secret, and the
//! client id and redirect URI come from configuration. The actual secrets
//! (access/refresh tokens, PKCE verifier) live in the credential store.

/// Authorization endpoint the browser is sent to
pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.spotify.com/authorize";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";

/// Base URL of the Web API resource server
pub const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Scopes requested when the configuration does not override them.
pub const DEFAULT_SCOPES: &[&str] = &[
    "user-read-email",
    "user-read-private",
    "user-read-currently-playing",
    "user-read-playback-state",
];

/// An access token is treated as expired this long before `expires_at`.
pub const EXPIRY_SKEW_MILLIS: u64 = 5_000;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3_600;

/// Token type assumed when the token endpoint omits `token_type`.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Length of the anti-forgery `state` value.
pub const STATE_LEN: usize = 16;

/// Length of the PKCE code verifier (RFC 7636 allows 43-128).
pub const VERIFIER_LEN: usize = 64;

/// Credential store keys. `logout` removes exactly [`keys::ALL`].
pub mod keys {
    pub const ACCESS_TOKEN: &str = "spotify_access_token";
    pub const REFRESH_TOKEN: &str = "spotify_refresh_token";
    pub const EXPIRES_AT: &str = "spotify_expires_at";
    pub const TOKEN_TYPE: &str = "spotify_token_type";
    pub const STATE: &str = "spotify_state";
    pub const CODE_VERIFIER: &str = "spotify_code_verifier";
    pub const POST_LOGIN_REDIRECT: &str = "spotify_post_login_redirect";
    pub const ERROR: &str = "spotify_error";

    pub const ALL: &[&str] = &[
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        EXPIRES_AT,
        TOKEN_TYPE,
        STATE,
        CODE_VERIFIER,
        POST_LOGIN_REDIRECT,
        ERROR,
    ];
}
