//! Spotify session CLI
//!
//! Headless driver for the PKCE flow and the authenticated API client:
//! 1. `login` prints the authorization URL to open in a browser
//! 2. `callback <url>` takes the URL the browser was redirected to and
//!    completes the code exchange
//! 3. Everything else reuses the stored credentials, refreshing as needed
//!
//! Credentials persist in a JSON file (see `[storage]` in the config).
//! Logs go to stderr as JSON; stdout carries only command output.

mod cli;
mod config;

use anyhow::{Context, Result};
use spotify_api::{ApiBody, ApiClient, RequestOptions};
use spotify_auth::{
    AuthConfig, AuthState, Authorizer, CallbackHandler, Clock, FileStore, Host, MemoryNavigator,
    PersistentStore, TokenManager,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use crate::cli::Command;
use crate::config::Config;

/// Long-lived pieces every command is built from
struct Session {
    auth: Arc<AuthConfig>,
    store: Arc<dyn PersistentStore>,
    http: reqwest::Client,
}

impl Session {
    /// Token manager over the credential store, optionally "at" a page.
    fn tokens(&self, page: Option<Url>) -> Arc<TokenManager> {
        let navigator = match page {
            Some(url) => MemoryNavigator::at(url),
            None => MemoryNavigator::detached(),
        };
        let host = Host::new(self.store.clone(), Arc::new(navigator));
        Arc::new(TokenManager::new(self.auth.clone(), host, self.http.clone()))
    }

    fn api(&self) -> ApiClient {
        ApiClient::new(self.tokens(None))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = cli::parse(&args)?;

    let config_path = Config::resolve_path(invocation.config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        credentials = %config.storage.credentials_path.display(),
        timeout_secs = config.http.timeout_secs,
        scopes = config.spotify.scopes.len(),
        "configuration loaded"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let store = FileStore::open(config.storage.credentials_path.clone()).with_context(|| {
        format!(
            "failed to open credential store {}",
            config.storage.credentials_path.display()
        )
    })?;

    let session = Session {
        auth: Arc::new(config.spotify),
        store: Arc::new(store),
        http,
    };

    let mut out = Vec::new();
    let result = run(&session, invocation.command, &mut out).await;
    std::io::stdout().write_all(&out)?;
    result
}

async fn run(session: &Session, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Login => {
            let page = Url::parse(&session.auth.redirect_uri)
                .context("redirect_uri is not a valid URL")?;
            let navigator = Arc::new(MemoryNavigator::at(page));
            let host = Host::new(session.store.clone(), navigator.clone());
            Authorizer::new(session.auth.clone(), host).login()?;

            let url = navigator.last_assigned().context("authorization did not start")?;
            writeln!(out, "{url}")?;
        }

        Command::Callback(raw) => {
            let page = Url::parse(&raw).context("callback argument is not a valid URL")?;
            let tokens = session.tokens(Some(page));
            let handled = CallbackHandler::new(tokens.clone()).handle_callback().await?;
            if !handled {
                anyhow::bail!("URL carries no authorization response (no code or error)");
            }
            if let Some(code) = tokens.last_error() {
                anyhow::bail!("authorization failed: {code}");
            }
            let return_to = tokens.take_post_login_redirect()?;
            writeln!(out, "authorized")?;
            if let Some(path) = return_to {
                writeln!(out, "return to: {path}")?;
            }
        }

        Command::Status => {
            let tokens = session.tokens(None);
            let state = tokens.auth_state();
            writeln!(out, "{}", state.label())?;
            if state == AuthState::Authorized {
                if let Some(token) = tokens.current_token() {
                    let now = tokens.host().clock.now_millis();
                    let secs = token.expires_at.saturating_sub(now) / 1000;
                    writeln!(out, "expires in: {secs}s")?;
                }
            }
            if let Some(code) = tokens.last_error() {
                writeln!(out, "last error: {code}")?;
            }
        }

        Command::Me => {
            let profile = session.api().get_profile().await.map_err(api_error)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&profile)?)?;
        }

        Command::NowPlaying => {
            match session.api().get_currently_playing().await.map_err(api_error)? {
                Some(playing) => match playing.item {
                    Some(track) => {
                        let progress = playing.progress_ms.map(format_ms).unwrap_or_default();
                        let paused = if playing.is_playing { "" } else { " (paused)" };
                        let by = track.artist_names();
                        if by.is_empty() {
                            writeln!(out, "{}{paused}", track.name)?;
                        } else {
                            writeln!(out, "{} by {by}{paused}", track.name)?;
                        }
                        if !progress.is_empty() {
                            writeln!(out, "{progress} / {}", format_ms(track.duration_ms))?;
                        }
                    }
                    None => writeln!(out, "something is playing (no item details)")?,
                },
                None => writeln!(out, "nothing playing")?,
            }
        }

        Command::Track(id) => {
            let track = session.api().get_track(&id).await.map_err(api_error)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&track)?)?;
        }

        Command::Request { method, path } => {
            let body = session
                .api()
                .request(&path, RequestOptions::new(method))
                .await
                .map_err(api_error)?;
            match body {
                Some(ApiBody::Json(value)) => {
                    writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?
                }
                Some(ApiBody::Text(text)) => writeln!(out, "{text}")?,
                None => {}
            }
        }

        Command::Logout => {
            session.tokens(None).logout()?;
            writeln!(out, "signed out")?;
        }
    }
    Ok(())
}

/// Point the user at `login` when the failure means they're signed out.
fn api_error(e: spotify_api::Error) -> anyhow::Error {
    if e.is_unauthenticated() {
        anyhow::anyhow!("{e}; run `spotify-session login` to sign in")
    } else {
        e.into()
    }
}

fn format_ms(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}
