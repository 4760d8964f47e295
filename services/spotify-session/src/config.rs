//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults.
//! Only the public client id is configured; there is no client secret
//! anywhere in a PKCE setup.

use serde::Deserialize;
use spotify_auth::AuthConfig;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub spotify: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Where the credential store lives
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
        }
    }
}

/// Outbound HTTP settings, shared by the token endpoint and API calls
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("spotify-credentials.json")
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// `SPOTIFY_CLIENT_ID` and `SPOTIFY_REDIRECT_URI` replace the file values
    /// when set.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(client_id) = std::env::var("SPOTIFY_CLIENT_ID") {
            config.spotify.client_id = client_id;
        }
        if let Ok(redirect_uri) = std::env::var("SPOTIFY_REDIRECT_URI") {
            config.spotify.redirect_uri = redirect_uri;
        }

        config
            .spotify
            .validate()
            .map_err(|e| common::Error::Config(e.to_string()))?;

        if config.http.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("spotify-session.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that read or mutate environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn clear_overlay() {
        unsafe {
            remove_env("SPOTIFY_CLIENT_ID");
            remove_env("SPOTIFY_REDIRECT_URI");
        }
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn valid_toml() -> &'static str {
        r#"
[spotify]
client_id = "file-client"
redirect_uri = "http://127.0.0.1:8888/callback"

[storage]
credentials_path = "/var/lib/spotify-session/credentials.json"
"#
    }

    #[test]
    fn test_load_valid_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlay();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.spotify.client_id, "file-client");
        assert_eq!(config.spotify.redirect_uri, "http://127.0.0.1:8888/callback");
        assert_eq!(
            config.spotify.token_endpoint,
            "https://accounts.spotify.com/api/token"
        );
        assert_eq!(config.spotify.scopes.len(), 4);
        assert_eq!(
            config.storage.credentials_path,
            PathBuf::from("/var/lib/spotify-session/credentials.json")
        );
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_sections_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlay();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[spotify]
client_id = "abc"
redirect_uri = "https://app.example/callback"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.storage.credentials_path,
            PathBuf::from("spotify-credentials.json")
        );
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");

        let result = Config::load(&path);
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlay();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[spotify]
client_id = "abc"
redirect_uri = "https://app.example/callback"

[http]
timeout_secs = 0
"#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"), "got: {err}");
    }

    #[test]
    fn test_missing_client_id_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overlay();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[spotify]
redirect_uri = "https://app.example/callback"
"#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("client_id"), "got: {err}");
    }

    #[test]
    fn test_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe {
            set_env("SPOTIFY_CLIENT_ID", "env-client");
            set_env("SPOTIFY_REDIRECT_URI", "http://localhost:3000/callback");
        }
        let config = Config::load(&path);
        clear_overlay();

        let config = config.unwrap();
        assert_eq!(config.spotify.client_id, "env-client");
        assert_eq!(config.spotify.redirect_uri, "http://localhost:3000/callback");
    }

    #[test]
    fn test_env_supplies_client_id() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[spotify]
redirect_uri = "https://app.example/callback"
"#,
        );

        unsafe { set_env("SPOTIFY_CLIENT_ID", "env-only") };
        let config = Config::load(&path);
        clear_overlay();

        assert_eq!(config.unwrap().spotify.client_id, "env-only");
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/path.toml"));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("spotify-session.toml"));
    }
}
