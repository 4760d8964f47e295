//! Authenticated Web API client
//!
//! Attaches the bearer token, refreshes once up front when the stored token
//! is stale, and normalizes response bodies. A 401 drops the stored access
//! token so the next call re-authorizes, but the failed call is never
//! retried.

use std::str::FromStr;
use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use spotify_auth::TokenManager;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::models::{CurrentlyPlaying, PlaybackState, Profile, Track};

/// A successful, non-empty response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    Json(Value),
    Text(String),
}

impl ApiBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiBody::Json(v) => Some(v),
            ApiBody::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ApiBody::Text(t) => Some(t),
            ApiBody::Json(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Serialized and sent as `application/json`
    Json(Value),
    /// Sent as-is
    Raw(String),
}

/// Per-call options. `RequestOptions::default()` is a bare GET.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn raw(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Raw(body.into()));
        self
    }
}

/// Spotify error envelope: `{"error":{"status":401,"message":"..."}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorObject,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    message: String,
}

pub struct ApiClient {
    tokens: Arc<TokenManager>,
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Client against the API base URL from the token manager's config,
    /// sharing its HTTP connection pool.
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        let http = tokens.http_client().clone();
        let base_url = tokens.config().api_base_url.clone();
        Self {
            tokens,
            http,
            base_url,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Issue an authenticated request against `base_url + path`.
    ///
    /// Returns `None` for 204 or an empty body, `Json` when the response
    /// declares a JSON content type, `Text` otherwise.
    #[instrument(skip_all, fields(method = %options.method, path = %path))]
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Option<ApiBody>> {
        if !self.tokens.ensure_fresh().await {
            debug!("no usable token, not sending request");
            return Err(Error::NotAuthenticated);
        }
        let bearer = self.tokens.current_token().ok_or(Error::NotAuthenticated)?;

        let url = if path.starts_with('/') {
            format!("{}{}", self.base_url.trim_end_matches('/'), path)
        } else {
            format!("{}/{}", self.base_url.trim_end_matches('/'), path)
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = match HeaderName::from_str(name) {
                Ok(n) => n,
                Err(e) => {
                    warn!(header = %name, error = %e, "skipping invalid header name");
                    continue;
                }
            };
            let value = match HeaderValue::from_str(value) {
                Ok(v) => v,
                Err(e) => {
                    warn!(header = %name, error = %e, "skipping invalid header value");
                    continue;
                }
            };
            headers.insert(name, value);
        }
        let mut auth = HeaderValue::from_str(&bearer.header_value())
            .map_err(|_| Error::InvalidRequest("stored token is not a valid header value".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let mut request = self.http.request(options.method, &url);
        match options.body {
            Some(RequestBody::Json(value)) => {
                let body = serde_json::to_string(&value)
                    .map_err(|e| Error::InvalidRequest(format!("serializing JSON body: {e}")))?;
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                request = request.body(body);
            }
            Some(RequestBody::Raw(body)) => request = request.body(body),
            None => {}
        }

        let response = request
            .headers(headers)
            .send()
            .await
            .map_err(|e| Error::Http(format!("API request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                if let Err(e) = self.tokens.invalidate_access_token() {
                    warn!(error = %e, "failed to drop rejected access token");
                }
            }
            let body = response.text().await.unwrap_or_default();
            let reason = error_reason(status, &body);
            warn!(status = status.as_u16(), %reason, "API request rejected");
            return Err(Error::Api {
                status: status.as_u16(),
                reason,
            });
        }

        let json = is_json(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("reading API response: {e}")))?;

        if body.is_empty() {
            return Ok(None);
        }
        if json {
            let value = serde_json::from_str(&body)
                .map_err(|e| Error::MalformedResponse(format!("invalid JSON: {e}")))?;
            return Ok(Some(ApiBody::Json(value)));
        }
        Ok(Some(ApiBody::Text(body)))
    }

    /// GET `path` and decode the JSON body into `T`. `None` when there is no body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.request(path, RequestOptions::default()).await? {
            None => Ok(None),
            Some(ApiBody::Json(value)) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| Error::MalformedResponse(format!("unexpected shape for {path}: {e}"))),
            Some(ApiBody::Text(_)) => Err(Error::MalformedResponse(format!(
                "expected JSON from {path}, got text"
            ))),
        }
    }

    pub async fn get_profile(&self) -> Result<Profile> {
        self.get_json("/me")
            .await?
            .ok_or_else(|| Error::MalformedResponse("empty profile response".into()))
    }

    /// `None` when nothing is playing.
    pub async fn get_currently_playing(&self) -> Result<Option<CurrentlyPlaying>> {
        self.get_json("/me/player/currently-playing").await
    }

    /// `None` when no device is active.
    pub async fn get_playback_state(&self) -> Result<Option<PlaybackState>> {
        self.get_json("/me/player").await
    }

    pub async fn get_track(&self, id: &str) -> Result<Track> {
        // Spotify ids are base62
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidRequest(format!("invalid track id: {id:?}")));
        }
        let path = format!("/tracks/{id}");
        self.get_json(&path)
            .await?
            .ok_or_else(|| Error::MalformedResponse("empty track response".into()))
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let essence = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            essence == "application/json" || essence.ends_with("+json")
        })
        .unwrap_or(false)
}

fn error_reason(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        })
}
