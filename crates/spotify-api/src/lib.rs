//! Authenticated access to the Spotify Web API
//!
//! [`ApiClient`] sits on top of a `spotify_auth::TokenManager`: every call
//! makes sure the token is fresh, attaches it, and turns the response into
//! an [`ApiBody`] or a typed model. Errors carry enough for the UI to decide
//! whether to show the signed-out state (see [`Error::is_unauthenticated`]).

pub mod client;
pub mod error;
pub mod models;

pub use client::{ApiBody, ApiClient, RequestBody, RequestOptions};
pub use error::{Error, Result};
pub use models::{Album, Artist, CurrentlyPlaying, Device, Image, PlaybackState, Profile, Track};
