//! Types shared by the Spotify session crates

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};
