//! Response shapes for the endpoints the convenience wrappers cover
//!
//! Only the fields the UI reads are modeled; everything else in the payload
//! is ignored. Fields Spotify documents as nullable are `Option`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Image {
    pub url: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

/// `GET /me`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    pub id: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// `premium`, `free`, ...
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artist {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Album {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub release_date: Option<String>,
}

/// `GET /tracks/{id}`, and the `item` of playback responses.
///
/// Podcast episodes also land here; they have no artists or album.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Track {
    pub id: Option<String>,
    pub name: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Option<Album>,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub uri: Option<String>,
}

impl Track {
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Largest album image, for cover art.
    pub fn cover(&self) -> Option<&Image> {
        self.album
            .as_ref()?
            .images
            .iter()
            .max_by_key(|i| i.width.unwrap_or(0))
    }
}

/// `GET /me/player/currently-playing`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CurrentlyPlaying {
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<u64>,
    /// `track`, `episode`, `ad`, `unknown`
    #[serde(default)]
    pub currently_playing_type: Option<String>,
    #[serde(default)]
    pub item: Option<Track>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Device {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub volume_percent: Option<u32>,
}

/// `GET /me/player`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackState {
    #[serde(default)]
    pub device: Option<Device>,
    pub is_playing: bool,
    #[serde(default)]
    pub shuffle_state: bool,
    /// `off`, `track`, `context`
    #[serde(default)]
    pub repeat_state: Option<String>,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub item: Option<Track>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currently_playing_track() {
        let json = serde_json::json!({
            "timestamp": 1700000000000u64,
            "progress_ms": 42000,
            "is_playing": true,
            "currently_playing_type": "track",
            "item": {
                "id": "3n3Ppam7vgaVa1iaRUc9Lp",
                "name": "Mr. Brightside",
                "duration_ms": 222973,
                "explicit": false,
                "artists": [{"id": "0C0XlULifJtAgn6ZNCW2eu", "name": "The Killers"}],
                "album": {
                    "id": "4OHNH3sDzIxnmUADXzv2kT",
                    "name": "Hot Fuss",
                    "images": [
                        {"url": "https://i.scdn.co/image/small", "height": 64, "width": 64},
                        {"url": "https://i.scdn.co/image/large", "height": 640, "width": 640}
                    ]
                }
            }
        });
        let playing: CurrentlyPlaying = serde_json::from_value(json).unwrap();
        let track = playing.item.unwrap();
        assert_eq!(track.artist_names(), "The Killers");
        assert_eq!(track.cover().unwrap().url, "https://i.scdn.co/image/large");
    }

    #[test]
    fn episode_without_artists_parses() {
        let json = serde_json::json!({
            "is_playing": false,
            "currently_playing_type": "episode",
            "item": {"id": "ep1", "name": "Episode 1", "duration_ms": 1000, "show": {}}
        });
        let playing: CurrentlyPlaying = serde_json::from_value(json).unwrap();
        let item = playing.item.unwrap();
        assert_eq!(item.artist_names(), "");
        assert!(item.cover().is_none());
    }

    #[test]
    fn playback_state_device_type_renamed() {
        let json = serde_json::json!({
            "device": {"id": "d1", "name": "Kitchen", "type": "Speaker", "is_active": true, "volume_percent": 40},
            "is_playing": true,
            "shuffle_state": true,
            "repeat_state": "context",
            "item": null
        });
        let state: PlaybackState = serde_json::from_value(json).unwrap();
        let device = state.device.unwrap();
        assert_eq!(device.device_type, "Speaker");
        assert_eq!(device.volume_percent, Some(40));
        assert!(state.item.is_none());
    }
}
