//! Device state and channel types
//!
//! `DeviceState` is the snapshot published to subscribers on every committed
//! transition. Its serialized shape is part of the external contract and must
//! not change field names:
//!
//! ```json
//! { "power": false, "mute": false, "pause": false, "track": "",
//!   "channel": { "title": "...", "url": "...", "img": "..." } }
//! ```

use serde::{Deserialize, Serialize};

/// One pre-configured radio channel.
///
/// Channels are immutable after configuration load; the controller holds an
/// ordered list of them and a current index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Human-readable channel name
    pub title: String,
    /// Stream URL (ICY/SHOUTcast endpoint)
    pub url: String,
    /// Artwork reference for the display side
    pub img: String,
}

/// The device state snapshot.
///
/// Mutated only by the playback controller while holding its exclusive lock;
/// never persisted, reconstructed fresh at process start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Device power (false until the first successful power-on)
    pub power: bool,
    /// Output mute flag (audio is muted at the OS mixer, tracking continues)
    pub mute: bool,
    /// Logical pause flag
    pub pause: bool,
    /// Currently playing track title, as reported by stream metadata
    #[serde(default)]
    pub track: String,
    /// Currently selected channel (None before the first power-on)
    pub channel: Option<Channel>,
}

impl DeviceState {
    /// Serialize the snapshot to the wire format.
    pub fn to_snapshot(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_shape_matches_contract() {
        let state = DeviceState {
            power: true,
            mute: false,
            pause: true,
            track: "Artist - Song".to_string(),
            channel: Some(Channel {
                title: "Jazz FM".to_string(),
                url: "http://example.com/stream".to_string(),
                img: "jazz.png".to_string(),
            }),
        };

        let bytes = state.to_snapshot().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["power"], true);
        assert_eq!(value["mute"], false);
        assert_eq!(value["pause"], true);
        assert_eq!(value["track"], "Artist - Song");
        assert_eq!(value["channel"]["title"], "Jazz FM");
        assert_eq!(value["channel"]["url"], "http://example.com/stream");
        assert_eq!(value["channel"]["img"], "jazz.png");
    }

    #[test]
    fn fresh_state_has_no_channel() {
        let state = DeviceState::default();
        let value: serde_json::Value =
            serde_json::from_slice(&state.to_snapshot().unwrap()).unwrap();

        assert_eq!(value["power"], false);
        assert!(value["channel"].is_null());
    }
}
