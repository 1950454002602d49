//! # RadioBox Player Library (radiobox-player)
//!
//! Playback-state synchronization engine for a single-channel internet-radio
//! appliance.
//!
//! **Purpose:** own exactly one active ICY audio stream at a time, serialize
//! external control commands (power, pause, mute, channel change) against the
//! running decode-and-output pipeline, and publish consistent device-state
//! snapshots to subscribers.
//!
//! **Architecture:** single-session audio pipeline using symphonia + cpal,
//! command dispatch over a unix socket, snapshot distribution over SSE.

pub mod api;
pub mod audio;
pub mod command;
pub mod error;
pub mod playback;
pub mod volume;

pub use error::{Error, Result};
pub use playback::controller::{ControllerOptions, PlaybackController};
