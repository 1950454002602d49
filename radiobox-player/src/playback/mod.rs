//! Playback coordination
//!
//! The controller serializes control commands and pipeline events against the
//! device state; the deferral queue buffers track changes that arrive while
//! playback is paused.

pub mod controller;
pub mod deferral;
pub mod events;
pub mod types;

pub use controller::{ControllerOptions, PlaybackController};
pub use events::PipelineEvent;
pub use types::{Player, StatePublisher, VolumeControl};
