//! Collaborator seams consumed by the playback controller
//!
//! The controller talks to its collaborators through traits so the appliance
//! wiring (real pipeline, SSE distribution, OS mixer commands) and the test
//! harness (scripted mocks) are interchangeable.

use crate::error::Result;
use async_trait::async_trait;

/// The audio pipeline as seen by the controller.
///
/// At most one session is active; `play` must only be called after the
/// previous session was stopped (the controller's restart path always stops
/// first).
#[async_trait]
pub trait Player: Send + Sync {
    /// Start a new session for the given stream URL.
    ///
    /// Blocks until the stream is connected, the decoder has determined the
    /// stream parameters, and the output sink is running — or returns the
    /// setup error with no background task started.
    async fn play(&self, url: &str) -> Result<()>;

    /// Stop the active session, blocking until the background task has fully
    /// exited and all resources are released. No-op without a session.
    async fn stop(&self);

    /// Toggle the pause gate of the active session. No-op without a session.
    async fn pause(&self) -> Result<()>;
}

/// Distribution side for serialized state snapshots.
///
/// Implementations must not block: publication happens while the controller
/// holds its state lock so snapshots leave in commit order.
pub trait StatePublisher: Send + Sync {
    fn publish_state(&self, payload: Vec<u8>);
}

/// External OS mixer control.
#[async_trait]
pub trait VolumeControl: Send + Sync {
    async fn mute(&self) -> Result<()>;
    async fn unmute(&self) -> Result<()>;
}
