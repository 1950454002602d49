//! Pipeline events
//!
//! The stream pipeline never calls into the controller directly. It emits
//! events over an unbounded mpsc channel; the controller consumes them on its
//! own task. This keeps ownership one-way (controller → pipeline for
//! commands, pipeline → controller for notifications) and means event
//! emission never blocks the decode loop.

/// Notifications from the active pipeline session to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The embedded stream metadata reported a new track title.
    ///
    /// Fired from the stream reader whenever the title changes; independent
    /// of the decode/output cadence and of pause state.
    TrackChanged(String),

    /// The session ended on a read error or end-of-stream (not a clean stop).
    ///
    /// Emitted after the session's resources are fully released.
    Disconnected,
}
