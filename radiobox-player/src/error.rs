//! Error types for radiobox-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the radiobox-player module
#[derive(Error, Debug)]
pub enum Error {
    /// Stream connection errors (HTTP open, ICY handshake)
    #[error("Stream connection error: {0}")]
    Connect(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Playback session errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// External volume control command errors
    #[error("Volume control error: {0}")]
    VolumeControl(String),

    /// Socket and file I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using radiobox-player Error
pub type Result<T> = std::result::Result<T, Error>;
