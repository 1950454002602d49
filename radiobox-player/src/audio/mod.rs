//! Audio pipeline
//!
//! ICY stream reader, MP3 decode, audio device output and the session
//! pipeline driving them. All blocking I/O and decode work runs on a
//! dedicated blocking thread; the async side only starts, stops and pauses
//! sessions.

pub mod decode;
pub mod gate;
pub mod icy;
pub mod output;
pub mod pipeline;

pub use pipeline::StreamPipeline;
