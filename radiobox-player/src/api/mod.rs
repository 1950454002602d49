//! HTTP API
//!
//! Read-only surface: a health probe and the SSE state-snapshot stream that
//! display frontends subscribe to. Control commands arrive over the unix
//! socket, not HTTP.

pub mod server;
pub mod sse;

pub use server::create_router;
pub use sse::SsePublisher;
