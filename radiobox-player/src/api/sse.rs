//! Server-Sent Events state distribution
//!
//! Every committed state transition is broadcast as one SSE `state` event
//! carrying the full JSON snapshot. New subscribers immediately receive the
//! most recent snapshot so they never start blank.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// Slow consumers are dropped behind rather than backpressuring the
/// controller.
const CHANNEL_CAPACITY: usize = 100;

/// Fan-out point for serialized state snapshots.
pub struct SsePublisher {
    tx: broadcast::Sender<String>,
    /// Last published snapshot, replayed to new subscribers
    latest: RwLock<Option<String>>,
}

impl Default for SsePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl SsePublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            latest: RwLock::new(None),
        }
    }

    /// Most recent snapshot, if any state has been published yet.
    pub fn latest(&self) -> Option<String> {
        self.latest.read().unwrap().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl crate::playback::StatePublisher for SsePublisher {
    fn publish_state(&self, payload: Vec<u8>) {
        let json = match String::from_utf8(payload) {
            Ok(json) => json,
            Err(e) => {
                warn!("discarding non-utf8 state snapshot: {}", e);
                return;
            }
        };
        *self.latest.write().unwrap() = Some(json.clone());
        // Err means no subscribers, which is fine.
        if let Ok(n) = self.tx.send(json) {
            debug!("state snapshot sent to {} subscriber(s)", n);
        }
    }
}

/// GET /state/events
pub async fn event_stream(
    State(publisher): State<Arc<SsePublisher>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("new SSE client connected");

    // Subscribe before reading the latest snapshot so a transition landing
    // in between is not lost (it may be seen twice, never skipped).
    let rx = publisher.subscribe();
    let initial = publisher.latest();

    let replay = stream::iter(
        initial
            .into_iter()
            .map(|json| Ok(Event::default().event("state").data(json))),
    );

    let live = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(json) => Some(Ok(Event::default().event("state").data(json))),
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                warn!("SSE client lagged, skipped {} snapshot(s)", n);
                None
            }
        }
    });

    Sse::new(replay.chain(live)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::StatePublisher;

    #[tokio::test]
    async fn publish_stores_latest_and_broadcasts() {
        let publisher = SsePublisher::new();
        let mut rx = publisher.subscribe();

        publisher.publish_state(b"{\"power\":true}".to_vec());

        assert_eq!(publisher.latest().unwrap(), "{\"power\":true}");
        assert_eq!(rx.recv().await.unwrap(), "{\"power\":true}");
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_fail() {
        let publisher = SsePublisher::new();
        publisher.publish_state(b"{}".to_vec());
        assert_eq!(publisher.latest().unwrap(), "{}");
    }

    #[tokio::test]
    async fn latest_reflects_most_recent_snapshot() {
        let publisher = SsePublisher::new();
        publisher.publish_state(b"{\"track\":\"a\"}".to_vec());
        publisher.publish_state(b"{\"track\":\"b\"}".to_vec());
        assert_eq!(publisher.latest().unwrap(), "{\"track\":\"b\"}");
    }
}
