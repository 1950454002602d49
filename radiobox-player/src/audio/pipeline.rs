//! Stream pipeline
//!
//! One session at a time: connect to the channel's ICY stream, decode MP3 on
//! a blocking thread, feed the audio device through a ring buffer. The async
//! side (the controller) starts, stops and pauses sessions; notifications
//! flow back over the event channel.
//!
//! `play` blocks until the session is fully set up (connected, probed,
//! device running) or failed, so a connect error is reported synchronously
//! and never as a background disconnect.

use crate::audio::decode::StreamDecoder;
use crate::audio::gate::PauseGate;
use crate::audio::icy;
use crate::audio::output::{self, AudioOutput};
use crate::error::{Error, Result};
use crate::playback::events::PipelineEvent;
use crate::playback::types::Player;
use async_trait::async_trait;
use ringbuf::{traits::Split, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

struct Session {
    /// Cleared to make the decode loop exit at its next boundary
    run: Arc<AtomicBool>,
    gate: Arc<PauseGate>,
    handle: JoinHandle<()>,
}

/// The audio pipeline behind the controller's [`Player`] seam.
pub struct StreamPipeline {
    events: mpsc::UnboundedSender<PipelineEvent>,
    session: Mutex<Option<Session>>,
}

impl StreamPipeline {
    pub fn new(events: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        Self {
            events,
            session: Mutex::new(None),
        }
    }

    /// Stop the active session and wait for its thread to exit.
    async fn stop_session(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            session.run.store(false, Ordering::SeqCst);
            // A paused session is parked on the gate; open it so the loop
            // can observe the cleared run flag.
            session.gate.force_open();
            if let Err(e) = session.handle.await {
                error!("pipeline session panicked: {}", e);
            }
            debug!("pipeline session stopped");
        }
    }
}

#[async_trait]
impl Player for StreamPipeline {
    async fn play(&self, url: &str) -> Result<()> {
        let mut slot = self.session.lock().await;
        if slot.is_some() {
            return Err(Error::Playback(
                "session already active, stop it first".to_string(),
            ));
        }

        let run = Arc::new(AtomicBool::new(true));
        let gate = Arc::new(PauseGate::new());
        let (ready_tx, ready_rx) = oneshot::channel();

        let url = url.to_string();
        let events = self.events.clone();
        let run_flag = Arc::clone(&run);
        let gate_ref = Arc::clone(&gate);
        let handle = tokio::task::spawn_blocking(move || {
            run_session(url, events, run_flag, gate_ref, ready_tx);
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                *slot = Some(Session { run, gate, handle });
                Ok(())
            }
            Ok(Err(e)) => {
                // Setup failed; the blocking task has already returned.
                let _ = handle.await;
                Err(e)
            }
            Err(_) => {
                let _ = handle.await;
                Err(Error::Playback("session setup aborted".to_string()))
            }
        }
    }

    async fn stop(&self) {
        self.stop_session().await;
    }

    async fn pause(&self) -> Result<()> {
        let slot = self.session.lock().await;
        if let Some(session) = slot.as_ref() {
            let paused = session.gate.toggle();
            debug!("pause gate {}", if paused { "armed" } else { "opened" });
        }
        Ok(())
    }
}

/// Session body, run on a blocking thread.
///
/// Setup result is reported through `ready_tx`; after a successful setup the
/// loop runs until the stream ends, a read fails, or `run` is cleared.
/// Teardown order matters: the decoder owns the network connection and is
/// released before the output device. A `Disconnected` event is only emitted
/// for sessions that did not end through a clean stop, and only after all
/// resources are released.
fn run_session(
    url: String,
    events: mpsc::UnboundedSender<PipelineEvent>,
    run: Arc<AtomicBool>,
    gate: Arc<PauseGate>,
    ready_tx: oneshot::Sender<Result<()>>,
) {
    let title_events = events.clone();
    let on_title = Box::new(move |title: &str| {
        let _ = title_events.send(PipelineEvent::TrackChanged(title.to_string()));
    });

    let setup = || -> Result<(StreamDecoder, AudioOutput, ringbuf::HeapProd<f32>)> {
        let reader = icy::open(&url, on_title)?;
        let decoder = StreamDecoder::new(reader)?;

        // One second of audio between decode and output.
        let capacity = decoder.sample_rate() as usize * decoder.channels();
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();

        let output = AudioOutput::open(decoder.sample_rate(), decoder.channels(), consumer)?;
        Ok((decoder, output, producer))
    };

    let (mut decoder, output, mut producer) = match setup() {
        Ok(parts) => {
            let _ = ready_tx.send(Ok(()));
            parts
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let mut disconnect = false;
    while run.load(Ordering::SeqCst) {
        match decoder.next_chunk() {
            Ok(Some(samples)) => {
                gate.wait_if_armed();
                if !run.load(Ordering::SeqCst) {
                    break;
                }
                if !output::push_samples(&mut producer, &samples, &run) {
                    break;
                }
            }
            Ok(None) => {
                info!("stream ended");
                disconnect = true;
                break;
            }
            Err(e) => {
                error!("stream read failed: {}", e);
                disconnect = true;
                break;
            }
        }
    }

    decoder.close();
    output.close();

    if disconnect && run.load(Ordering::SeqCst) {
        let _ = events.send(PipelineEvent::Disconnected);
    }
}
