//! Playback controller
//!
//! Top-level owner of the device state. Serializes all control commands and
//! inbound pipeline events against a single exclusive lock, decides whether a
//! track-change event is surfaced immediately or deferred, and publishes a
//! state snapshot on every committed transition.
//!
//! Concurrency model: every command method, every pipeline event, and every
//! reconciliation tick takes the one `tokio::sync::Mutex` guarding the device
//! state, the channel index, the pause bookkeeping and the deferral queue.
//! The mute/unmute external command runs before the lock is taken; snapshot
//! publication is a non-blocking broadcast send and happens under the lock so
//! snapshots leave in commit order.

use crate::error::Result;
use crate::playback::deferral::DeferralQueue;
use crate::playback::events::PipelineEvent;
use crate::playback::types::{Player, StatePublisher, VolumeControl};
use radiobox_common::{Channel, DeviceState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Timing knobs for the controller's background loops.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Delay between reconnect attempts after a stream disconnect
    pub reconnect_interval: Duration,
    /// Cadence of the deferred-track reconciliation loop
    pub reconcile_interval: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            reconnect_interval: Duration::from_secs(1),
            reconcile_interval: Duration::from_secs(1),
        }
    }
}

/// Everything guarded by the controller's exclusive lock.
struct ControllerInner {
    state: DeviceState,
    /// Current channel index; `None` only before the first power-on
    channel_idx: Option<usize>,
    /// Instant the current pause began (set on pause, taken on resume)
    pause_begin: Option<Instant>,
    /// Cumulative elapsed-pause time for this power-on session; added to the
    /// delivery instant of every newly deferred track
    pause_delay: Duration,
    /// True once a pause has occurred in this power-on session; while set,
    /// track changes route through the deferral queue even after resume
    pause_seen: bool,
    deferred: DeferralQueue,
}

/// The playback-state synchronization engine.
pub struct PlaybackController {
    channels: Vec<Channel>,
    player: Arc<dyn Player>,
    publisher: Arc<dyn StatePublisher>,
    volume: Arc<dyn VolumeControl>,
    opts: ControllerOptions,
    inner: Mutex<ControllerInner>,
    /// The reconciliation loop is started at most once per process lifetime
    /// and reused across every subsequent pause/resume cycle.
    reconciler_started: AtomicBool,
    /// Process shutdown flag; the reconciliation and reconnect loops observe
    /// it and terminate.
    shutting_down: AtomicBool,
}

impl PlaybackController {
    pub fn new(
        channels: Vec<Channel>,
        player: Arc<dyn Player>,
        publisher: Arc<dyn StatePublisher>,
        volume: Arc<dyn VolumeControl>,
        opts: ControllerOptions,
    ) -> Arc<Self> {
        assert!(!channels.is_empty(), "controller requires at least one channel");
        Arc::new(Self {
            channels,
            player,
            publisher,
            volume,
            opts,
            inner: Mutex::new(ControllerInner {
                state: DeviceState::default(),
                channel_idx: None,
                pause_begin: None,
                pause_delay: Duration::ZERO,
                pause_seen: false,
                deferred: DeferralQueue::new(),
            }),
            reconciler_started: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
        })
    }

    /// Consume pipeline events on a dedicated task.
    pub fn spawn_event_loop(
        self: &Arc<Self>,
        mut events: mpsc::UnboundedReceiver<PipelineEvent>,
    ) -> JoinHandle<()> {
        let ctl = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    PipelineEvent::TrackChanged(title) => ctl.on_track_changed(title).await,
                    PipelineEvent::Disconnected => ctl.on_disconnected(),
                }
            }
            debug!("pipeline event channel closed");
        })
    }

    /// Signal process shutdown: background loops terminate at their next
    /// wake-up. Commands already in flight still complete.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Current state snapshot (for the SSE initial event and tests).
    pub async fn state(&self) -> DeviceState {
        self.inner.lock().await.state.clone()
    }

    /// Current channel index; `None` before the first power-on.
    pub async fn channel_index(&self) -> Option<usize> {
        self.inner.lock().await.channel_idx
    }

    /// Toggle device power.
    ///
    /// Power-on is all-or-nothing: either the pipeline starts and power
    /// becomes true, or the failure is logged and nothing changes. Power-off
    /// stops the pipeline, discards deferred tracks and resets the pause
    /// bookkeeping.
    pub async fn power(&self) {
        let mut inner = self.inner.lock().await;

        if inner.channel_idx.is_none() {
            inner.channel_idx = Some(0);
        }

        if !inner.state.power {
            if let Err(e) = self.restart_locked(&mut inner).await {
                error!("failed to change power state: {}", e);
                return;
            }
        } else {
            inner.pause_seen = false;
            inner.pause_delay = Duration::ZERO;
            inner.pause_begin = None;
            inner.deferred.clear();
            self.player.stop().await;
        }

        inner.state.power = !inner.state.power;
        info!("power {}", if inner.state.power { "on" } else { "off" });
        self.publish(&inner.state);
    }

    /// Toggle pause.
    ///
    /// First call records the pause start and arms the reconciliation loop;
    /// the second call shifts every deferred entry by the elapsed pause
    /// duration and adds it to the cumulative pause-delay accumulator.
    pub async fn pause(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;

        if let Err(e) = self.player.pause().await {
            error!("failed to toggle pause: {}", e);
            return;
        }

        if !inner.state.pause {
            self.spawn_reconciler();
            inner.pause_begin = Some(Instant::now());
            inner.state.pause = true;
            inner.pause_seen = true;
            debug!("paused");
        } else {
            let elapsed = inner
                .pause_begin
                .take()
                .map(|begin| begin.elapsed())
                .unwrap_or_default();
            inner.deferred.shift_forward(elapsed);
            inner.pause_delay += elapsed;
            inner.state.pause = false;
            debug!("resumed after {:?} (cumulative delay {:?})", elapsed, inner.pause_delay);
        }

        self.publish(&inner.state);
    }

    /// Toggle output mute via the external mixer command.
    ///
    /// The command runs before the lock is taken; on failure the mute flag is
    /// left unchanged. While muted, track changes keep updating the state but
    /// no snapshot is published — the publish after a successful unmute
    /// therefore carries the latest suppressed track.
    pub async fn mute(&self) {
        let target = {
            let inner = self.inner.lock().await;
            !inner.state.mute
        };

        let result = if target {
            self.volume.mute().await
        } else {
            self.volume.unmute().await
        };
        if let Err(e) = result {
            error!("failed to mute/unmute: {}", e);
            return;
        }

        let mut inner = self.inner.lock().await;
        inner.state.mute = target;
        debug!("mute {}", target);
        self.publish(&inner.state);
    }

    /// Advance to the next channel, wrapping past the last back to 0.
    ///
    /// The index advance is committed even if the pipeline restart fails.
    pub async fn next_channel(&self) {
        let mut inner = self.inner.lock().await;
        let len = self.channels.len();
        let idx = match inner.channel_idx {
            Some(i) => (i + 1) % len,
            None => 0,
        };
        inner.channel_idx = Some(idx);

        if let Err(e) = self.restart_locked(&mut inner).await {
            error!("failed to change channel: {} ({})", e, idx);
        }
    }

    /// Retreat to the previous channel, wrapping before 0 to the last index.
    pub async fn prev_channel(&self) {
        let mut inner = self.inner.lock().await;
        let len = self.channels.len();
        let idx = match inner.channel_idx {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        inner.channel_idx = Some(idx);

        if let Err(e) = self.restart_locked(&mut inner).await {
            error!("failed to change channel: {} ({})", e, idx);
        }
    }

    /// Force the first configured channel.
    pub async fn default_channel(&self) {
        let mut inner = self.inner.lock().await;
        inner.channel_idx = Some(0);

        if let Err(e) = self.restart_locked(&mut inner).await {
            error!("failed to change channel: {} (0)", e);
        }
    }

    /// Restart the pipeline on the current channel.
    ///
    /// Stops any active session first (strict barrier), discards deferred
    /// tracks so a stale title from the previous stream can never surface,
    /// then starts the new session. The state's channel reference is only
    /// updated on success.
    async fn restart_locked(&self, inner: &mut ControllerInner) -> Result<()> {
        self.player.stop().await;
        inner.deferred.clear();

        let idx = inner.channel_idx.unwrap_or(0);
        let channel = &self.channels[idx];
        self.player.play(&channel.url).await?;

        info!("playing channel {} ({})", channel.title, channel.url);
        inner.state.channel = Some(channel.clone());
        Ok(())
    }

    /// Handle a track-change notification from the pipeline.
    pub async fn on_track_changed(&self, title: String) {
        let mut inner = self.inner.lock().await;

        if !inner.state.pause && !inner.pause_seen {
            if let Some(idx) = inner.channel_idx {
                inner.state.channel = Some(self.channels[idx].clone());
            }
            inner.state.track = title;
            if !inner.state.mute {
                self.publish(&inner.state);
            }
        } else {
            let due_at = Instant::now() + inner.pause_delay;
            debug!("deferring track {:?} (delay {:?})", title, inner.pause_delay);
            inner.deferred.push(due_at, title);
        }
    }

    /// Handle a disconnect: retry the pipeline restart on the current channel
    /// until one attempt succeeds.
    ///
    /// Unbounded by design (the appliance is always-on); the interval is
    /// configurable and the loop observes the shutdown flag.
    pub fn on_disconnected(self: &Arc<Self>) {
        warn!("stream disconnected, starting reconnect loop");
        let ctl = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(ctl.opts.reconnect_interval).await;
                if ctl.is_shutting_down() {
                    info!("reconnect abandoned: shutting down");
                    break;
                }
                let mut inner = ctl.inner.lock().await;
                match ctl.restart_locked(&mut inner).await {
                    Ok(()) => {
                        info!("stream reconnected");
                        break;
                    }
                    Err(e) => error!("reconnect attempt failed: {}", e),
                }
            }
        });
    }

    /// Start the deferred-track reconciliation loop, at most once per process.
    fn spawn_reconciler(self: &Arc<Self>) {
        if self.reconciler_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let ctl = Arc::clone(self);
        tokio::spawn(async move {
            debug!("deferral reconciler started");
            let mut tick = interval(ctl.opts.reconcile_interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                if ctl.is_shutting_down() {
                    debug!("deferral reconciler stopping");
                    break;
                }

                let mut inner = ctl.inner.lock().await;
                if inner.state.pause {
                    continue;
                }

                let due = inner.deferred.take_due(Instant::now());
                for entry in due {
                    if let Some(idx) = inner.channel_idx {
                        inner.state.channel = Some(ctl.channels[idx].clone());
                    }
                    debug!("delivering deferred track {:?}", entry.title);
                    inner.state.track = entry.title;
                    ctl.publish(&inner.state);
                }
            }
        });
    }

    /// Serialize and hand a snapshot to the publisher.
    ///
    /// A serialization failure is logged and the snapshot dropped; the
    /// internal state is unaffected.
    fn publish(&self, state: &DeviceState) {
        match state.to_snapshot() {
            Ok(payload) => self.publisher.publish_state(payload),
            Err(e) => error!("failed to serialize state snapshot: {}", e),
        }
    }
}
