//! Audio device output
//!
//! Plays interleaved f32 samples from a lock-free ring buffer on the default
//! output device. The cpal stream is `!Send`, so the output must be opened,
//! used and closed on the one blocking thread running the session.

use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use ringbuf::{
    traits::{Consumer, Producer},
    HeapCons, HeapProd,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Running output stream on the default device.
pub struct AudioOutput {
    stream: Stream,
}

impl AudioOutput {
    /// Open the default output device at the stream's native rate and
    /// channel count, pulling samples from `consumer`. The stream starts
    /// playing immediately; the ring buffer underruns to silence.
    pub fn open(sample_rate: u32, channels: usize, mut consumer: HeapCons<f32>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("no default output device".to_string()))?;

        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        debug!("output device: {} ({} Hz, {} ch)", name, sample_rate, channels);

        let config = StreamConfig {
            channels: channels as u16,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for sample in data.iter_mut() {
                        // Underrun plays silence rather than stalling.
                        *sample = consumer.try_pop().unwrap_or(0.0);
                    }
                },
                |e| error!("audio output stream error: {}", e),
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("failed to start stream: {}", e)))?;

        Ok(Self { stream })
    }

    /// Stop and release the device.
    pub fn close(self) {
        if let Err(e) = self.stream.pause() {
            warn!("failed to pause output stream: {}", e);
        }
        debug!("audio output closed");
    }
}

/// Push a decoded chunk into the ring buffer, waiting for the output side to
/// drain when full. Returns `false` if `run` was cleared while waiting.
pub fn push_samples(producer: &mut HeapProd<f32>, samples: &[f32], run: &AtomicBool) -> bool {
    let mut offset = 0;
    while offset < samples.len() {
        if !run.load(Ordering::SeqCst) {
            return false;
        }
        match producer.try_push(samples[offset]) {
            Ok(()) => offset += 1,
            Err(_) => thread::sleep(Duration::from_millis(5)),
        }
    }
    true
}
