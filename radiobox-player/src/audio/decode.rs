//! MP3 stream decoding
//!
//! Wraps a symphonia format reader + decoder around the live ICY byte
//! stream. Unlike file decoding there is no seeking and no known length; the
//! source is wrapped in `ReadOnlySource` and EOF means the server closed the
//! connection.

use crate::error::{Error, Result};
use std::io::Read;
use std::sync::Mutex;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Adapter giving a `Read + Send` source the `Sync` bound `MediaSource`
/// requires. The decoder owns the source exclusively, so the mutex is never
/// contended.
struct SyncReader<R>(Mutex<R>);

impl<R: Read> Read for SyncReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.get_mut().unwrap().read(buf)
    }
}

/// Incremental decoder over a live MP3 stream.
pub struct StreamDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
}

impl StreamDecoder {
    /// Probe the stream and set up the decoder. Blocks until enough of the
    /// stream has arrived to identify the format.
    pub fn new<R: Read + Send + 'static>(source: R) -> Result<Self> {
        let source = ReadOnlySource::new(SyncReader(Mutex::new(source)));
        let mss = MediaSourceStream::new(Box::new(source), Default::default());

        let mut hint = Hint::new();
        hint.with_extension("mp3");
        hint.mime_type("audio/mpeg");

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("format probe failed: {}", e)))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("no decodable audio track".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params.sample_rate.unwrap_or(44100);
        let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("unsupported codec: {}", e)))?;

        debug!("stream format: {} Hz, {} channel(s)", sample_rate, channels);

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Decode the next chunk of interleaved f32 samples.
    ///
    /// Returns `Ok(None)` when the stream ends. Corrupt packets (common on
    /// live streams, especially right after connect) are logged and skipped.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<f32>>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(Error::Decode(format!("read failed: {}", e))),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => return Ok(Some(interleave_f32(&decoded))),
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("skipping corrupt packet: {}", e);
                    continue;
                }
                Err(e) => return Err(Error::Decode(format!("decode failed: {}", e))),
            }
        }
    }

    /// Release the decoder and its underlying connection.
    pub fn close(self) {
        debug!("decoder closed");
        drop(self);
    }
}

/// Interleave a planar decoded buffer into f32 frames.
fn interleave_f32(buffer: &AudioBufferRef) -> Vec<f32> {
    match buffer {
        AudioBufferRef::F32(buf) => interleave(buf.spec().channels.count(), buf.frames(), |ch, i| {
            buf.chan(ch)[i]
        }),
        AudioBufferRef::S16(buf) => interleave(buf.spec().channels.count(), buf.frames(), |ch, i| {
            buf.chan(ch)[i].into_sample()
        }),
        AudioBufferRef::S32(buf) => interleave(buf.spec().channels.count(), buf.frames(), |ch, i| {
            buf.chan(ch)[i].into_sample()
        }),
        other => {
            warn!("unexpected sample format from mp3 decoder");
            interleave(other.spec().channels.count(), other.frames(), |_, _| 0.0)
        }
    }
}

fn interleave(channels: usize, frames: usize, sample: impl Fn(usize, usize) -> f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        for ch in 0..channels {
            out.push(sample(ch, i));
        }
    }
    out
}
