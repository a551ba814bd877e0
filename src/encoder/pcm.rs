//! Built-in signed 16-bit PCM encoder.
//!
//! Packets alias the submitted frame buffers instead of copying them, so a
//! producer that writes into a frame still referenced by a queued packet must
//! obtain a fresh buffer first.

use super::{
    check_audio_frame, AudioCapabilities, AudioEncoder, Encoder, EncoderError, ReceiveStatus,
};
use crate::config::AudioEncoderConfig;
use crate::format::{ChannelLayout, SampleFormat};
use crate::frame::AudioFrame;
use crate::packet::Packet;
use std::collections::VecDeque;
use std::sync::Arc;

/// Samples per channel chosen at open when the caller leaves it to the
/// encoder (the MPEG-1 Layer II frame length).
pub const PCM_FRAME_SIZE: usize = 1152;

#[derive(Debug)]
struct Queued {
    buf: Arc<Vec<u8>>,
    pts: i64,
}

/// Packed S16 passthrough encoder with optional output delay.
#[derive(Debug)]
pub struct PcmEncoder {
    caps: AudioCapabilities,
    delay: usize,
    config: Option<AudioEncoderConfig>,
    queue: VecDeque<Queued>,
    end_of_stream: bool,
}

impl PcmEncoder {
    pub fn new() -> Self {
        Self::with_capabilities(AudioCapabilities {
            sample_formats: vec![SampleFormat::S16],
            sample_rates: None,
            channel_layouts: None,
        })
    }

    /// Encoder advertising a custom capability set.
    pub fn with_capabilities(caps: AudioCapabilities) -> Self {
        Self {
            caps,
            delay: 0,
            config: None,
            queue: VecDeque::new(),
            end_of_stream: false,
        }
    }

    /// Hold back `frames` frames before emitting output.
    pub fn with_delay(mut self, frames: usize) -> Self {
        self.delay = frames;
        self
    }

    pub fn is_open(&self) -> bool {
        self.config.is_some()
    }
}

impl Default for PcmEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for PcmEncoder {
    type Frame = AudioFrame;
    type Config = AudioEncoderConfig;

    fn name(&self) -> &str {
        "pcm_s16le"
    }

    fn open(&mut self, config: &mut AudioEncoderConfig) -> Result<(), EncoderError> {
        if self.is_open() {
            return Err(EncoderError::InvalidParameters("encoder already open".into()));
        }
        if !self.caps.supports_format(config.sample_format) {
            return Err(EncoderError::InvalidParameters(format!(
                "sample format {} not supported",
                config.sample_format
            )));
        }
        if config.sample_rate == 0 || !self.caps.supports_rate(config.sample_rate) {
            return Err(EncoderError::InvalidParameters(format!(
                "sample rate {} not supported",
                config.sample_rate
            )));
        }
        if config.channels == 0
            || config.channels != config.channel_layout.channels()
            || !self.caps.supports_layout(config.channel_layout)
        {
            return Err(EncoderError::InvalidParameters(format!(
                "channel layout {} with {} channels not supported",
                config.channel_layout, config.channels
            )));
        }
        if config.frame_size == 0 {
            config.frame_size = PCM_FRAME_SIZE;
        }

        self.config = Some(config.clone());
        self.queue.clear();
        self.end_of_stream = false;
        Ok(())
    }

    fn send_frame(&mut self, frame: Option<&AudioFrame>) -> Result<(), EncoderError> {
        let config = self.config.as_ref().ok_or(EncoderError::NotOpen)?;
        if self.end_of_stream {
            return Err(EncoderError::EndOfStream);
        }
        match frame {
            Some(frame) => {
                check_audio_frame(config, frame)?;
                self.queue.push_back(Queued {
                    buf: Arc::clone(frame.buffer()),
                    pts: frame.pts(),
                });
            }
            None => self.end_of_stream = true,
        }
        Ok(())
    }

    fn receive_packet(&mut self, packet: &mut Packet) -> Result<ReceiveStatus, EncoderError> {
        if self.config.is_none() {
            return Err(EncoderError::NotOpen);
        }
        let ready = self.queue.len() > self.delay || self.end_of_stream;
        match self.queue.pop_front() {
            Some(queued) if ready => {
                packet.set_shared(queued.buf);
                packet.set_pts(Some(queued.pts));
                packet.set_dts(Some(queued.pts));
                packet.set_key(true);
                Ok(ReceiveStatus::Ready)
            }
            Some(queued) => {
                self.queue.push_front(queued);
                Ok(ReceiveStatus::NeedsInput)
            }
            None if self.end_of_stream => Ok(ReceiveStatus::Flushed),
            None => Ok(ReceiveStatus::NeedsInput),
        }
    }

    fn close(&mut self) {
        self.queue.clear();
        self.config = None;
    }
}

impl AudioEncoder for PcmEncoder {
    fn sample_formats(&self) -> &[SampleFormat] {
        &self.caps.sample_formats
    }

    fn sample_rates(&self) -> Option<&[u32]> {
        self.caps.sample_rates.as_deref()
    }

    fn channel_layouts(&self) -> Option<&[ChannelLayout]> {
        self.caps.channel_layouts.as_deref()
    }
}
