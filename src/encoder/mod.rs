//! Encoder capability traits and the codec registry.
//!
//! An encoder is a frame-in/packet-out state machine:
//! 1. `open()` applies a negotiated configuration
//! 2. `send_frame(Some(..))` queues one uncompressed frame
//! 3. `receive_packet()` is called until it reports `NeedsInput`
//! 4. `send_frame(None)` signals end of stream, after which
//!    `receive_packet()` drains the remaining output and reports `Flushed`
//!
//! Built-in encoders are pure Rust. With the `ffmpeg` feature the registry
//! also resolves libavcodec encoders.

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod pcm;
pub mod rawvideo;

pub use pcm::PcmEncoder;
pub use rawvideo::RawVideoEncoder;

use crate::config::{AudioEncoderConfig, VideoEncoderConfig};
use crate::error::{DriverError, Result};
use crate::format::{ChannelLayout, CodecId, PixelFormat, SampleFormat};
use crate::frame::{AudioFrame, VideoFrame};
use crate::packet::Packet;

/// Outcome of a successful `receive_packet` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveStatus {
    /// The packet was filled.
    Ready,
    /// No output until more input is supplied.
    NeedsInput,
    /// End of stream was signalled and all output has been returned.
    Flushed,
}

/// Errors reported by encoder implementations.
#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Encoder is not open")]
    NotOpen,
    #[error("End of stream was already signalled")]
    EndOfStream,
    #[error("Frame does not match the opened configuration: {0}")]
    FrameMismatch(String),
    #[error("Out of memory while building a packet")]
    OutOfMemory,
    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] rsmpeg::error::RsmpegError),
    #[error("{0}")]
    Other(String),
}

/// Frame-in/packet-out encoder state machine.
pub trait Encoder {
    type Frame;
    type Config;

    fn name(&self) -> &str;

    /// Apply `config` and open the encoder.
    ///
    /// Fields left for the encoder to decide (such as the audio frame size)
    /// are filled in.
    fn open(&mut self, config: &mut Self::Config) -> Result<(), EncoderError>;

    /// Queue a frame, or signal end of stream with `None`.
    fn send_frame(&mut self, frame: Option<&Self::Frame>) -> Result<(), EncoderError>;

    /// Fill `packet` with the next ready output, if any.
    fn receive_packet(&mut self, packet: &mut Packet) -> Result<ReceiveStatus, EncoderError>;

    /// Release encoder resources. Must be safe to call more than once.
    fn close(&mut self);
}

/// Audio encoder with advertised capabilities.
pub trait AudioEncoder: Encoder<Frame = AudioFrame, Config = AudioEncoderConfig> {
    fn sample_formats(&self) -> &[SampleFormat];

    /// Supported sample rates, `None` when any rate is accepted.
    fn sample_rates(&self) -> Option<&[u32]>;

    /// Supported channel layouts, `None` when any layout is accepted.
    fn channel_layouts(&self) -> Option<&[ChannelLayout]>;
}

/// Video encoder with advertised capabilities.
pub trait VideoEncoder: Encoder<Frame = VideoFrame, Config = VideoEncoderConfig> {
    /// Supported pixel formats, `None` when not advertised.
    fn pixel_formats(&self) -> Option<&[PixelFormat]>;
}

impl<E: Encoder + ?Sized> Encoder for Box<E> {
    type Frame = E::Frame;
    type Config = E::Config;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn open(&mut self, config: &mut Self::Config) -> Result<(), EncoderError> {
        (**self).open(config)
    }

    fn send_frame(&mut self, frame: Option<&Self::Frame>) -> Result<(), EncoderError> {
        (**self).send_frame(frame)
    }

    fn receive_packet(&mut self, packet: &mut Packet) -> Result<ReceiveStatus, EncoderError> {
        (**self).receive_packet(packet)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<E: AudioEncoder + ?Sized> AudioEncoder for Box<E> {
    fn sample_formats(&self) -> &[SampleFormat] {
        (**self).sample_formats()
    }

    fn sample_rates(&self) -> Option<&[u32]> {
        (**self).sample_rates()
    }

    fn channel_layouts(&self) -> Option<&[ChannelLayout]> {
        (**self).channel_layouts()
    }
}

impl<E: VideoEncoder + ?Sized> VideoEncoder for Box<E> {
    fn pixel_formats(&self) -> Option<&[PixelFormat]> {
        (**self).pixel_formats()
    }
}

/// Capability lists advertised by an audio encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioCapabilities {
    pub sample_formats: Vec<SampleFormat>,
    pub sample_rates: Option<Vec<u32>>,
    pub channel_layouts: Option<Vec<ChannelLayout>>,
}

impl AudioCapabilities {
    pub fn supports_format(&self, format: SampleFormat) -> bool {
        self.sample_formats.contains(&format)
    }

    pub fn supports_rate(&self, rate: u32) -> bool {
        self.sample_rates
            .as_ref()
            .map_or(true, |rates| rates.contains(&rate))
    }

    pub fn supports_layout(&self, layout: ChannelLayout) -> bool {
        self.channel_layouts
            .as_ref()
            .map_or(true, |layouts| layouts.contains(&layout))
    }
}

/// Reject a frame whose shape differs from the opened configuration.
pub(crate) fn check_audio_frame(
    config: &AudioEncoderConfig,
    frame: &AudioFrame,
) -> Result<(), EncoderError> {
    if frame.format() != config.sample_format {
        return Err(EncoderError::FrameMismatch(format!(
            "sample format {} (expected {})",
            frame.format(),
            config.sample_format
        )));
    }
    if frame.channels() != config.channels {
        return Err(EncoderError::FrameMismatch(format!(
            "{} channels (expected {})",
            frame.channels(),
            config.channels
        )));
    }
    if frame.nb_samples() != config.frame_size {
        return Err(EncoderError::FrameMismatch(format!(
            "{} samples (expected {})",
            frame.nb_samples(),
            config.frame_size
        )));
    }
    Ok(())
}

/// Reject a picture whose format or size differs from the opened configuration.
pub(crate) fn check_video_frame(
    config: &VideoEncoderConfig,
    frame: &VideoFrame,
) -> Result<(), EncoderError> {
    if frame.format() != config.pixel_format
        || frame.width() != config.width
        || frame.height() != config.height
    {
        return Err(EncoderError::FrameMismatch(format!(
            "{} {}x{} (expected {} {}x{})",
            frame.format(),
            frame.width(),
            frame.height(),
            config.pixel_format,
            config.width,
            config.height
        )));
    }
    Ok(())
}

pub type BoxedAudioEncoder = Box<dyn AudioEncoder>;
pub type BoxedVideoEncoder = Box<dyn VideoEncoder>;

/// Resolve an audio encoder by codec identifier.
pub fn find_audio_encoder(id: CodecId) -> Result<BoxedAudioEncoder> {
    match id {
        CodecId::PcmS16le => Ok(Box::new(PcmEncoder::new())),
        #[cfg(feature = "ffmpeg")]
        CodecId::Mp2 => Ok(Box::new(ffmpeg::FfmpegAudioEncoder::find(id)?)),
        _ => Err(DriverError::CodecNotFound(id.name().to_string())),
    }
}

/// Resolve an audio encoder by codec name.
pub fn find_audio_encoder_by_name(name: &str) -> Result<BoxedAudioEncoder> {
    match CodecId::from_name(name) {
        Some(id) => find_audio_encoder(id),
        #[cfg(feature = "ffmpeg")]
        None => Ok(Box::new(ffmpeg::FfmpegAudioEncoder::find_by_name(name)?)),
        #[cfg(not(feature = "ffmpeg"))]
        None => Err(DriverError::CodecNotFound(name.to_string())),
    }
}

/// Resolve a video encoder by codec identifier.
pub fn find_video_encoder(id: CodecId) -> Result<BoxedVideoEncoder> {
    match id {
        CodecId::RawVideo => Ok(Box::new(RawVideoEncoder::new())),
        #[cfg(feature = "ffmpeg")]
        CodecId::Mpeg1Video | CodecId::Mpeg2Video => {
            Ok(Box::new(ffmpeg::FfmpegVideoEncoder::find(id)?))
        }
        _ => Err(DriverError::CodecNotFound(id.name().to_string())),
    }
}

/// Resolve a video encoder by codec name.
pub fn find_video_encoder_by_name(name: &str) -> Result<BoxedVideoEncoder> {
    match CodecId::from_name(name) {
        Some(id) => find_video_encoder(id),
        #[cfg(feature = "ffmpeg")]
        None => Ok(Box::new(ffmpeg::FfmpegVideoEncoder::find_by_name(name)?)),
        #[cfg(not(feature = "ffmpeg"))]
        None => Err(DriverError::CodecNotFound(name.to_string())),
    }
}
