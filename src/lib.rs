//! Encode Driver
//!
//! Drives a frame-in/packet-out encoder with synthetic audio and video and
//! writes the resulting elementary stream to a sink.
//!
//! # Features
//!
//! - Capability negotiation (sample format, sample rate, channel layout)
//! - Deterministic test tone and moving gradient producers
//! - Encode-drain loop with typed transient exhaustion and single flush
//! - Built-in `pcm_s16le` and `rawvideo` encoders
//! - libavcodec encoders via rsmpeg (when the `ffmpeg` feature is enabled)

pub mod audio;
pub mod config;
pub mod encoder;
pub mod error;
pub mod format;
pub mod frame;
pub mod negotiate;
pub mod packet;
pub mod pipeline;
pub mod producer;
pub mod session;
pub mod sink;
pub mod video;

// Re-export commonly used types
pub use audio::ToneGenerator;
pub use config::{AudioEncoderConfig, AudioSettings, VideoEncoderConfig, VideoSettings};
pub use encoder::{
    find_audio_encoder, find_audio_encoder_by_name, find_video_encoder,
    find_video_encoder_by_name, AudioEncoder, Encoder, EncoderError, ReceiveStatus, VideoEncoder,
};
pub use error::{DriverError, ErrorKind, Result};
pub use format::{ChannelLayout, CodecId, PixelFormat, Rational, SampleFormat};
pub use frame::{AudioFrame, VideoFrame};
pub use packet::Packet;
pub use pipeline::{AudioPipeline, EncodeReport, VideoPipeline, SEQUENCE_END_CODE};
pub use producer::FrameProducer;
pub use session::{DrainOutcome, EncodeSession, SessionState};
pub use sink::{FileSink, MemorySink, Sink, WriterSink};
pub use video::GradientPattern;
