//! Drivers composing negotiation, frame production, the drain loop and a sink.
//!
//! A pipeline is opened first, without touching any output, so that a
//! configuration failure never leaves a partial file behind. `run` then
//! produces the configured number of frames, flushes the encoder and flushes
//! the sink.

use crate::audio::ToneGenerator;
use crate::config::{AudioEncoderConfig, AudioSettings, VideoEncoderConfig, VideoSettings};
use crate::encoder::{AudioEncoder, Encoder, VideoEncoder};
use crate::error::{DriverError, Result};
use crate::negotiate;
use crate::producer::FrameProducer;
use crate::session::EncodeSession;
use crate::sink::{self, Sink};
use crate::video::GradientPattern;
use serde::Serialize;

/// MPEG sequence end code appended after a video stream.
pub const SEQUENCE_END_CODE: [u8; 4] = [0x00, 0x00, 0x01, 0xb7];

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodeReport {
    pub codec: String,
    pub frames: u64,
    pub packets: u64,
    /// Total bytes handed to the sink, trailer included.
    pub bytes: u64,
}

impl EncodeReport {
    fn from_session<E: Encoder>(session: &EncodeSession<E>, trailer: usize) -> Self {
        Self {
            codec: session.encoder().name().to_string(),
            frames: session.frames_submitted(),
            packets: session.packets_written(),
            bytes: session.bytes_written() + trailer as u64,
        }
    }
}

/// Produce `frame_count` frames into one reused frame, submitting each, then
/// flush the encoder.
pub fn drive<E, P, S>(
    session: &mut EncodeSession<E>,
    producer: &mut P,
    frame: &mut E::Frame,
    frame_count: u32,
    sink: &mut S,
) -> Result<()>
where
    E: Encoder,
    P: FrameProducer<Frame = E::Frame>,
    S: Sink + ?Sized,
{
    for index in 0..u64::from(frame_count) {
        producer.produce(frame, index)?;
        log::debug!("Send frame {}", index);
        session.submit_and_drain(Some(&*frame), sink)?;
    }
    session.submit_and_drain(None, sink)?;
    Ok(())
}

fn flush_sink<S: Sink + ?Sized>(sink: &mut S) -> Result<()> {
    sink.flush().map_err(DriverError::SinkWriteFailed)
}

/// Tone generator feeding an audio encoder.
pub struct AudioPipeline<E: AudioEncoder> {
    session: EncodeSession<E>,
    tone: ToneGenerator,
    frame_count: u32,
}

impl<E: AudioEncoder> AudioPipeline<E> {
    /// Negotiate with `encoder` and open it.
    pub fn open(encoder: E, settings: &AudioSettings) -> Result<Self> {
        let session = negotiate::open_audio(encoder, settings)?;
        let tone = ToneGenerator::from_settings(session.config(), settings);
        Ok(Self {
            session,
            tone,
            frame_count: settings.frame_count,
        })
    }

    pub fn config(&self) -> &AudioEncoderConfig {
        self.session.config()
    }

    pub fn session(&self) -> &EncodeSession<E> {
        &self.session
    }

    /// Encode the stream into `sink`. The pipeline keeps the encoder until it
    /// is dropped; a second run fails with `AlreadyFlushed`.
    pub fn run<S: Sink + ?Sized>(&mut self, sink: &mut S) -> Result<EncodeReport> {
        let mut frame = self.tone.alloc_frame()?;
        drive(
            &mut self.session,
            &mut self.tone,
            &mut frame,
            self.frame_count,
            sink,
        )?;
        flush_sink(sink)?;

        let report = EncodeReport::from_session(&self.session, 0);
        log::info!(
            "Encoded {} audio frames into {} packets ({} bytes)",
            report.frames,
            report.packets,
            report.bytes
        );
        Ok(report)
    }
}

/// Gradient pattern feeding a video encoder.
pub struct VideoPipeline<E: VideoEncoder> {
    session: EncodeSession<E>,
    pattern: GradientPattern,
    frame_count: u32,
}

impl<E: VideoEncoder> VideoPipeline<E> {
    /// Validate `settings` against `encoder` and open it.
    pub fn open(encoder: E, settings: &VideoSettings) -> Result<Self> {
        let session = negotiate::open_video(encoder, settings)?;
        let pattern = GradientPattern::new(session.config());
        Ok(Self {
            session,
            pattern,
            frame_count: settings.frame_count,
        })
    }

    pub fn config(&self) -> &VideoEncoderConfig {
        self.session.config()
    }

    pub fn session(&self) -> &EncodeSession<E> {
        &self.session
    }

    /// Encode the stream and terminate it with [`SEQUENCE_END_CODE`].
    pub fn run<S: Sink + ?Sized>(&mut self, sink: &mut S) -> Result<EncodeReport> {
        let mut frame = self.pattern.alloc_frame()?;
        drive(
            &mut self.session,
            &mut self.pattern,
            &mut frame,
            self.frame_count,
            sink,
        )?;
        sink::write_all(sink, &SEQUENCE_END_CODE)?;
        flush_sink(sink)?;

        let report = EncodeReport::from_session(&self.session, SEQUENCE_END_CODE.len());
        log::info!(
            "Encoded {} video frames into {} packets ({} bytes)",
            report.frames,
            report.packets,
            report.bytes
        );
        Ok(report)
    }
}
