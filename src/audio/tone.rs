//! Constant tone producer.
//!
//! Every channel of sample `n` carries `round(sin(n * step) * amplitude)`
//! where `step = 2π * frequency / sample_rate`. The phase comes from the
//! absolute sample index, so a frame's content depends only on its index.

use crate::config::{AudioEncoderConfig, AudioSettings};
use crate::error::{DriverError, Result};
use crate::format::SampleFormat;
use crate::frame::AudioFrame;
use crate::producer::FrameProducer;
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq)]
pub struct ToneGenerator {
    frequency: f64,
    amplitude: f64,
    sample_rate: u32,
    channels: u32,
    frame_size: usize,
}

impl ToneGenerator {
    pub fn new(config: &AudioEncoderConfig, frequency: f64, amplitude: f64) -> Self {
        Self {
            frequency,
            amplitude,
            sample_rate: config.sample_rate,
            channels: config.channels,
            frame_size: config.frame_size,
        }
    }

    pub fn from_settings(config: &AudioEncoderConfig, settings: &AudioSettings) -> Self {
        Self::new(config, settings.frequency, settings.amplitude)
    }

    /// Allocate a frame shaped for this generator.
    pub fn alloc_frame(&self) -> Result<AudioFrame> {
        AudioFrame::alloc(SampleFormat::S16, self.channels, self.frame_size)
    }

    /// Phase increment per sample.
    pub fn step(&self) -> f64 {
        2.0 * PI * self.frequency / self.sample_rate as f64
    }

    /// Value of sample `n` counted from the start of the stream.
    pub fn sample(&self, n: u64) -> i16 {
        let v = (n as f64 * self.step()).sin() * self.amplitude;
        v.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
    }
}

impl FrameProducer for ToneGenerator {
    type Frame = AudioFrame;

    fn produce(&mut self, frame: &mut AudioFrame, index: u64) -> Result<()> {
        if frame.format() != SampleFormat::S16 {
            return Err(DriverError::unsupported_sample_format(
                "tone generator",
                frame.format(),
            ));
        }
        let channels = frame.channels() as usize;
        if channels == 0 {
            return Err(DriverError::InvalidSettings(
                "audio frame has no channels".into(),
            ));
        }
        let first = index * frame.nb_samples() as u64;

        let data = frame.make_writable()?;
        for (j, samples) in data.chunks_exact_mut(channels * 2).enumerate() {
            let v = self.sample(first + j as u64);
            for slot in samples.chunks_exact_mut(2) {
                slot.copy_from_slice(&v.to_le_bytes());
            }
        }
        frame.set_pts(index as i64);
        Ok(())
    }
}
