//! Caller settings and negotiated encoder configurations.
//!
//! Settings are what the caller asks for; the `*EncoderConfig` types are what
//! negotiation produced and the encoder accepted. Settings can be loaded from
//! JSON, every missing field falling back to its default.

use crate::error::{DriverError, Result};
use crate::format::{ChannelLayout, PixelFormat, Rational, SampleFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Audio driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Bit rate in bits per second.
    pub bit_rate: u64,
    /// Target rate used when the encoder advertises a list of rates.
    pub preferred_sample_rate: u32,
    /// Number of frames to produce before flushing.
    pub frame_count: u32,
    /// Test tone frequency in Hz.
    pub frequency: f64,
    /// Peak amplitude on the signed 16-bit scale.
    pub amplitude: f64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            bit_rate: 64_000,
            preferred_sample_rate: 44_100,
            frame_count: 200,
            frequency: 440.0,
            amplitude: 10_000.0,
        }
    }
}

impl AudioSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| DriverError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&read_settings(path.as_ref())?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.preferred_sample_rate == 0 {
            return Err(DriverError::InvalidSettings(
                "preferred_sample_rate must be positive".into(),
            ));
        }
        if self.frame_count == 0 {
            return Err(DriverError::InvalidSettings(
                "frame_count must be positive".into(),
            ));
        }
        if !(0.0..=i16::MAX as f64).contains(&self.amplitude) {
            return Err(DriverError::InvalidSettings(format!(
                "amplitude {} does not fit in signed 16-bit samples",
                self.amplitude
            )));
        }
        Ok(())
    }
}

/// Video driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub bit_rate: u64,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// Frames per second; the time base is its inverse.
    pub frame_rate: u32,
    /// Emit one intra frame every `gop_size` frames.
    pub gop_size: u32,
    pub max_b_frames: u32,
    pub frame_count: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            bit_rate: 400_000,
            width: 352,
            height: 288,
            pixel_format: PixelFormat::Yuv420p,
            frame_rate: 25,
            gop_size: 10,
            max_b_frames: 1,
            frame_count: 25,
        }
    }
}

impl VideoSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| DriverError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&read_settings(path.as_ref())?)
    }

    /// Checks values that do not depend on the encoder. Dimensions are
    /// checked during negotiation.
    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 || i32::try_from(self.frame_rate).is_err() {
            return Err(DriverError::InvalidSettings(format!(
                "frame_rate {} must be between 1 and {}",
                self.frame_rate,
                i32::MAX
            )));
        }
        if self.frame_count == 0 {
            return Err(DriverError::InvalidSettings(
                "frame_count must be positive".into(),
            ));
        }
        if self.gop_size == 0 {
            return Err(DriverError::InvalidSettings(
                "gop_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn read_settings(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| DriverError::InvalidSettings(format!("{}: {}", path.display(), e)))
}

/// Negotiated audio encoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioEncoderConfig {
    pub sample_format: SampleFormat,
    pub sample_rate: u32,
    pub channel_layout: ChannelLayout,
    pub channels: u32,
    pub bit_rate: u64,
    /// Samples per channel in each frame. Zero until the encoder is opened,
    /// at which point the encoder fills in its own value.
    pub frame_size: usize,
}

/// Negotiated video encoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoEncoderConfig {
    pub pixel_format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub time_base: Rational,
    pub frame_rate: Rational,
    pub gop_size: u32,
    pub max_b_frames: u32,
    pub bit_rate: u64,
}
