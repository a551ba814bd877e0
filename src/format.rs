//! Sample, pixel and channel layout descriptors shared by both pipelines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Audio sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    U8,
    /// Packed signed 16-bit, the only format the tone producer writes.
    S16,
    S32,
    Flt,
    Dbl,
    /// Planar signed 16-bit.
    S16p,
    /// Planar 32-bit float.
    Fltp,
}

impl SampleFormat {
    pub fn name(&self) -> &'static str {
        match self {
            SampleFormat::U8 => "u8",
            SampleFormat::S16 => "s16",
            SampleFormat::S32 => "s32",
            SampleFormat::Flt => "flt",
            SampleFormat::Dbl => "dbl",
            SampleFormat::S16p => "s16p",
            SampleFormat::Fltp => "fltp",
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::S16 | SampleFormat::S16p => 2,
            SampleFormat::S32 | SampleFormat::Flt | SampleFormat::Fltp => 4,
            SampleFormat::Dbl => 8,
        }
    }

    pub fn is_planar(&self) -> bool {
        matches!(self, SampleFormat::S16p | SampleFormat::Fltp)
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Planar YUV pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Yuv420p,
    Yuv422p,
    Yuv444p,
}

impl PixelFormat {
    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Yuv420p => "yuv420p",
            PixelFormat::Yuv422p => "yuv422p",
            PixelFormat::Yuv444p => "yuv444p",
        }
    }

    /// Log2 of the horizontal and vertical chroma subsampling factors.
    pub fn chroma_shift(&self) -> (u32, u32) {
        match self {
            PixelFormat::Yuv420p => (1, 1),
            PixelFormat::Yuv422p => (1, 0),
            PixelFormat::Yuv444p => (0, 0),
        }
    }

    /// Dimensions of plane `index` (0 = luma, 1 and 2 = chroma).
    pub fn plane_size(&self, index: usize, width: u32, height: u32) -> (u32, u32) {
        if index == 0 {
            return (width, height);
        }
        let (sx, sy) = self.chroma_shift();
        (width >> sx, height >> sy)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Channel layout as a speaker bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelLayout(pub u64);

impl ChannelLayout {
    pub const FRONT_LEFT: u64 = 0x1;
    pub const FRONT_RIGHT: u64 = 0x2;
    pub const FRONT_CENTER: u64 = 0x4;
    pub const LOW_FREQUENCY: u64 = 0x8;
    pub const BACK_LEFT: u64 = 0x10;
    pub const BACK_RIGHT: u64 = 0x20;

    pub const MONO: ChannelLayout = ChannelLayout(Self::FRONT_CENTER);
    pub const STEREO: ChannelLayout = ChannelLayout(Self::FRONT_LEFT | Self::FRONT_RIGHT);
    pub const SURROUND: ChannelLayout =
        ChannelLayout(Self::FRONT_LEFT | Self::FRONT_RIGHT | Self::FRONT_CENTER);
    pub const QUAD: ChannelLayout = ChannelLayout(
        Self::FRONT_LEFT | Self::FRONT_RIGHT | Self::BACK_LEFT | Self::BACK_RIGHT,
    );
    pub const FIVE_POINT_ONE: ChannelLayout = ChannelLayout(
        Self::FRONT_LEFT
            | Self::FRONT_RIGHT
            | Self::FRONT_CENTER
            | Self::LOW_FREQUENCY
            | Self::BACK_LEFT
            | Self::BACK_RIGHT,
    );

    pub fn channels(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn mask(&self) -> u64 {
        self.0
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        ChannelLayout::STEREO
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ChannelLayout::MONO => f.write_str("mono"),
            ChannelLayout::STEREO => f.write_str("stereo"),
            ChannelLayout::SURROUND => f.write_str("3.0"),
            ChannelLayout::QUAD => f.write_str("quad"),
            ChannelLayout::FIVE_POINT_ONE => f.write_str("5.1"),
            other => write!(f, "{} channels (0x{:x})", other.channels(), other.0),
        }
    }
}

/// Rational number used for time bases and frame rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    pub fn invert(&self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Codec identifiers the registry knows how to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecId {
    /// Built-in packed signed 16-bit PCM.
    PcmS16le,
    /// Built-in uncompressed planar video.
    RawVideo,
    /// MPEG-1 Audio Layer II (FFmpeg backend).
    Mp2,
    /// MPEG-1 video (FFmpeg backend).
    Mpeg1Video,
    /// MPEG-2 video (FFmpeg backend).
    Mpeg2Video,
}

impl CodecId {
    pub fn name(&self) -> &'static str {
        match self {
            CodecId::PcmS16le => "pcm_s16le",
            CodecId::RawVideo => "rawvideo",
            CodecId::Mp2 => "mp2",
            CodecId::Mpeg1Video => "mpeg1video",
            CodecId::Mpeg2Video => "mpeg2video",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            CodecId::PcmS16le,
            CodecId::RawVideo,
            CodecId::Mp2,
            CodecId::Mpeg1Video,
            CodecId::Mpeg2Video,
        ]
        .into_iter()
        .find(|id| id.name() == name)
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
