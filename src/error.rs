//! Error taxonomy for the encoding driver.
//!
//! Every variant is fatal: the core never retries. Transient exhaustion is
//! reported as [`crate::encoder::ReceiveStatus::NeedsInput`] and never shows up
//! here.

use crate::encoder::EncoderError;
use crate::format::SampleFormat;

/// Coarse classification of a [`DriverError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Codec or format unsupported, or settings rejected before open.
    Configuration,
    /// Context, frame or packet allocation failed.
    ResourceAllocation,
    /// The encoder rejected the parameter combination.
    OpenFailed,
    EncodeSubmitFailed,
    EncodeReceiveFailed,
    SinkWriteFailed,
    /// Missing command line arguments.
    Usage,
    /// The session was driven out of order.
    Protocol,
}

/// Errors that can occur while negotiating, encoding or writing.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Codec '{0}' not found")]
    CodecNotFound(String),
    #[error("Encoder {encoder} does not support {format}")]
    UnsupportedFormat { encoder: String, format: String },
    #[error("Invalid dimensions {width}x{height}: must be non-zero multiples of two")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Could not allocate {what} ({bytes} bytes)")]
    Allocation { what: &'static str, bytes: usize },
    #[error("Could not open {path}: {source}")]
    SinkOpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not open codec: {0}")]
    OpenFailed(#[source] EncoderError),
    #[error("Error sending a frame to the encoder: {0}")]
    EncodeSubmitFailed(#[source] EncoderError),
    #[error("Error during encoding: {0}")]
    EncodeReceiveFailed(#[source] EncoderError),
    #[error("Could not write to sink: {0}")]
    SinkWriteFailed(#[source] std::io::Error),
    #[error("End of stream was already submitted for this session")]
    AlreadyFlushed,
    #[error("Encoder session is not open")]
    NotOpen,
    #[error("Usage: {0}")]
    Usage(String),
}

impl DriverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::CodecNotFound(_)
            | DriverError::UnsupportedFormat { .. }
            | DriverError::InvalidDimensions { .. }
            | DriverError::InvalidSettings(_) => ErrorKind::Configuration,
            DriverError::Allocation { .. } | DriverError::SinkOpenFailed { .. } => {
                ErrorKind::ResourceAllocation
            }
            DriverError::OpenFailed(_) => ErrorKind::OpenFailed,
            DriverError::EncodeSubmitFailed(_) => ErrorKind::EncodeSubmitFailed,
            DriverError::EncodeReceiveFailed(_) => ErrorKind::EncodeReceiveFailed,
            DriverError::SinkWriteFailed(_) => ErrorKind::SinkWriteFailed,
            DriverError::Usage(_) => ErrorKind::Usage,
            DriverError::AlreadyFlushed | DriverError::NotOpen => ErrorKind::Protocol,
        }
    }

    pub(crate) fn unsupported_sample_format(encoder: &str, format: SampleFormat) -> Self {
        DriverError::UnsupportedFormat {
            encoder: encoder.to_string(),
            format: format!("sample format {}", format.name()),
        }
    }

    /// Short write reported by a sink that accepted fewer bytes than offered.
    pub(crate) fn short_write(written: usize, expected: usize) -> Self {
        DriverError::SinkWriteFailed(std::io::Error::new(
            std::io::ErrorKind::WriteZero,
            format!("short write: {} of {} bytes", written, expected),
        ))
    }
}

pub type Result<T, E = DriverError> = std::result::Result<T, E>;

/// Reserve a zeroed byte buffer, surfacing allocation failure as an error.
pub(crate) fn alloc_zeroed(what: &'static str, bytes: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes)
        .map_err(|_| DriverError::Allocation { what, bytes })?;
    buf.resize(bytes, 0);
    Ok(buf)
}
