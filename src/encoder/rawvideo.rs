//! Built-in uncompressed planar video encoder.
//!
//! Each picture becomes one packet holding its planes back to back with the
//! stride padding removed. Output is held back by `max_b_frames` pictures, the
//! same lookahead a B-frame capable encoder needs.

use super::{check_video_frame, Encoder, EncoderError, ReceiveStatus, VideoEncoder};
use crate::config::VideoEncoderConfig;
use crate::format::PixelFormat;
use crate::frame::VideoFrame;
use crate::packet::Packet;
use std::collections::VecDeque;

const PIXEL_FORMATS: [PixelFormat; 3] = [
    PixelFormat::Yuv420p,
    PixelFormat::Yuv422p,
    PixelFormat::Yuv444p,
];

#[derive(Debug, Default)]
pub struct RawVideoEncoder {
    config: Option<VideoEncoderConfig>,
    queue: VecDeque<VideoFrame>,
    end_of_stream: bool,
    emitted: i64,
}

impl RawVideoEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_picture(frame: &VideoFrame, packet: &mut Packet) -> Result<(), EncoderError> {
        let buf = packet.buffer_mut();
        buf.clear();
        buf.try_reserve(frame.packed_len())
            .map_err(|_| EncoderError::OutOfMemory)?;
        for plane in frame.planes() {
            for row in plane.rows() {
                buf.extend_from_slice(row);
            }
        }
        Ok(())
    }
}

impl Encoder for RawVideoEncoder {
    type Frame = VideoFrame;
    type Config = VideoEncoderConfig;

    fn name(&self) -> &str {
        "rawvideo"
    }

    fn open(&mut self, config: &mut VideoEncoderConfig) -> Result<(), EncoderError> {
        if self.config.is_some() {
            return Err(EncoderError::InvalidParameters("encoder already open".into()));
        }
        if config.width == 0 || config.height == 0 {
            return Err(EncoderError::InvalidParameters(format!(
                "dimensions {}x{}",
                config.width, config.height
            )));
        }
        if config.time_base.num <= 0 || config.time_base.den <= 0 {
            return Err(EncoderError::InvalidParameters(format!(
                "time base {}",
                config.time_base
            )));
        }
        if config.gop_size == 0 {
            return Err(EncoderError::InvalidParameters("gop size 0".into()));
        }

        self.config = Some(config.clone());
        self.queue.clear();
        self.end_of_stream = false;
        self.emitted = 0;
        Ok(())
    }

    fn send_frame(&mut self, frame: Option<&VideoFrame>) -> Result<(), EncoderError> {
        let config = self.config.as_ref().ok_or(EncoderError::NotOpen)?;
        if self.end_of_stream {
            return Err(EncoderError::EndOfStream);
        }
        let Some(frame) = frame else {
            self.end_of_stream = true;
            return Ok(());
        };
        check_video_frame(config, frame)?;
        // Keeps a reference to the planes until the picture is emitted.
        self.queue.push_back(frame.clone());
        Ok(())
    }

    fn receive_packet(&mut self, packet: &mut Packet) -> Result<ReceiveStatus, EncoderError> {
        let config = self.config.as_ref().ok_or(EncoderError::NotOpen)?;
        let lookahead = config.max_b_frames as usize;
        let gop = i64::from(config.gop_size);

        if self.queue.len() <= lookahead && !self.end_of_stream {
            return Ok(ReceiveStatus::NeedsInput);
        }
        let Some(frame) = self.queue.pop_front() else {
            return Ok(if self.end_of_stream {
                ReceiveStatus::Flushed
            } else {
                ReceiveStatus::NeedsInput
            });
        };

        Self::write_picture(&frame, packet)?;
        packet.set_pts(Some(frame.pts()));
        packet.set_dts(Some(self.emitted));
        packet.set_key(self.emitted % gop == 0);
        self.emitted += 1;
        Ok(ReceiveStatus::Ready)
    }

    fn close(&mut self) {
        self.queue.clear();
        self.config = None;
    }
}

impl VideoEncoder for RawVideoEncoder {
    fn pixel_formats(&self) -> Option<&[PixelFormat]> {
        Some(&PIXEL_FORMATS)
    }
}
