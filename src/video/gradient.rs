//! Moving gradient test picture.
//!
//! For frame `i`: luma `(x + y + 3i) mod 256`, Cb `(128 + y + 2i) mod 256`,
//! Cr `(64 + x + 5i) mod 256`, chroma coordinates taken at plane resolution.

use crate::config::VideoEncoderConfig;
use crate::error::Result;
use crate::format::PixelFormat;
use crate::frame::VideoFrame;
use crate::producer::FrameProducer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientPattern {
    pixel_format: PixelFormat,
    width: u32,
    height: u32,
}

impl GradientPattern {
    pub fn new(config: &VideoEncoderConfig) -> Self {
        Self {
            pixel_format: config.pixel_format,
            width: config.width,
            height: config.height,
        }
    }

    pub fn alloc_frame(&self) -> Result<VideoFrame> {
        VideoFrame::alloc(self.pixel_format, self.width, self.height)
    }

    pub fn luma(x: usize, y: usize, index: u64) -> u8 {
        (x as u64 + y as u64 + 3 * index) as u8
    }

    pub fn cb(_x: usize, y: usize, index: u64) -> u8 {
        (128 + y as u64 + 2 * index) as u8
    }

    pub fn cr(x: usize, _y: usize, index: u64) -> u8 {
        (64 + x as u64 + 5 * index) as u8
    }
}

impl FrameProducer for GradientPattern {
    type Frame = VideoFrame;

    fn produce(&mut self, frame: &mut VideoFrame, index: u64) -> Result<()> {
        let shaders: [fn(usize, usize, u64) -> u8; 3] = [Self::luma, Self::cb, Self::cr];
        let mut planes = frame.make_writable()?;
        for (plane, shade) in planes.iter_mut().zip(shaders) {
            let layout = plane.layout();
            for y in 0..layout.height {
                if let Some(row) = plane.row_mut(y) {
                    for (x, px) in row.iter_mut().enumerate() {
                        *px = shade(x, y, index);
                    }
                }
            }
        }
        drop(planes);
        frame.set_pts(index as i64);
        Ok(())
    }
}
