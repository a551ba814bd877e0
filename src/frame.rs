//! Uncompressed audio and video frames.
//!
//! Frame memory is reference counted so an encoder may keep a cheap reference
//! to a submitted frame (lookahead queues, zero-copy packets). Producers must
//! call `make_writable` before every write; it copies the buffer only when a
//! reference is still outstanding.

use crate::error::{alloc_zeroed, DriverError, Result};
use crate::format::{PixelFormat, SampleFormat};
use std::sync::Arc;

/// Row alignment used for video planes, in bytes.
pub const STRIDE_ALIGN: usize = 32;

fn copy_buffer(what: &'static str, src: &[u8]) -> Result<Vec<u8>> {
    let mut buf = alloc_zeroed(what, src.len())?;
    buf.copy_from_slice(src);
    Ok(buf)
}

/// Ensure `data` is uniquely owned and return it for writing.
fn exclusive<'a>(what: &'static str, data: &'a mut Arc<Vec<u8>>) -> Result<&'a mut Vec<u8>> {
    if Arc::get_mut(data).is_none() {
        log::debug!("{} buffer is shared, copying {} bytes", what, data.len());
        let copy = copy_buffer(what, &data[..])?;
        *data = Arc::new(copy);
    }
    let bytes = data.len();
    Arc::get_mut(data).ok_or(DriverError::Allocation { what, bytes })
}

fn is_unique(data: &Arc<Vec<u8>>) -> bool {
    Arc::strong_count(data) == 1 && Arc::weak_count(data) == 0
}

/// Interleaved audio frame.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    data: Arc<Vec<u8>>,
    format: SampleFormat,
    channels: u32,
    nb_samples: usize,
    pts: i64,
}

impl AudioFrame {
    /// Allocate a zeroed frame holding `nb_samples` samples per channel.
    pub fn alloc(format: SampleFormat, channels: u32, nb_samples: usize) -> Result<Self> {
        if format.is_planar() {
            return Err(DriverError::UnsupportedFormat {
                encoder: "audio frame".into(),
                format: format!("planar sample format {}", format),
            });
        }
        let bytes = nb_samples * channels as usize * format.bytes_per_sample();
        Ok(Self {
            data: Arc::new(alloc_zeroed("audio frame", bytes)?),
            format,
            channels,
            nb_samples,
            pts: 0,
        })
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn nb_samples(&self) -> usize {
        self.nb_samples
    }

    pub fn pts(&self) -> i64 {
        self.pts
    }

    pub fn set_pts(&mut self, pts: i64) {
        self.pts = pts;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the sample buffer.
    pub fn buffer(&self) -> &Arc<Vec<u8>> {
        &self.data
    }

    pub fn is_writable(&self) -> bool {
        is_unique(&self.data)
    }

    /// Obtain exclusive access to the sample buffer.
    pub fn make_writable(&mut self) -> Result<&mut [u8]> {
        exclusive("audio frame", &mut self.data).map(|buf| buf.as_mut_slice())
    }
}

/// Position and extent of a strided plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    pub width: usize,
    pub height: usize,
    /// Bytes per row, at least `width`.
    pub stride: usize,
}

impl PlaneLayout {
    pub fn new(width: usize, height: usize, align: usize) -> Self {
        let align = align.max(1);
        let stride = width.div_ceil(align) * align;
        Self {
            width,
            height,
            stride,
        }
    }

    /// Byte offset of `(row, col)`, or `None` outside the logical area.
    pub fn offset(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(row * self.stride + col)
    }

    fn row_range(&self, row: usize) -> Option<std::ops::Range<usize>> {
        let start = self.offset(row, 0)?;
        Some(start..start + self.width)
    }

    pub fn len(&self) -> usize {
        self.stride * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One component plane of a video frame.
#[derive(Debug, Clone)]
pub struct Plane {
    data: Arc<Vec<u8>>,
    layout: PlaneLayout,
}

impl Plane {
    pub fn alloc(width: usize, height: usize) -> Result<Self> {
        let layout = PlaneLayout::new(width, height, STRIDE_ALIGN);
        Ok(Self {
            data: Arc::new(alloc_zeroed("video plane", layout.len())?),
            layout,
        })
    }

    pub fn layout(&self) -> PlaneLayout {
        self.layout
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        self.layout.offset(row, col).map(|off| self.data[off])
    }

    /// Logical pixels of `row`, without stride padding.
    pub fn row(&self, row: usize) -> Option<&[u8]> {
        self.layout.row_range(row).map(|range| &self.data[range])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.layout.height).filter_map(move |row| self.row(row))
    }

    pub fn buffer(&self) -> &Arc<Vec<u8>> {
        &self.data
    }

    pub fn is_writable(&self) -> bool {
        is_unique(&self.data)
    }

    pub fn make_writable(&mut self) -> Result<PlaneMut<'_>> {
        let layout = self.layout;
        let data = exclusive("video plane", &mut self.data)?;
        Ok(PlaneMut {
            data: data.as_mut_slice(),
            layout,
        })
    }
}

/// Exclusive write access to a plane.
pub struct PlaneMut<'a> {
    data: &'a mut [u8],
    layout: PlaneLayout,
}

impl PlaneMut<'_> {
    pub fn layout(&self) -> PlaneLayout {
        self.layout
    }

    /// Write one pixel. Returns false when `(row, col)` is out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: u8) -> bool {
        match self.layout.offset(row, col) {
            Some(off) => {
                self.data[off] = value;
                true
            }
            None => false,
        }
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut [u8]> {
        let range = self.layout.row_range(row)?;
        Some(&mut self.data[range])
    }
}

/// Planar video frame.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    planes: Vec<Plane>,
    format: PixelFormat,
    width: u32,
    height: u32,
    pts: i64,
}

impl VideoFrame {
    pub fn alloc(format: PixelFormat, width: u32, height: u32) -> Result<Self> {
        let planes = (0..3)
            .map(|index| {
                let (w, h) = format.plane_size(index, width, height);
                Plane::alloc(w as usize, h as usize)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            planes,
            format,
            width,
            height,
            pts: 0,
        })
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pts(&self) -> i64 {
        self.pts
    }

    pub fn set_pts(&mut self, pts: i64) {
        self.pts = pts;
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn plane(&self, index: usize) -> Option<&Plane> {
        self.planes.get(index)
    }

    pub fn is_writable(&self) -> bool {
        self.planes.iter().all(Plane::is_writable)
    }

    /// Obtain exclusive access to every plane, in plane order.
    pub fn make_writable(&mut self) -> Result<Vec<PlaneMut<'_>>> {
        self.planes.iter_mut().map(Plane::make_writable).collect()
    }

    /// Size of the picture with stride padding removed.
    pub fn packed_len(&self) -> usize {
        self.planes
            .iter()
            .map(|p| p.layout.width * p.layout.height)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_is_aligned() {
        let layout = PlaneLayout::new(325, 288, 32);
        assert_eq!(layout.stride, 352);
        assert_eq!(layout.offset(1, 0), Some(352));
        assert_eq!(layout.offset(2, 5), Some(709));
        assert_eq!(layout.offset(0, 325), None);
        assert_eq!(layout.offset(288, 0), None);
    }

    #[test]
    fn test_audio_frame_size() {
        let frame = AudioFrame::alloc(SampleFormat::S16, 2, 1152).unwrap();
        assert_eq!(frame.data().len(), 1152 * 2 * 2);
        assert!(frame.is_writable());
    }

    #[test]
    fn test_planar_audio_rejected() {
        assert!(AudioFrame::alloc(SampleFormat::Fltp, 2, 1024).is_err());
    }

    #[test]
    fn test_make_writable_copies_shared_buffer() {
        let mut frame = AudioFrame::alloc(SampleFormat::S16, 1, 4).unwrap();
        frame.make_writable().unwrap()[0] = 7;

        let held = Arc::clone(frame.buffer());
        assert!(!frame.is_writable());

        let data = frame.make_writable().unwrap();
        data[0] = 9;

        assert_eq!(held[0], 7);
        assert_eq!(frame.data()[0], 9);
        assert!(frame.is_writable());
    }

    #[test]
    fn test_make_writable_reuses_unique_buffer() {
        let mut frame = AudioFrame::alloc(SampleFormat::S16, 1, 4).unwrap();
        let before = frame.buffer().as_ptr();
        frame.make_writable().unwrap();
        assert_eq!(frame.buffer().as_ptr(), before);
    }

    #[test]
    fn test_plane_writes_respect_stride() {
        let mut plane = Plane::alloc(10, 3).unwrap();
        {
            let mut w = plane.make_writable().unwrap();
            assert!(w.set(1, 9, 42));
            assert!(!w.set(1, 10, 1));
            w.row_mut(2).unwrap().fill(5);
        }
        assert_eq!(plane.layout().stride, 32);
        assert_eq!(plane.buffer()[32 + 9], 42);
        assert_eq!(plane.get(1, 9), Some(42));
        assert_eq!(plane.row(2).unwrap(), &[5u8; 10]);
        // Padding stays untouched.
        assert!(plane.buffer()[64 + 10..96].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_video_frame_planes() {
        let frame = VideoFrame::alloc(PixelFormat::Yuv420p, 352, 288).unwrap();
        assert_eq!(frame.planes().len(), 3);
        assert_eq!(frame.plane(1).unwrap().layout().width, 176);
        assert_eq!(frame.plane(2).unwrap().layout().height, 144);
        assert_eq!(frame.packed_len(), 352 * 288 * 3 / 2);
    }
}
