//! libavcodec encoders via rsmpeg.
//!
//! Capability lists are read once through `avcodec_get_supported_config` and
//! cached so the traits can hand out slices. Frames are copied row by row into
//! an encoder-owned `AVFrame`, honouring both sides' line sizes.

use super::{
    check_audio_frame, check_video_frame, AudioEncoder, Encoder, EncoderError, ReceiveStatus,
    VideoEncoder,
};
use crate::config::{AudioEncoderConfig, VideoEncoderConfig};
use crate::error::{DriverError, Result};
use crate::format::{ChannelLayout, CodecId, PixelFormat, Rational, SampleFormat};
use crate::frame::{AudioFrame, VideoFrame};
use crate::packet::Packet;
use rsmpeg::{
    avcodec::{AVCodec, AVCodecContext, AVCodecRef},
    avutil::{AVChannelLayout, AVFrame, AVRational},
    error::RsmpegError,
    ffi,
};
use std::ffi::CString;
use std::os::raw::{c_int, c_void};

fn codec_id(id: CodecId) -> Option<ffi::AVCodecID> {
    match id {
        CodecId::PcmS16le => Some(ffi::AV_CODEC_ID_PCM_S16LE),
        CodecId::RawVideo => Some(ffi::AV_CODEC_ID_RAWVIDEO),
        CodecId::Mp2 => Some(ffi::AV_CODEC_ID_MP2),
        CodecId::Mpeg1Video => Some(ffi::AV_CODEC_ID_MPEG1VIDEO),
        CodecId::Mpeg2Video => Some(ffi::AV_CODEC_ID_MPEG2VIDEO),
    }
}

fn find_codec(id: CodecId) -> Result<AVCodecRef<'static>> {
    codec_id(id)
        .and_then(AVCodec::find_encoder)
        .ok_or_else(|| DriverError::CodecNotFound(id.name().to_string()))
}

fn find_codec_by_name(name: &str) -> Result<AVCodecRef<'static>> {
    let cname = CString::new(name).map_err(|_| DriverError::CodecNotFound(name.to_string()))?;
    AVCodec::find_encoder_by_name(&cname).ok_or_else(|| DriverError::CodecNotFound(name.to_string()))
}

/// Read a supported-config list. `None` means the codec accepts any value.
fn supported_config<T: Copy>(codec: &AVCodecRef<'static>, kind: ffi::AVCodecConfig) -> Option<Vec<T>> {
    let mut values: *const c_void = std::ptr::null();
    let mut count: c_int = 0;
    // SAFETY: libavcodec writes a pointer to a static, `count`-long array of
    // the type matching `kind` (or null) and never retains our out pointers.
    let ret = unsafe {
        ffi::avcodec_get_supported_config(
            std::ptr::null(),
            codec.as_ptr(),
            kind,
            0,
            &mut values,
            &mut count,
        )
    };
    if ret < 0 || values.is_null() {
        return None;
    }
    // SAFETY: see above, the array holds `count` values of `T`.
    let slice = unsafe { std::slice::from_raw_parts(values as *const T, count as usize) };
    Some(slice.to_vec())
}

fn sample_format_from_ffmpeg(fmt: ffi::AVSampleFormat) -> Option<SampleFormat> {
    match fmt {
        ffi::AV_SAMPLE_FMT_U8 => Some(SampleFormat::U8),
        ffi::AV_SAMPLE_FMT_S16 => Some(SampleFormat::S16),
        ffi::AV_SAMPLE_FMT_S32 => Some(SampleFormat::S32),
        ffi::AV_SAMPLE_FMT_FLT => Some(SampleFormat::Flt),
        ffi::AV_SAMPLE_FMT_DBL => Some(SampleFormat::Dbl),
        ffi::AV_SAMPLE_FMT_S16P => Some(SampleFormat::S16p),
        ffi::AV_SAMPLE_FMT_FLTP => Some(SampleFormat::Fltp),
        _ => None,
    }
}

fn sample_format_to_ffmpeg(fmt: SampleFormat) -> ffi::AVSampleFormat {
    match fmt {
        SampleFormat::U8 => ffi::AV_SAMPLE_FMT_U8,
        SampleFormat::S16 => ffi::AV_SAMPLE_FMT_S16,
        SampleFormat::S32 => ffi::AV_SAMPLE_FMT_S32,
        SampleFormat::Flt => ffi::AV_SAMPLE_FMT_FLT,
        SampleFormat::Dbl => ffi::AV_SAMPLE_FMT_DBL,
        SampleFormat::S16p => ffi::AV_SAMPLE_FMT_S16P,
        SampleFormat::Fltp => ffi::AV_SAMPLE_FMT_FLTP,
    }
}

fn pixel_format_from_ffmpeg(fmt: ffi::AVPixelFormat) -> Option<PixelFormat> {
    match fmt {
        ffi::AV_PIX_FMT_YUV420P => Some(PixelFormat::Yuv420p),
        ffi::AV_PIX_FMT_YUV422P => Some(PixelFormat::Yuv422p),
        ffi::AV_PIX_FMT_YUV444P => Some(PixelFormat::Yuv444p),
        _ => None,
    }
}

fn pixel_format_to_ffmpeg(fmt: PixelFormat) -> ffi::AVPixelFormat {
    match fmt {
        PixelFormat::Yuv420p => ffi::AV_PIX_FMT_YUV420P,
        PixelFormat::Yuv422p => ffi::AV_PIX_FMT_YUV422P,
        PixelFormat::Yuv444p => ffi::AV_PIX_FMT_YUV444P,
    }
}

fn rational(r: Rational) -> AVRational {
    AVRational {
        num: r.num,
        den: r.den,
    }
}

fn channel_layout(layout: ChannelLayout) -> Result<AVChannelLayout, EncoderError> {
    AVChannelLayout::from_mask(layout.mask()).ok_or_else(|| {
        EncoderError::InvalidParameters(format!("channel layout {}", layout))
    })
}

/// Shared send/receive plumbing for both media types. `config` is the
/// configuration the context and frame were opened with.
struct Session<C> {
    ctx: AVCodecContext,
    frame: AVFrame,
    config: C,
}

impl<C> Session<C> {
    fn send(&mut self, filled: bool) -> Result<(), EncoderError> {
        if filled {
            self.ctx.send_frame(Some(&self.frame))?;
        } else {
            self.ctx.send_frame(None)?;
        }
        Ok(())
    }

    fn receive(&mut self, packet: &mut Packet) -> Result<ReceiveStatus, EncoderError> {
        let av_packet = match self.ctx.receive_packet() {
            Ok(p) => p,
            Err(RsmpegError::EncoderDrainError) => return Ok(ReceiveStatus::NeedsInput),
            Err(RsmpegError::EncoderFlushedError) => return Ok(ReceiveStatus::Flushed),
            Err(e) => return Err(e.into()),
        };
        let data = if av_packet.size > 0 && !av_packet.data.is_null() {
            // SAFETY: the packet owns `size` bytes at `data` until it is dropped
            // at the end of this function.
            unsafe { std::slice::from_raw_parts(av_packet.data, av_packet.size as usize) }
        } else {
            &[]
        };
        let buf = packet.buffer_mut();
        buf.clear();
        buf.try_reserve(data.len())
            .map_err(|_| EncoderError::OutOfMemory)?;
        buf.extend_from_slice(data);
        packet.set_pts((av_packet.pts != ffi::AV_NOPTS_VALUE).then_some(av_packet.pts));
        packet.set_dts((av_packet.dts != ffi::AV_NOPTS_VALUE).then_some(av_packet.dts));
        packet.set_key(av_packet.flags & ffi::AV_PKT_FLAG_KEY as i32 != 0);
        Ok(ReceiveStatus::Ready)
    }
}

/// Copy `rows` rows of `width` bytes between buffers with different strides.
///
/// # Safety
/// `dst` must be valid for `rows * dst_stride` bytes.
unsafe fn copy_rows(src: &[u8], src_stride: usize, dst: *mut u8, dst_stride: usize, width: usize, rows: usize) {
    for row in 0..rows {
        let line = &src[row * src_stride..row * src_stride + width];
        std::ptr::copy_nonoverlapping(line.as_ptr(), dst.add(row * dst_stride), width);
    }
}

/// Audio encoder backed by libavcodec.
pub struct FfmpegAudioEncoder {
    codec: AVCodecRef<'static>,
    name: String,
    sample_formats: Vec<SampleFormat>,
    sample_rates: Option<Vec<u32>>,
    channel_layouts: Option<Vec<ChannelLayout>>,
    session: Option<Session<AudioEncoderConfig>>,
}

impl FfmpegAudioEncoder {
    pub fn find(id: CodecId) -> Result<Self> {
        Ok(Self::from_codec(find_codec(id)?))
    }

    pub fn find_by_name(name: &str) -> Result<Self> {
        Ok(Self::from_codec(find_codec_by_name(name)?))
    }

    fn from_codec(codec: AVCodecRef<'static>) -> Self {
        let sample_formats = supported_config::<ffi::AVSampleFormat>(&codec, ffi::AV_CODEC_CONFIG_SAMPLE_FORMAT)
            .map(|fmts| fmts.into_iter().filter_map(sample_format_from_ffmpeg).collect())
            .unwrap_or_default();
        let sample_rates = supported_config::<c_int>(&codec, ffi::AV_CODEC_CONFIG_SAMPLE_RATE)
            .map(|rates| rates.into_iter().filter(|&r| r > 0).map(|r| r as u32).collect());
        let channel_layouts =
            supported_config::<ffi::AVChannelLayout>(&codec, ffi::AV_CODEC_CONFIG_CHANNEL_LAYOUT).map(
                |layouts| {
                    layouts
                        .into_iter()
                        .filter(|l| l.order == ffi::AV_CHANNEL_ORDER_NATIVE)
                        // SAFETY: native-order layouts store their mask in the union.
                        .map(|l| ChannelLayout(unsafe { l.u.mask }))
                        .collect()
                },
            );
        let name = codec.name().to_string_lossy().into_owned();
        Self {
            codec,
            name,
            sample_formats,
            sample_rates,
            channel_layouts,
            session: None,
        }
    }
}

impl Encoder for FfmpegAudioEncoder {
    type Frame = AudioFrame;
    type Config = AudioEncoderConfig;

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, config: &mut AudioEncoderConfig) -> Result<(), EncoderError> {
        let mut ctx = AVCodecContext::new(&self.codec);
        ctx.set_bit_rate(config.bit_rate as i64);
        ctx.set_sample_fmt(sample_format_to_ffmpeg(config.sample_format));
        ctx.set_sample_rate(config.sample_rate as i32);
        ctx.set_ch_layout(channel_layout(config.channel_layout)?.into_inner());
        ctx.set_time_base(AVRational {
            num: 1,
            den: config.sample_rate as i32,
        });
        ctx.open(None)?;

        config.frame_size = match ctx.frame_size {
            0 if config.frame_size == 0 => super::pcm::PCM_FRAME_SIZE,
            0 => config.frame_size,
            n => n as usize,
        };

        let mut frame = AVFrame::new();
        frame.set_format(sample_format_to_ffmpeg(config.sample_format));
        frame.set_nb_samples(config.frame_size as i32);
        frame.set_ch_layout(channel_layout(config.channel_layout)?.into_inner());
        frame.alloc_buffer()?;

        self.session = Some(Session {
            ctx,
            frame,
            config: config.clone(),
        });
        Ok(())
    }

    fn send_frame(&mut self, frame: Option<&AudioFrame>) -> Result<(), EncoderError> {
        let session = self.session.as_mut().ok_or(EncoderError::NotOpen)?;
        let Some(frame) = frame else {
            return session.send(false);
        };
        check_audio_frame(&session.config, frame)?;
        session.frame.make_writable()?;
        let len = frame.data().len();
        if (session.frame.linesize[0] as usize) < len {
            return Err(EncoderError::FrameMismatch(format!("{} bytes of samples", len)));
        }
        // SAFETY: plane 0 of a packed frame holds at least linesize[0] bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(frame.data().as_ptr(), session.frame.data[0], len);
        }
        session.frame.set_pts(frame.pts());
        session.send(true)
    }

    fn receive_packet(&mut self, packet: &mut Packet) -> Result<ReceiveStatus, EncoderError> {
        self.session
            .as_mut()
            .ok_or(EncoderError::NotOpen)?
            .receive(packet)
    }

    fn close(&mut self) {
        self.session = None;
    }
}

impl AudioEncoder for FfmpegAudioEncoder {
    fn sample_formats(&self) -> &[SampleFormat] {
        &self.sample_formats
    }

    fn sample_rates(&self) -> Option<&[u32]> {
        self.sample_rates.as_deref()
    }

    fn channel_layouts(&self) -> Option<&[ChannelLayout]> {
        self.channel_layouts.as_deref()
    }
}

/// Video encoder backed by libavcodec.
pub struct FfmpegVideoEncoder {
    codec: AVCodecRef<'static>,
    name: String,
    pixel_formats: Option<Vec<PixelFormat>>,
    session: Option<Session<VideoEncoderConfig>>,
}

impl FfmpegVideoEncoder {
    pub fn find(id: CodecId) -> Result<Self> {
        Ok(Self::from_codec(find_codec(id)?))
    }

    pub fn find_by_name(name: &str) -> Result<Self> {
        Ok(Self::from_codec(find_codec_by_name(name)?))
    }

    fn from_codec(codec: AVCodecRef<'static>) -> Self {
        let pixel_formats = supported_config::<ffi::AVPixelFormat>(&codec, ffi::AV_CODEC_CONFIG_PIX_FORMAT)
            .map(|fmts| fmts.into_iter().filter_map(pixel_format_from_ffmpeg).collect());
        let name = codec.name().to_string_lossy().into_owned();
        Self {
            codec,
            name,
            pixel_formats,
            session: None,
        }
    }
}

impl Encoder for FfmpegVideoEncoder {
    type Frame = VideoFrame;
    type Config = VideoEncoderConfig;

    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, config: &mut VideoEncoderConfig) -> Result<(), EncoderError> {
        let pix_fmt = pixel_format_to_ffmpeg(config.pixel_format);
        let mut ctx = AVCodecContext::new(&self.codec);
        ctx.set_bit_rate(config.bit_rate as i64);
        ctx.set_width(config.width as i32);
        ctx.set_height(config.height as i32);
        ctx.set_time_base(rational(config.time_base));
        ctx.set_framerate(rational(config.frame_rate));
        ctx.set_gop_size(config.gop_size as i32);
        ctx.set_max_b_frames(config.max_b_frames as i32);
        ctx.set_pix_fmt(pix_fmt);
        ctx.open(None)?;

        let mut frame = AVFrame::new();
        frame.set_format(pix_fmt);
        frame.set_width(config.width as i32);
        frame.set_height(config.height as i32);
        frame.alloc_buffer()?;

        self.session = Some(Session {
            ctx,
            frame,
            config: config.clone(),
        });
        Ok(())
    }

    fn send_frame(&mut self, frame: Option<&VideoFrame>) -> Result<(), EncoderError> {
        let session = self.session.as_mut().ok_or(EncoderError::NotOpen)?;
        let Some(frame) = frame else {
            return session.send(false);
        };
        check_video_frame(&session.config, frame)?;
        session.frame.make_writable()?;
        for (index, plane) in frame.planes().iter().enumerate() {
            let layout = plane.layout();
            let dst_stride = session.frame.linesize[index] as usize;
            if dst_stride < layout.width {
                return Err(EncoderError::FrameMismatch(format!(
                    "plane {} is {} bytes wide, encoder line size is {}",
                    index, layout.width, dst_stride
                )));
            }
            // SAFETY: the frame matches the opened format and size, and the
            // AVFrame was allocated for them, so plane `index` holds `height`
            // rows of `dst_stride` bytes.
            unsafe {
                copy_rows(
                    plane.buffer(),
                    layout.stride,
                    session.frame.data[index],
                    dst_stride,
                    layout.width,
                    layout.height,
                );
            }
        }
        session.frame.set_pts(frame.pts());
        session.send(true)
    }

    fn receive_packet(&mut self, packet: &mut Packet) -> Result<ReceiveStatus, EncoderError> {
        self.session
            .as_mut()
            .ok_or(EncoderError::NotOpen)?
            .receive(packet)
    }

    fn close(&mut self) {
        self.session = None;
    }
}

impl VideoEncoder for FfmpegVideoEncoder {
    fn pixel_formats(&self) -> Option<&[PixelFormat]> {
        self.pixel_formats.as_deref()
    }
}
