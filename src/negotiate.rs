//! Capability negotiation.
//!
//! Picks configuration values from what an encoder advertises, then opens an
//! [`EncodeSession`] with the result.

use crate::config::{AudioEncoderConfig, AudioSettings, VideoEncoderConfig, VideoSettings};
use crate::encoder::{AudioEncoder, VideoEncoder};
use crate::error::{DriverError, Result};
use crate::format::{ChannelLayout, PixelFormat, Rational, SampleFormat};
use crate::session::EncodeSession;

/// The only sample format the tone producer knows how to write.
pub const REQUIRED_SAMPLE_FORMAT: SampleFormat = SampleFormat::S16;

/// Fail unless `format` is in the advertised list.
pub fn check_sample_format<E: AudioEncoder + ?Sized>(encoder: &E, format: SampleFormat) -> Result<()> {
    if encoder.sample_formats().contains(&format) {
        Ok(())
    } else {
        Err(DriverError::unsupported_sample_format(encoder.name(), format))
    }
}

/// Closest supported rate to `preferred`, first entry winning ties.
///
/// Returns `preferred` unchanged when the encoder accepts any rate.
pub fn select_sample_rate(supported: Option<&[u32]>, preferred: u32) -> u32 {
    let Some(rates) = supported.filter(|rates| !rates.is_empty()) else {
        return preferred;
    };
    let mut best = rates[0];
    for &rate in &rates[1..] {
        if rate.abs_diff(preferred) < best.abs_diff(preferred) {
            best = rate;
        }
    }
    best
}

/// Layout with the most channels, first entry winning ties. Stereo when the
/// encoder does not advertise layouts.
pub fn select_channel_layout(supported: Option<&[ChannelLayout]>) -> ChannelLayout {
    let Some(layouts) = supported.filter(|layouts| !layouts.is_empty()) else {
        return ChannelLayout::STEREO;
    };
    let mut best = layouts[0];
    for &layout in &layouts[1..] {
        if layout.channels() > best.channels() {
            best = layout;
        }
    }
    best
}

/// Width and height must be non-zero multiples of two.
pub fn validate_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
        return Err(DriverError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Fail when the encoder advertises pixel formats and `format` is not one.
pub fn check_pixel_format<E: VideoEncoder + ?Sized>(encoder: &E, format: PixelFormat) -> Result<()> {
    match encoder.pixel_formats() {
        Some(formats) if !formats.contains(&format) => Err(DriverError::UnsupportedFormat {
            encoder: encoder.name().to_string(),
            format: format!("pixel format {}", format),
        }),
        _ => Ok(()),
    }
}

/// Build the audio configuration without opening the encoder.
///
/// `frame_size` is left at zero for the encoder to choose.
pub fn audio_config<E: AudioEncoder + ?Sized>(encoder: &E, settings: &AudioSettings) -> Result<AudioEncoderConfig> {
    settings.validate()?;
    check_sample_format(encoder, REQUIRED_SAMPLE_FORMAT)?;

    let sample_rate = select_sample_rate(encoder.sample_rates(), settings.preferred_sample_rate);
    let channel_layout = select_channel_layout(encoder.channel_layouts());

    Ok(AudioEncoderConfig {
        sample_format: REQUIRED_SAMPLE_FORMAT,
        sample_rate,
        channel_layout,
        channels: channel_layout.channels(),
        bit_rate: settings.bit_rate,
        frame_size: 0,
    })
}

/// Build the video configuration without opening the encoder.
pub fn video_config<E: VideoEncoder + ?Sized>(encoder: &E, settings: &VideoSettings) -> Result<VideoEncoderConfig> {
    settings.validate()?;
    validate_dimensions(settings.width, settings.height)?;
    check_pixel_format(encoder, settings.pixel_format)?;

    let rate = i32::try_from(settings.frame_rate).map_err(|_| {
        DriverError::InvalidSettings(format!("frame_rate {} out of range", settings.frame_rate))
    })?;
    let frame_rate = Rational::new(rate, 1);
    Ok(VideoEncoderConfig {
        pixel_format: settings.pixel_format,
        width: settings.width,
        height: settings.height,
        time_base: frame_rate.invert(),
        frame_rate,
        gop_size: settings.gop_size,
        max_b_frames: settings.max_b_frames,
        bit_rate: settings.bit_rate,
    })
}

/// Negotiate an audio configuration and open a session with it.
pub fn open_audio<E: AudioEncoder>(encoder: E, settings: &AudioSettings) -> Result<EncodeSession<E>> {
    let config = audio_config(&encoder, settings)?;
    log::info!(
        "Negotiated {}: {} {} Hz {} ({} channels), {} bps",
        encoder.name(),
        config.sample_format,
        config.sample_rate,
        config.channel_layout,
        config.channels,
        config.bit_rate
    );
    EncodeSession::open(encoder, config)
}

/// Validate the caller's video parameters and open a session with them.
pub fn open_video<E: VideoEncoder>(encoder: E, settings: &VideoSettings) -> Result<EncodeSession<E>> {
    let config = video_config(&encoder, settings)?;
    log::info!(
        "Configured {}: {} {}x{} @ {} fps, gop {}, {} b-frames, {} bps",
        encoder.name(),
        config.pixel_format,
        config.width,
        config.height,
        config.frame_rate,
        config.gop_size,
        config.max_b_frames,
        config.bit_rate
    );
    EncodeSession::open(encoder, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{AudioCapabilities, PcmEncoder, RawVideoEncoder};

    fn pcm_with(caps: AudioCapabilities) -> PcmEncoder {
        PcmEncoder::with_capabilities(caps)
    }

    #[test]
    fn test_select_sample_rate_closest() {
        let rates = [8000, 22050, 48000, 32000];
        assert_eq!(select_sample_rate(Some(&rates), 44100), 48000);
        assert_eq!(select_sample_rate(Some(&rates), 30000), 32000);
        assert_eq!(select_sample_rate(Some(&[44100]), 44100), 44100);
    }

    #[test]
    fn test_select_sample_rate_tie_keeps_first() {
        // 42000 and 46200 are both 2100 away from 44100.
        assert_eq!(select_sample_rate(Some(&[42000, 46200]), 44100), 42000);
        assert_eq!(select_sample_rate(Some(&[46200, 42000]), 44100), 46200);
    }

    #[test]
    fn test_select_sample_rate_unrestricted() {
        assert_eq!(select_sample_rate(None, 44100), 44100);
        assert_eq!(select_sample_rate(Some(&[]), 22050), 22050);
    }

    #[test]
    fn test_select_sample_rate_is_minimal_distance() {
        let rates = [96000, 11025, 44056, 44144, 16000, 7350];
        for target in [8000u32, 16000, 44100, 50000, 100000] {
            let chosen = select_sample_rate(Some(&rates), target);
            for &rate in &rates {
                assert!(chosen.abs_diff(target) <= rate.abs_diff(target));
            }
        }
    }

    #[test]
    fn test_select_channel_layout_most_channels() {
        let layouts = [
            ChannelLayout::MONO,
            ChannelLayout::FIVE_POINT_ONE,
            ChannelLayout::STEREO,
        ];
        assert_eq!(
            select_channel_layout(Some(&layouts)),
            ChannelLayout::FIVE_POINT_ONE
        );
        assert_eq!(select_channel_layout(None), ChannelLayout::STEREO);
    }

    #[test]
    fn test_select_channel_layout_tie_keeps_first() {
        let layouts = [ChannelLayout::MONO, ChannelLayout::QUAD, ChannelLayout(0x33)];
        assert_eq!(select_channel_layout(Some(&layouts)), ChannelLayout::QUAD);
    }

    #[test]
    fn test_validate_dimensions() {
        assert!(validate_dimensions(352, 288).is_ok());
        assert!(matches!(
            validate_dimensions(325, 288),
            Err(DriverError::InvalidDimensions {
                width: 325,
                height: 288
            })
        ));
        assert!(validate_dimensions(0, 288).is_err());
        assert!(validate_dimensions(352, 287).is_err());
    }

    #[test]
    fn test_audio_config_from_capabilities() {
        let encoder = pcm_with(AudioCapabilities {
            sample_formats: vec![SampleFormat::Fltp, SampleFormat::S16],
            sample_rates: Some(vec![32000, 44100, 48000]),
            channel_layouts: Some(vec![ChannelLayout::MONO, ChannelLayout::STEREO]),
        });
        let config = audio_config(&encoder, &AudioSettings::default()).unwrap();
        assert_eq!(config.sample_format, SampleFormat::S16);
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.channel_layout, ChannelLayout::STEREO);
        assert_eq!(config.channels, 2);
        assert_eq!(config.bit_rate, 64_000);
        assert_eq!(config.frame_size, 0);
    }

    #[test]
    fn test_unsupported_sample_format() {
        let encoder = pcm_with(AudioCapabilities {
            sample_formats: vec![SampleFormat::Fltp],
            sample_rates: None,
            channel_layouts: None,
        });
        let err = audio_config(&encoder, &AudioSettings::default()).unwrap_err();
        assert!(matches!(err, DriverError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_open_audio_sets_frame_size() {
        let session = open_audio(PcmEncoder::new(), &AudioSettings::default()).unwrap();
        assert_eq!(session.config().frame_size, crate::encoder::pcm::PCM_FRAME_SIZE);
        assert_eq!(session.config().sample_rate, 44100);
    }

    #[test]
    fn test_video_config_time_base() {
        let config = video_config(&RawVideoEncoder::new(), &VideoSettings::default()).unwrap();
        assert_eq!(config.time_base, Rational::new(1, 25));
        assert_eq!(config.frame_rate, Rational::new(25, 1));
        assert_eq!(config.gop_size, 10);
        assert_eq!(config.max_b_frames, 1);
    }

    #[test]
    fn test_video_frame_rate_out_of_range() {
        let settings = VideoSettings {
            frame_rate: 3_000_000_000,
            ..VideoSettings::default()
        };
        let err = video_config(&RawVideoEncoder::new(), &settings).unwrap_err();
        assert!(matches!(err, DriverError::InvalidSettings(_)));
    }

    #[test]
    fn test_video_odd_width_rejected() {
        let settings = VideoSettings {
            width: 325,
            ..VideoSettings::default()
        };
        let err = open_video(RawVideoEncoder::new(), &settings).err().unwrap();
        assert!(matches!(err, DriverError::InvalidDimensions { .. }));
    }
}
