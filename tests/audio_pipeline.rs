//! Integration tests for the audio pipeline.

mod common;

use common::{packet_index, ScriptedEncoder, PAYLOAD_BYTES};
use encode_driver::Sink;
use std::cell::Cell;
use std::io;
use std::rc::Rc;
use encode_driver::encoder::{self, AudioCapabilities};
use encode_driver::{
    AudioPipeline, AudioSettings, ChannelLayout, CodecId, DriverError, ErrorKind, MemorySink,
    SampleFormat, ToneGenerator,
};

/// Split the sink contents back into the individual writes.
fn writes(sink: &MemorySink) -> Vec<&[u8]> {
    let mut start = 0;
    sink.write_log()
        .iter()
        .map(|&end| {
            let chunk = &sink.data()[start..end];
            start = end;
            chunk
        })
        .collect()
}

#[test]
fn test_single_rate_encoder_end_to_end() {
    let encoder = ScriptedEncoder::s16(Some(vec![44_100]));
    let settings = AudioSettings::default();
    let mut pipeline = AudioPipeline::open(encoder, &settings).unwrap();
    assert_eq!(pipeline.config().sample_rate, 44_100);
    assert_eq!(pipeline.config().channels, 2);

    let mut sink = MemorySink::new();
    let report = pipeline.run(&mut sink).unwrap();

    assert_eq!(report.frames, 200);
    assert!(report.packets <= 201);
    assert!(!sink.is_empty());
    assert_eq!(sink.len() as u64, report.bytes);
    assert!(sink.write_log().windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_packets_written_in_emission_order() {
    let encoder = ScriptedEncoder::s16(None).batching(3);
    let settings = AudioSettings {
        frame_count: 20,
        ..AudioSettings::default()
    };
    let mut sink = MemorySink::new();
    let report = AudioPipeline::open(encoder, &settings)
        .unwrap()
        .run(&mut sink)
        .unwrap();

    // Six full batches plus the partial one released by the flush.
    assert_eq!(report.packets, 7);
    let indices: Vec<u64> = writes(&sink).iter().map(|w| packet_index(w)).collect();
    assert_eq!(indices, (0..7).collect::<Vec<_>>());
}

#[test]
fn test_tone_reaches_encoder() {
    let encoder = ScriptedEncoder::s16(None);
    let settings = AudioSettings {
        frame_count: 1,
        ..AudioSettings::default()
    };
    let mut pipeline = AudioPipeline::open(encoder, &settings).unwrap();
    let tone = ToneGenerator::from_settings(pipeline.config(), &settings);

    let mut sink = MemorySink::new();
    pipeline.run(&mut sink).unwrap();

    let payload = &sink.data()[8..8 + PAYLOAD_BYTES];
    let s1 = tone.sample(1).to_le_bytes();
    assert_eq!(payload, &[0, 0, 0, 0, s1[0], s1[1], s1[0], s1[1]]);
}

#[test]
fn test_negotiation_prefers_closest_rate_and_widest_layout() {
    let encoder = ScriptedEncoder::s16(Some(vec![8_000, 48_000, 32_000])).with_layouts(vec![
        ChannelLayout::MONO,
        ChannelLayout::FIVE_POINT_ONE,
        ChannelLayout::STEREO,
    ]);
    let settings = AudioSettings {
        frame_count: 2,
        ..AudioSettings::default()
    };
    let mut pipeline = AudioPipeline::open(encoder, &settings).unwrap();
    assert_eq!(pipeline.config().sample_rate, 48_000);
    assert_eq!(pipeline.config().channel_layout, ChannelLayout::FIVE_POINT_ONE);
    assert_eq!(pipeline.config().channels, 6);

    let mut sink = MemorySink::new();
    assert_eq!(pipeline.run(&mut sink).unwrap().packets, 2);
}

#[test]
fn test_unsupported_sample_format_fails_before_open() {
    let encoder = ScriptedEncoder::new(AudioCapabilities {
        sample_formats: vec![SampleFormat::Fltp, SampleFormat::Flt],
        sample_rates: None,
        channel_layouts: None,
    });
    let closes = encoder.close_counter();

    let err = AudioPipeline::open(encoder, &AudioSettings::default())
        .err()
        .unwrap();
    assert!(matches!(err, DriverError::UnsupportedFormat { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(closes.get(), 0);
}

#[test]
fn test_builtin_pcm_stream_length() {
    let encoder = encoder::find_audio_encoder(CodecId::PcmS16le).unwrap();
    let settings = AudioSettings {
        frame_count: 4,
        ..AudioSettings::default()
    };
    let mut pipeline = AudioPipeline::open(encoder, &settings).unwrap();
    let frame_bytes = pipeline.config().frame_size * 2 * 2;

    let mut sink = MemorySink::new();
    let report = pipeline.run(&mut sink).unwrap();
    assert_eq!(report.codec, "pcm_s16le");
    assert_eq!(sink.len(), 4 * frame_bytes);
    assert_eq!(sink.write_log().len(), 4);
}

#[test]
fn test_invalid_settings_rejected() {
    let settings = AudioSettings {
        frame_count: 0,
        ..AudioSettings::default()
    };
    let err = AudioPipeline::open(ScriptedEncoder::s16(None), &settings)
        .err()
        .unwrap();
    assert!(matches!(err, DriverError::InvalidSettings(_)));
}

/// Sink that records how many encoder closes had happened when it was dropped.
struct ClosingSink {
    inner: MemorySink,
    encoder_closes: Rc<Cell<usize>>,
    closes_at_drop: Rc<Cell<Option<usize>>>,
}

impl Sink for ClosingSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.inner.write(bytes)
    }
}

impl Drop for ClosingSink {
    fn drop(&mut self) {
        self.closes_at_drop.set(Some(self.encoder_closes.get()));
    }
}

#[test]
fn test_sink_released_before_encoder() {
    let encoder = ScriptedEncoder::s16(None);
    let closes = encoder.close_counter();
    let closes_at_drop = Rc::new(Cell::new(None));
    let settings = AudioSettings {
        frame_count: 3,
        ..AudioSettings::default()
    };

    {
        let mut pipeline = AudioPipeline::open(encoder, &settings).unwrap();
        let mut sink = ClosingSink {
            inner: MemorySink::new(),
            encoder_closes: Rc::clone(&closes),
            closes_at_drop: Rc::clone(&closes_at_drop),
        };
        pipeline.run(&mut sink).unwrap();
        assert_eq!(closes.get(), 0);

        let err = pipeline.run(&mut sink).unwrap_err();
        assert!(matches!(err, DriverError::AlreadyFlushed));
    }

    assert_eq!(closes_at_drop.get(), Some(0));
    assert_eq!(closes.get(), 1);
}
