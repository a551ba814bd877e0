//! Benchmarks for frame production and the encode-drain loop.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use encode_driver::encoder::{PcmEncoder, RawVideoEncoder};
use encode_driver::{
    AudioPipeline, AudioSettings, FrameProducer, GradientPattern, MemorySink, VideoPipeline,
    VideoSettings,
};

fn bench_gradient_produce(c: &mut Criterion) {
    let mut group = c.benchmark_group("Gradient Produce");

    for (width, height) in [(176u32, 144u32), (352, 288), (1280, 720)] {
        let settings = VideoSettings {
            width,
            height,
            ..VideoSettings::default()
        };
        let pipeline = VideoPipeline::open(RawVideoEncoder::new(), &settings).unwrap();
        let mut pattern = GradientPattern::new(pipeline.config());
        let mut frame = pattern.alloc_frame().unwrap();

        group.throughput(Throughput::Bytes(frame.packed_len() as u64));
        group.bench_with_input(
            BenchmarkId::new("produce", format!("{}x{}", width, height)),
            &width,
            |b, _| {
                let mut index = 0u64;
                b.iter(|| {
                    pattern.produce(black_box(&mut frame), index).unwrap();
                    index += 1;
                });
            },
        );
    }

    group.finish();
}

fn bench_audio_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("Audio Pipeline");

    for delay in [0usize, 4] {
        let settings = AudioSettings {
            frame_count: 50,
            ..AudioSettings::default()
        };
        group.bench_with_input(BenchmarkId::new("pcm", delay), &delay, |b, &delay| {
            b.iter(|| {
                let mut pipeline =
                    AudioPipeline::open(PcmEncoder::new().with_delay(delay), &settings).unwrap();
                let mut sink = MemorySink::new();
                black_box(pipeline.run(&mut sink).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_video_pipeline(c: &mut Criterion) {
    let settings = VideoSettings::default();

    c.bench_function("rawvideo 25 frames 352x288", |b| {
        b.iter(|| {
            let mut pipeline = VideoPipeline::open(RawVideoEncoder::new(), &settings).unwrap();
            let mut sink = MemorySink::new();
            black_box(pipeline.run(&mut sink).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_gradient_produce,
    bench_audio_pipeline,
    bench_video_pipeline
);
criterion_main!(benches);
