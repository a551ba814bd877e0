//! Encode a moving gradient to a raw video elementary stream.
//!
//! The codec is looked up by name: `rawvideo` is always available, libavcodec
//! encoders such as `mpeg1video` need the `ffmpeg` feature.

use anyhow::Context;
use encode_driver::{encoder, DriverError, FileSink, VideoPipeline, VideoSettings};
use std::path::Path;
use std::process::ExitCode;

const SETTINGS_ENV: &str = "ENCODE_DRIVER_SETTINGS";

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}

fn load_settings() -> anyhow::Result<VideoSettings> {
    match std::env::var_os(SETTINGS_ENV) {
        Some(path) => {
            let path = Path::new(&path);
            VideoSettings::load(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))
        }
        None => Ok(VideoSettings::default()),
    }
}

fn run(output: &str, codec: &str) -> anyhow::Result<()> {
    let settings = load_settings()?;
    let encoder = encoder::find_video_encoder_by_name(codec)?;

    let mut pipeline = VideoPipeline::open(encoder, &settings)
        .with_context(|| format!("could not open codec {}", codec))?;
    let mut sink = FileSink::create(output)?;
    let report = pipeline.run(&mut sink)?;

    log::info!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let (Some(output), Some(codec)) = (args.get(1), args.get(2)) else {
        let program = args.first().map_or("encode_video", String::as_str);
        let usage = DriverError::Usage(format!("{} <output file> <codec name>", program));
        eprintln!("{}", usage);
        return ExitCode::FAILURE;
    };

    match run(output, codec) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
