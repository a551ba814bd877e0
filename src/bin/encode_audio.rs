//! Encode a test tone to a raw audio elementary stream.
//!
//! Settings can be overridden with a JSON file named by
//! `ENCODE_DRIVER_SETTINGS`; log output is controlled through `RUST_LOG`.

use anyhow::Context;
use encode_driver::{encoder, AudioPipeline, AudioSettings, CodecId, DriverError, FileSink};
use std::path::Path;
use std::process::ExitCode;

const SETTINGS_ENV: &str = "ENCODE_DRIVER_SETTINGS";

#[cfg(feature = "ffmpeg")]
const AUDIO_CODEC: CodecId = CodecId::Mp2;
#[cfg(not(feature = "ffmpeg"))]
const AUDIO_CODEC: CodecId = CodecId::PcmS16le;

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}

fn load_settings() -> anyhow::Result<AudioSettings> {
    match std::env::var_os(SETTINGS_ENV) {
        Some(path) => {
            let path = Path::new(&path);
            AudioSettings::load(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))
        }
        None => Ok(AudioSettings::default()),
    }
}

fn run(output: &str) -> anyhow::Result<()> {
    let settings = load_settings()?;
    let encoder = encoder::find_audio_encoder(AUDIO_CODEC)?;

    // The output file is only created once the encoder is open, and is closed
    // before it.
    let mut pipeline = AudioPipeline::open(encoder, &settings)?;
    let mut sink = FileSink::create(output)?;
    let report = pipeline.run(&mut sink)?;

    log::info!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let Some(output) = args.get(1) else {
        let program = args.first().map_or("encode_audio", String::as_str);
        eprintln!("{}", DriverError::Usage(format!("{} <output file>", program)));
        return ExitCode::FAILURE;
    };

    match run(output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
