// src/main.rs
mod config;
mod drivers;
mod nidaq;
mod recorder;

use anyhow::Result;
use log::{error, info};

use config::LoggerConfig;
use drivers::LoggerPipeline;
use nidaq::NidaqSession;
use recorder::CsvRecorder;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = LoggerConfig::default();
    info!("starting with config {}", serde_json::to_string(&config)?);

    let session = NidaqSession::open(&config)?;
    let recorder = CsvRecorder::create(&config.output_path)?;
    let mut pipeline = LoggerPipeline::new(session, recorder, &config)?;
    pipeline.run()?;

    info!("done: {} records written", config.outer_count);
    Ok(())
}
