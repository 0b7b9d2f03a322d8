use serde::Serialize;
use std::path::PathBuf;

use crate::drivers::LoggerError;

/// All tunables for one logging run, fixed at startup. There is no runtime
/// reconfiguration: no CLI flags, environment variables, or config file.
#[derive(Clone, Debug, Serialize)]
pub struct LoggerConfig {
    /// Sample clock rate in Hz.
    pub frequency_hz: f64,
    /// Samples pulled per acquisition call.
    pub block_size: usize,
    /// Blocks averaged into one output record.
    pub inner_count: usize,
    /// Number of output records to produce.
    pub outer_count: usize,
    /// Physical channel, e.g. "Dev1/ai0".
    pub channel: String,
    pub min_volts: f64,
    pub max_volts: f64,
    /// Bound on each blocking read.
    pub read_timeout_secs: f64,
    pub output_path: PathBuf,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        // 100 samples at 100 Hz is one second per block; 60 blocks per record
        // makes each CSV row a one-minute average, and 5000 records is about
        // three and a half days of logging.
        Self {
            frequency_hz: 100.0,
            block_size: 100,
            inner_count: 60,
            outer_count: 5000,
            channel: "Dev1/ai0".to_owned(),
            min_volts: 1.0,
            max_volts: 5.0,
            read_timeout_secs: 10.0,
            output_path: PathBuf::from("dataPressureTransducer.csv"),
        }
    }
}

impl LoggerConfig {
    pub fn validate(&self) -> Result<(), LoggerError> {
        if self.frequency_hz <= 0.0 {
            return Err(LoggerError::InvalidSampleRate);
        }
        if self.block_size == 0 {
            return Err(LoggerError::EmptyBlock);
        }
        if self.inner_count == 0 || self.outer_count == 0 {
            return Err(LoggerError::EmptyWindow);
        }
        Ok(())
    }

    /// Raw samples aggregated into each output record.
    pub fn samples_per_record(&self) -> usize {
        self.block_size * self.inner_count
    }
}
