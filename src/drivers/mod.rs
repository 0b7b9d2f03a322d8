// src/drivers/mod.rs
pub mod averager;
pub mod error;
pub mod pipeline;
pub mod source;

pub use averager::{block_mean, volts_to_psi, WindowAverager};
pub use error::LoggerError;
pub use pipeline::LoggerPipeline;
pub use source::{ManualSource, SampleSource};
