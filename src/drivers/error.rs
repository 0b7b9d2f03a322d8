use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("sampling frequency must be greater than zero")]
    InvalidSampleRate,
    #[error("block size must be greater than zero")]
    EmptyBlock,
    #[error("window counts must be greater than zero")]
    EmptyWindow,
    #[error("acquisition returned no samples within the timeout")]
    EmptyRead,
    #[error("acquisition failed: {0}")]
    Acquisition(anyhow::Error),
    #[error("failed to write output record: {0}")]
    Sink(#[from] std::io::Error),
}
