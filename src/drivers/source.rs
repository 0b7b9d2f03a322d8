use std::collections::VecDeque;

use crate::drivers::LoggerError;

/// Trait representing something that can fill a block of voltage samples on
/// demand. The read may block up to the source's timeout and may return fewer
/// samples than requested; the returned count is how many slots of `out` were
/// actually refreshed.
pub trait SampleSource {
    fn read_block(&mut self, out: &mut [f64]) -> Result<usize, LoggerError>;
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<Vec<f64>>,
}

impl ManualSource {
    pub fn new(blocks: impl IntoIterator<Item = Vec<f64>>) -> Self {
        Self {
            queue: blocks.into_iter().collect(),
        }
    }
}

impl SampleSource for ManualSource {
    fn read_block(&mut self, out: &mut [f64]) -> Result<usize, LoggerError> {
        let Some(block) = self.queue.pop_front() else {
            return Err(LoggerError::EmptyRead);
        };
        let count = block.len().min(out.len());
        out[..count].copy_from_slice(&block[..count]);
        Ok(count)
    }
}
