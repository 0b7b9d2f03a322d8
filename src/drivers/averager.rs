use crate::drivers::LoggerError;

/// Affine conversion for the 1-5 V pressure transducer: 1 V reads as 0 PSI,
/// 5 V reads as 15 PSI.
pub fn volts_to_psi(volts: f64) -> f64 {
    (15.0 / 4.0) * (volts - 1.0)
}

/// Unweighted arithmetic mean, sum then divide.
pub fn block_mean(samples: &[f64]) -> Result<f64, LoggerError> {
    if samples.is_empty() {
        return Err(LoggerError::EmptyRead);
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Two-level rolling averager: a reusable block of raw voltage samples and a
/// window of per-block PSI means. Both buffers are fixed-size and overwritten
/// in place each iteration; neither is ever shared across threads.
pub struct WindowAverager {
    block: Vec<f64>,
    window: Vec<f64>,
    filled: usize,
}

impl WindowAverager {
    pub fn new(block_size: usize, window_len: usize) -> Result<Self, LoggerError> {
        if block_size == 0 {
            return Err(LoggerError::EmptyBlock);
        }
        if window_len == 0 {
            return Err(LoggerError::EmptyWindow);
        }
        Ok(Self {
            block: vec![0.0; block_size],
            window: vec![0.0; window_len],
            filled: 0,
        })
    }

    /// The raw sample block, handed to the source to refresh in place.
    pub fn block_mut(&mut self) -> &mut [f64] {
        &mut self.block
    }

    /// Reduces the first `actual` samples of the block to a PSI mean and
    /// stores it as the next window entry. A short read truncates the mean
    /// denominator to the samples actually delivered rather than averaging
    /// over stale tail slots.
    pub fn push_block(&mut self, actual: usize) -> Result<f64, LoggerError> {
        let count = actual.min(self.block.len());
        let psi = volts_to_psi(block_mean(&self.block[..count])?);
        let slot = self.filled % self.window.len();
        self.window[slot] = psi;
        self.filled += 1;
        Ok(psi)
    }

    pub fn is_full(&self) -> bool {
        self.filled >= self.window.len()
    }

    /// Mean of the block means accumulated so far, then resets the window
    /// for the next outer iteration.
    pub fn take_window_mean(&mut self) -> Result<f64, LoggerError> {
        let count = self.filled.min(self.window.len());
        let mean = block_mean(&self.window[..count])?;
        self.filled = 0;
        Ok(mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_block_at_one_volt_is_zero_psi() {
        let mut avg = WindowAverager::new(4, 1).unwrap();
        avg.block_mut().copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);
        let psi = avg.push_block(4).unwrap();
        assert!(psi.abs() < 1e-12);
    }

    #[test]
    fn two_sample_block_converts_to_psi() {
        let mut avg = WindowAverager::new(2, 1).unwrap();
        avg.block_mut().copy_from_slice(&[2.0, 4.0]);
        let psi = avg.push_block(2).unwrap();
        // mean 3.0 V -> (15/4) * (3 - 1) = 7.5 PSI
        assert!((psi - 7.5).abs() < 1e-12);
    }

    #[test]
    fn window_mean_averages_block_means() {
        let mut avg = WindowAverager::new(1, 3).unwrap();
        for volts in [1.0, 3.0, 2.0] {
            avg.block_mut()[0] = volts;
            avg.push_block(1).unwrap();
        }
        assert!(avg.is_full());
        // block means 0.0, 7.5, 3.75 PSI -> window mean 3.75
        let mean = avg.take_window_mean().unwrap();
        assert!((mean - 3.75).abs() < 1e-12);
    }

    #[test]
    fn short_read_truncates_denominator() {
        let mut avg = WindowAverager::new(4, 1).unwrap();
        let block = avg.block_mut();
        block[0] = 2.0;
        block[1] = 4.0;
        block[2] = 99.0; // stale, must not contribute
        block[3] = 99.0;
        let psi = avg.push_block(2).unwrap();
        assert!((psi - 7.5).abs() < 1e-12);
    }

    #[test]
    fn empty_read_is_an_error() {
        let mut avg = WindowAverager::new(4, 1).unwrap();
        assert!(matches!(avg.push_block(0), Err(LoggerError::EmptyRead)));
    }

    #[test]
    fn zero_sized_buffers_are_rejected() {
        assert!(matches!(
            WindowAverager::new(0, 3),
            Err(LoggerError::EmptyBlock)
        ));
        assert!(matches!(
            WindowAverager::new(3, 0),
            Err(LoggerError::EmptyWindow)
        ));
    }
}
