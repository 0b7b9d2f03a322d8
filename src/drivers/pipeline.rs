use chrono::Local;
use log::info;

use crate::config::LoggerConfig;
use crate::drivers::averager::WindowAverager;
use crate::drivers::error::LoggerError;
use crate::drivers::source::SampleSource;
use crate::recorder::RecordSink;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// High level acquisition loop: pulls fixed-size sample blocks from the
/// source, feeds them through the windowed averager, and appends one
/// timestamped record to the sink per completed window.
///
/// The first failing read or write aborts the whole remaining sequence;
/// records already appended stay on disk.
pub struct LoggerPipeline<S: SampleSource, R: RecordSink> {
    source: S,
    sink: R,
    averager: WindowAverager,
    inner_count: usize,
    outer_count: usize,
}

impl<S: SampleSource, R: RecordSink> LoggerPipeline<S, R> {
    pub fn new(source: S, sink: R, config: &LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;
        Ok(Self {
            source,
            sink,
            averager: WindowAverager::new(config.block_size, config.inner_count)?,
            inner_count: config.inner_count,
            outer_count: config.outer_count,
        })
    }

    /// Writes the CSV header and produces exactly one record per outer
    /// iteration, `outer_count` in total.
    pub fn run(&mut self) -> Result<(), LoggerError> {
        self.sink.write_header()?;
        for record in 0..self.outer_count {
            let mean = self.collect_window()?;
            let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
            info!(
                "record {}/{}: window mean {mean:.4} PSI",
                record + 1,
                self.outer_count
            );
            self.sink.append(&timestamp, mean)?;
        }
        Ok(())
    }

    fn collect_window(&mut self) -> Result<f64, LoggerError> {
        for _ in 0..self.inner_count {
            let actual = self.source.read_block(self.averager.block_mut())?;
            let psi = self.averager.push_block(actual)?;
            info!("running mean {psi:.4} PSI from {actual} samples");
        }
        self.averager.take_window_mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::ManualSource;
    use crate::recorder::MemorySink;

    fn config(block_size: usize, inner: usize, outer: usize) -> LoggerConfig {
        LoggerConfig {
            block_size,
            inner_count: inner,
            outer_count: outer,
            ..LoggerConfig::default()
        }
    }

    #[test]
    fn one_record_per_outer_iteration() {
        let blocks: Vec<Vec<f64>> = (0..6).map(|_| vec![1.0, 1.0]).collect();
        let source = ManualSource::new(blocks);
        let mut pipeline =
            LoggerPipeline::new(source, MemorySink::default(), &config(2, 3, 2)).unwrap();
        pipeline.run().unwrap();
        let sink = &pipeline.sink;
        assert!(sink.header_written);
        assert_eq!(sink.records.len(), 2);
    }

    #[test]
    fn record_value_is_mean_of_block_means() {
        // blocks averaging 1 V, 3 V, 2 V -> 0.0, 7.5, 3.75 PSI -> 3.75
        let source = ManualSource::new(vec![
            vec![1.0, 1.0],
            vec![2.0, 4.0],
            vec![1.5, 2.5],
        ]);
        let mut pipeline =
            LoggerPipeline::new(source, MemorySink::default(), &config(2, 3, 1)).unwrap();
        pipeline.run().unwrap();
        let (_, value) = &pipeline.sink.records[0];
        assert!((value - 3.75).abs() < 1e-12);
    }

    #[test]
    fn reruns_on_identical_input_match() {
        let make = || {
            ManualSource::new(vec![
                vec![1.2, 1.4, 1.6],
                vec![2.0, 2.2, 2.4],
                vec![3.0, 3.1, 3.2],
                vec![1.0, 1.1, 1.2],
            ])
        };
        let run = |source| {
            let mut pipeline =
                LoggerPipeline::new(source, MemorySink::default(), &config(3, 2, 2)).unwrap();
            pipeline.run().unwrap();
            pipeline
                .sink
                .records
                .iter()
                .map(|(_, v)| *v)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(make()), run(make()));
    }

    #[test]
    fn exhausted_source_aborts_the_sequence() {
        // Two blocks available but the run needs four; the third read fails
        // and the one completed record survives.
        let source = ManualSource::new(vec![vec![2.0], vec![2.0]]);
        let mut pipeline =
            LoggerPipeline::new(source, MemorySink::default(), &config(1, 2, 2)).unwrap();
        assert!(matches!(pipeline.run(), Err(LoggerError::EmptyRead)));
        assert_eq!(pipeline.sink.records.len(), 1);
    }

    #[test]
    fn failure_before_first_record_leaves_only_header() {
        let source = ManualSource::new(vec![]);
        let mut pipeline =
            LoggerPipeline::new(source, MemorySink::default(), &config(1, 1, 1)).unwrap();
        assert!(pipeline.run().is_err());
        assert!(pipeline.sink.header_written);
        assert!(pipeline.sink.records.is_empty());
    }

    #[test]
    fn timestamps_use_wall_clock_format() {
        let source = ManualSource::new(vec![vec![1.0]]);
        let mut pipeline =
            LoggerPipeline::new(source, MemorySink::default(), &config(1, 1, 1)).unwrap();
        pipeline.run().unwrap();
        let (timestamp, _) = &pipeline.sink.records[0];
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(timestamp.len(), 19);
        assert_eq!(&timestamp[4..5], "-");
        assert_eq!(&timestamp[10..11], " ");
        assert_eq!(&timestamp[13..14], ":");
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let source = ManualSource::new(vec![]);
        let result = LoggerPipeline::new(source, MemorySink::default(), &config(0, 3, 1));
        assert!(matches!(result, Err(LoggerError::EmptyBlock)));
    }
}
