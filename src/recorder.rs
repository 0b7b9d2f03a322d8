use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Append-only destination for output records. One line per call, never read
/// back by the pipeline.
pub trait RecordSink {
    fn write_header(&mut self) -> io::Result<()>;
    fn append(&mut self, timestamp: &str, psi: f64) -> io::Result<()>;
}

/// CSV file sink. Creates (or truncates) the file up front and flushes on
/// drop, so rows written before a mid-run failure always reach disk.
pub struct CsvRecorder {
    writer: BufWriter<File>,
}

impl CsvRecorder {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl RecordSink for CsvRecorder {
    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "Date and Time , Pressure [PSI]")
    }

    fn append(&mut self, timestamp: &str, psi: f64) -> io::Result<()> {
        writeln!(self.writer, "{timestamp},{psi:.4}")?;
        self.writer.flush()
    }
}

impl Drop for CsvRecorder {
    fn drop(&mut self) {
        self.writer.flush().ok();
    }
}

/// Capturing sink for tests.
#[derive(Default)]
pub struct MemorySink {
    pub header_written: bool,
    pub records: Vec<(String, f64)>,
}

impl RecordSink for MemorySink {
    fn write_header(&mut self) -> io::Result<()> {
        self.header_written = true;
        Ok(())
    }

    fn append(&mut self, timestamp: &str, psi: f64) -> io::Result<()> {
        self.records.push((timestamp.to_owned(), psi));
        Ok(())
    }
}
