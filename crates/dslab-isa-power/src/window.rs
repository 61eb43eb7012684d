//! Windowed average power reporting.

use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use csv::{Writer, WriterBuilder};

/// Default number of instructions in a reporting window.
pub const DEFAULT_WINDOW_SIZE: u64 = 1000;

/// Average power over one closed window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowRecord {
    /// Operating point active when the window closed.
    pub state: usize,
    /// Cumulative execution time when the window closed.
    pub execution_time: f64,
    /// Sequence number of the window, starting from 1.
    pub window: u64,
    /// Average power per instruction in the window.
    pub power: f64,
}

/// Counters of the currently open window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowCounters {
    instructions: u64,
    energy: f64,
    power: f64,
    count: u64,
    size: u64,
}

impl WindowCounters {
    pub fn new(size: u64) -> Self {
        Self {
            instructions: 0,
            energy: 0.,
            power: 0.,
            count: 0,
            size,
        }
    }

    /// Adds instructions and their energy to the open window.
    ///
    /// Returns the window sequence number and its average power if the window closed.
    /// A closed window leaves the counters zeroed.
    pub fn advance(&mut self, instructions: u64, energy: f64) -> Option<(u64, f64)> {
        self.instructions += instructions;
        self.energy += energy;
        if self.instructions == 0 || self.instructions < self.size {
            return None;
        }
        self.count += 1;
        self.power = self.energy / self.instructions as f64;
        let closed = (self.count, self.power);
        self.reset();
        Some(closed)
    }

    fn reset(&mut self) {
        self.instructions = 0;
        self.energy = 0.;
        self.power = 0.;
    }

    /// Instructions charged to the open window.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Energy charged to the open window.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Number of closed windows.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Receives a record every time a window closes.
pub trait WindowReporter {
    fn report(&mut self, record: &WindowRecord) -> Result<(), csv::Error>;

    fn flush(&mut self) -> Result<(), csv::Error> {
        Ok(())
    }
}

/// Writes window records as `state,execution_time,window,power` lines.
pub struct CsvWindowReporter<W: Write> {
    writer: Writer<W>,
}

impl CsvWindowReporter<File> {
    /// Creates (or truncates) the report file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, csv::Error> {
        Ok(Self {
            writer: WriterBuilder::new().has_headers(false).from_path(path)?,
        })
    }
}

impl<W: Write> CsvWindowReporter<W> {
    pub fn new(output: W) -> Self {
        Self {
            writer: WriterBuilder::new().has_headers(false).from_writer(output),
        }
    }

    /// Flushes and returns the underlying output.
    pub fn into_inner(self) -> Result<W, csv::Error> {
        self.writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))
    }
}

impl<W: Write> WindowReporter for CsvWindowReporter<W> {
    fn report(&mut self, record: &WindowRecord) -> Result<(), csv::Error> {
        self.writer.write_record(&[
            record.state.to_string(),
            format!("{:.10}", record.execution_time),
            record.window.to_string(),
            format!("{:.10}", record.power),
        ])
    }

    fn flush(&mut self) -> Result<(), csv::Error> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps window records in memory. Clones share the same log.
#[derive(Clone, Default)]
pub struct WindowLog {
    records: Rc<RefCell<Vec<WindowRecord>>>,
}

impl WindowLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<WindowRecord> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl WindowReporter for WindowLog {
    fn report(&mut self, record: &WindowRecord) -> Result<(), csv::Error> {
        self.records.borrow_mut().push(*record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_closes_at_size() {
        let mut window = WindowCounters::new(10);
        assert_eq!(window.advance(4, 8.), None);
        assert_eq!(window.advance(5, 10.), None);
        assert_eq!(window.instructions(), 9);
        assert_eq!(window.advance(1, 2.), Some((1, 2.)));
        assert_eq!(window.instructions(), 0);
        assert_eq!(window.energy(), 0.);
        assert_eq!(window.count(), 1);
    }

    #[test]
    fn test_window_overshoot_closes_once() {
        let mut window = WindowCounters::new(10);
        assert_eq!(window.advance(25, 50.), Some((1, 2.)));
        assert_eq!(window.count(), 1);
        assert_eq!(window.instructions(), 0);
    }

    #[test]
    fn test_csv_format() {
        let mut reporter = CsvWindowReporter::new(Vec::new());
        reporter
            .report(&WindowRecord {
                state: 1,
                execution_time: 0.5,
                window: 3,
                power: 40.,
            })
            .unwrap();
        let output = String::from_utf8(reporter.into_inner().unwrap()).unwrap();
        assert_eq!(output, "1,0.5000000000,3,40.0000000000\n");
    }
}
