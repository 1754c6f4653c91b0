//! JSON-lines replay driver for the convergence sensor.
//!
//! Each input line is one tagged object:
//!
//! ```text
//! {"type":"event","timestamp":12.0,"entities":[{"id":"a","category":"host"}],"features":[...]}
//! {"type":"flush"}
//! {"type":"snapshot"}
//! ```
//!
//! `flush` runs a window and writes its `WindowReport` as one JSON line;
//! `snapshot` writes the current `GraphSnapshot`. Bad lines are logged and
//! skipped so one malformed record never stops a replay.

use std::io::{BufRead, Write};

use confluence_sensor::{Event, Sensor, WindowBudget};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Result type for replay operations.
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Failures that stop a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Input could not be read or output could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One line of replay input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayLine {
    Event(Event),
    Flush,
    Snapshot,
}

/// Counters for a finished replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReplayStats {
    pub lines: usize,
    pub events: usize,
    /// Malformed lines and refused events
    pub skipped: usize,
    pub windows: usize,
    pub aborted: usize,
}

/// Feeds lines into a sensor and writes reports to `out`.
pub struct Replay<W: Write> {
    sensor: Sensor,
    out: W,
    stats: ReplayStats,
}

impl<W: Write> Replay<W> {
    pub fn new(sensor: Sensor, out: W) -> Self {
        Self {
            sensor,
            out,
            stats: ReplayStats::default(),
        }
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    pub fn sensor(&self) -> &Sensor {
        &self.sensor
    }

    /// Process one input line.
    pub fn line(&mut self, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        self.stats.lines += 1;

        let parsed: ReplayLine = match serde_json::from_str(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping line {}: {}", self.stats.lines, e);
                self.stats.skipped += 1;
                return Ok(());
            }
        };

        match parsed {
            ReplayLine::Event(event) => match self.sensor.ingest(event) {
                Ok(()) => self.stats.events += 1,
                Err(e) => {
                    warn!("Rejected event on line {}: {}", self.stats.lines, e);
                    self.stats.skipped += 1;
                }
            },
            ReplayLine::Flush => self.flush()?,
            ReplayLine::Snapshot => {
                serde_json::to_writer(&mut self.out, &self.sensor.snapshot())?;
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    /// Run a window and write its report. An aborted window is logged, not
    /// fatal.
    pub fn flush(&mut self) -> Result<()> {
        match self.sensor.run_window(&WindowBudget::unlimited()) {
            Ok(report) => {
                serde_json::to_writer(&mut self.out, &report)?;
                writeln!(self.out)?;
                self.stats.windows += 1;
            }
            Err(e) => {
                warn!("Window aborted: {}", e);
                self.stats.aborted += 1;
            }
        }
        Ok(())
    }

    /// Read every line of `input`, then flush any trailing events.
    pub fn run<R: BufRead>(mut self, input: R) -> Result<(ReplayStats, W)> {
        for line in input.lines() {
            self.line(&line?)?;
        }
        if self.sensor.pending() > 0 {
            debug!("Flushing {} trailing events", self.sensor.pending());
            self.flush()?;
        }
        self.out.flush()?;
        Ok((self.stats, self.out))
    }
}
