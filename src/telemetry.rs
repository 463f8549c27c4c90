//! CSV telemetry: one row per sample, appended and flushed as it is written.
//!
//! Columns are append-only; tools reading older logs keep working when a
//! column is added at the end.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::MandalaError;
use crate::visuals::Palette;

/// Column names, in output order.
pub const COLUMNS: [&str; 13] = [
    "time_s",
    "smoothed_fps",
    "fps_inst",
    "n",
    "width",
    "height",
    "palette",
    "vsync",
    "threads",
    "ssaa",
    "render_frac",
    "sym",
    "glow",
];

/// One telemetry sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    /// Simulated time in seconds.
    pub time_s: f64,
    pub smoothed_fps: f64,
    pub fps_inst: f64,
    /// Particle count.
    pub n: usize,
    pub width: u32,
    pub height: u32,
    pub palette: Palette,
    pub vsync: bool,
    /// Effective worker count.
    pub threads: usize,
    pub ssaa: u32,
    pub render_frac: f32,
    pub sym: u32,
    pub glow: bool,
}

impl TelemetryRecord {
    /// Format as a CSV row without the trailing newline.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{:.3},{:.3},{:.3},{},{},{},{},{},{},{},{:.2},{},{}",
            self.time_s,
            self.smoothed_fps,
            self.fps_inst,
            self.n,
            self.width,
            self.height,
            self.palette.name(),
            self.vsync as u8,
            self.threads,
            self.ssaa,
            self.render_frac,
            self.sym,
            self.glow as u8,
        )
    }
}

/// CSV writer over any sink.
pub struct TelemetryLog<W: Write> {
    out: W,
    rows: u64,
}

impl TelemetryLog<Box<dyn Write>> {
    /// Create (truncate) the log file at `path` and write the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, MandalaError> {
        let file = File::create(path.as_ref()).map_err(MandalaError::Telemetry)?;
        Self::new(Box::new(BufWriter::new(file))).map_err(MandalaError::Telemetry)
    }
}

impl<W: Write> TelemetryLog<W> {
    /// Wrap `out` and write the header line.
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{}", COLUMNS.join(","))?;
        out.flush()?;
        Ok(Self { out, rows: 0 })
    }

    /// Append one row and flush it.
    pub fn write(&mut self, record: &TelemetryRecord) -> io::Result<()> {
        writeln!(self.out, "{}", record.to_csv_row())?;
        self.out.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far, excluding the header.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Unwrap the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Decides when the next sample is due, in wall-clock milliseconds.
#[derive(Debug, Clone)]
pub struct Cadence {
    every_ms: u64,
    last_ms: u64,
}

impl Cadence {
    pub fn new(every_ms: u64) -> Self {
        Self {
            every_ms: every_ms.max(1),
            last_ms: 0,
        }
    }

    /// True if a sample is due at `elapsed_ms`; marks it taken.
    pub fn due(&mut self, elapsed_ms: u64) -> bool {
        if elapsed_ms >= self.last_ms + self.every_ms {
            self.last_ms = elapsed_ms;
            true
        } else {
            false
        }
    }
}
