//! Run results and the append-only log they are written to
//!
//! Each finished run becomes one four-line text record:
//!
//! ```text
//! <track name>
//! <controller name>
//! Time: <seconds>
//! Collisions: <count>
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Outcome of one run from start line to finish line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRunResult {
    pub track_name: String,
    pub controller_name: String,
    pub elapsed_seconds: f32,
    pub collision_count: u32,
}

impl SimulationRunResult {
    /// Text record as appended to the results log (trailing newline included)
    #[must_use]
    pub fn to_record(&self) -> String {
        format!(
            "{}\n{}\nTime: {}\nCollisions: {}\n",
            self.track_name, self.controller_name, self.elapsed_seconds, self.collision_count
        )
    }

    /// Parse every record in `text`, four lines each. Only blank lines at
    /// the very end are ignored; the track and controller lines are taken
    /// as written, even when empty.
    ///
    /// # Errors
    ///
    /// Returns an error if a record is truncated or a field is malformed
    pub fn parse_records(text: &str) -> Result<Vec<Self>, ResultsError> {
        let mut lines: Vec<&str> = text.lines().collect();
        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
        }
        if lines.len() % 4 != 0 {
            return Err(ResultsError::Malformed(format!(
                "expected records of 4 lines, found {} lines",
                lines.len()
            )));
        }

        lines
            .chunks(4)
            .map(|chunk| {
                let elapsed_seconds = field(chunk[2], "Time:")?
                    .parse::<f32>()
                    .map_err(|e| ResultsError::Malformed(format!("{}: {e}", chunk[2])))?;
                let collision_count = field(chunk[3], "Collisions:")?
                    .parse::<u32>()
                    .map_err(|e| ResultsError::Malformed(format!("{}: {e}", chunk[3])))?;

                Ok(Self {
                    track_name: chunk[0].to_string(),
                    controller_name: chunk[1].to_string(),
                    elapsed_seconds,
                    collision_count,
                })
            })
            .collect()
    }
}

fn field<'a>(line: &'a str, label: &str) -> Result<&'a str, ResultsError> {
    line.strip_prefix(label)
        .map(str::trim)
        .ok_or_else(|| ResultsError::Malformed(format!("expected `{label}` in `{line}`")))
}

/// Destination for finished runs.
pub trait ResultsSink: std::fmt::Debug {
    /// Persist one result.
    ///
    /// # Errors
    ///
    /// Returns an error if the result could not be stored
    fn append(&mut self, result: &SimulationRunResult) -> Result<(), ResultsError>;
}

/// Text file that accumulates records across runs.
#[derive(Debug, Clone)]
pub struct ResultsLog {
    path: PathBuf,
}

impl ResultsLog {
    /// File name used by the simulation scenes
    pub const DEFAULT_FILE_NAME: &'static str = "Time.txt";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every record in the log; a missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds a malformed record
    pub fn read_all(&self) -> Result<Vec<SimulationRunResult>, ResultsError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content =
            fs::read_to_string(&self.path).map_err(|e| ResultsError::IoError(e.to_string()))?;
        SimulationRunResult::parse_records(&content)
    }
}

impl Default for ResultsLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FILE_NAME)
    }
}

impl ResultsSink for ResultsLog {
    fn append(&mut self, result: &SimulationRunResult) -> Result<(), ResultsError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ResultsError::IoError(e.to_string()))?;
        file.write_all(result.to_record().as_bytes())
            .map_err(|e| ResultsError::IoError(e.to_string()))?;
        log::info!("Appended run result to {}", self.path.display());
        Ok(())
    }
}

/// In-memory sink, handy for tests and embedding hosts.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub records: Vec<SimulationRunResult>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultsSink for MemorySink {
    fn append(&mut self, result: &SimulationRunResult) -> Result<(), ResultsError> {
        self.records.push(result.clone());
        Ok(())
    }
}

/// Errors that can occur while storing or reading results
#[derive(Debug, Clone)]
pub enum ResultsError {
    /// IO error
    IoError(String),
    /// A record did not follow the four-line format
    Malformed(String),
}

impl std::fmt::Display for ResultsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::Malformed(e) => write!(f, "Malformed results record: {e}"),
        }
    }
}

impl std::error::Error for ResultsError {}
