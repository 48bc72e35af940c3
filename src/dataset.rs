//! CSV dataset loading for traffic samples
//!
//! The trainer reads a comma-separated file; the segment service sniffs the
//! delimiter from the header line. Both share the column names and the
//! header validation defined here.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

pub const TIME_STEP: &str = "time_step";
pub const ROAD_SEGMENT_ID: &str = "road_segment_id";
pub const LOCAL_CAR_DENSITY: &str = "local_car_density";
pub const AVERAGE_SPEED_KMPH: &str = "average_speed_kmph";
pub const BRAKE_EVENTS: &str = "brake_events";
pub const PHANTOM_JAM_FLAG: &str = "phantom_jam_flag";

/// Number of detector features per sample
pub const N_FEATURES: usize = 3;

/// Detector feature columns, in feature-vector order
pub const FEATURE_COLUMNS: [&str; N_FEATURES] =
    [LOCAL_CAR_DENSITY, AVERAGE_SPEED_KMPH, BRAKE_EVENTS];

/// Columns the trainer requires
pub const TRAFFIC_COLUMNS: [&str; 4] = [
    LOCAL_CAR_DENSITY,
    AVERAGE_SPEED_KMPH,
    BRAKE_EVENTS,
    PHANTOM_JAM_FLAG,
];

/// Columns the segment service requires
pub const SEGMENT_COLUMNS: [&str; 6] = [
    TIME_STEP,
    ROAD_SEGMENT_ID,
    LOCAL_CAR_DENSITY,
    AVERAGE_SPEED_KMPH,
    BRAKE_EVENTS,
    PHANTOM_JAM_FLAG,
];

/// Delimiters considered when sniffing, in tie-break order
const SNIFF_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Errors raised while loading a dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset must contain columns {required:?} (missing: {missing:?})")]
    Schema {
        required: Vec<String>,
        missing: Vec<String>,
    },

    #[error("Invalid value {value:?} in column '{column}' at row {row}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, DatasetError>;

/// How the field delimiter is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Fixed(u8),
    Sniff,
}

/// One labeled row of the traffic dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficSample {
    pub local_car_density: f64,
    pub average_speed_kmph: f64,
    pub brake_events: f64,
    pub phantom_jam_flag: bool,
}

impl TrafficSample {
    /// Feature vector in [`FEATURE_COLUMNS`] order
    pub fn features(&self) -> [f64; N_FEATURES] {
        [
            self.local_car_density,
            self.average_speed_kmph,
            self.brake_events,
        ]
    }

    pub fn is_jam(&self) -> bool {
        self.phantom_jam_flag
    }
}

/// Pick the delimiter that occurs most often in the header line.
///
/// Falls back to a comma when no candidate appears.
pub fn sniff_delimiter(header_line: &str) -> u8 {
    let mut best = (b',', 0usize);
    for candidate in SNIFF_CANDIDATES {
        let count = header_line.bytes().filter(|&b| b == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}

/// Build a CSV reader over in-memory content with the requested delimiter
pub(crate) fn csv_reader(content: &str, delimiter: Delimiter) -> csv::Reader<&[u8]> {
    let delimiter = match delimiter {
        Delimiter::Fixed(d) => d,
        Delimiter::Sniff => sniff_delimiter(content.lines().next().unwrap_or_default()),
    };
    tracing::debug!(delimiter = %(delimiter as char).escape_default(), "CSV delimiter");

    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes())
}

/// Resolve the positions of `required` columns, failing with every missing name
pub(crate) fn require_columns(
    headers: &csv::StringRecord,
    required: &[&str],
) -> Result<Vec<usize>> {
    let mut positions = Vec::with_capacity(required.len());
    let mut missing = Vec::new();

    for name in required {
        match headers.iter().position(|h| h == *name) {
            Some(idx) => positions.push(idx),
            None => missing.push(name.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(positions)
    } else {
        Err(DatasetError::Schema {
            required: required.iter().map(|s| s.to_string()).collect(),
            missing,
        })
    }
}

/// Parse a finite number; `NaN` and infinities are rejected
pub(crate) fn parse_f64(cell: &str, row: usize, column: &str) -> Result<f64> {
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(invalid_value(cell, row, column)),
    }
}

/// Parse a 0/1 label; integral floats and booleans are accepted
pub(crate) fn parse_flag(cell: &str, row: usize, column: &str) -> Result<bool> {
    match cell {
        "1" | "true" | "True" | "TRUE" => return Ok(true),
        "0" | "false" | "False" | "FALSE" => return Ok(false),
        _ => {}
    }
    match cell.parse::<f64>() {
        Ok(v) if v == 1.0 => Ok(true),
        Ok(v) if v == 0.0 => Ok(false),
        _ => Err(invalid_value(cell, row, column)),
    }
}

pub(crate) fn invalid_value(cell: &str, row: usize, column: &str) -> DatasetError {
    DatasetError::InvalidValue {
        row,
        column: column.to_string(),
        value: cell.to_string(),
    }
}

/// Read labeled traffic samples from CSV content
pub fn read_traffic_samples(
    mut source: impl Read,
    delimiter: Delimiter,
) -> Result<Vec<TrafficSample>> {
    let mut content = String::new();
    source.read_to_string(&mut content)?;

    let mut reader = csv_reader(&content, delimiter);
    let headers = reader.headers()?.clone();
    let cols = require_columns(&headers, &TRAFFIC_COLUMNS)?;

    let mut samples = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let cell = |pos: usize| record.get(cols[pos]).unwrap_or_default();

        samples.push(TrafficSample {
            local_car_density: parse_f64(cell(0), row, LOCAL_CAR_DENSITY)?,
            average_speed_kmph: parse_f64(cell(1), row, AVERAGE_SPEED_KMPH)?,
            brake_events: parse_f64(cell(2), row, BRAKE_EVENTS)?,
            phantom_jam_flag: parse_flag(cell(3), row, PHANTOM_JAM_FLAG)?,
        });
    }

    Ok(samples)
}

/// Load labeled traffic samples from a comma-separated file
pub fn load_traffic_samples(path: impl AsRef<Path>) -> Result<Vec<TrafficSample>> {
    let file = std::fs::File::open(path.as_ref())?;
    let samples = read_traffic_samples(file, Delimiter::Fixed(b','))?;
    tracing::info!(
        path = %path.as_ref().display(),
        rows = samples.len(),
        "Loaded traffic dataset"
    );
    Ok(samples)
}

/// Hex SHA-256 of a file's bytes, recorded in model metadata
pub fn dataset_fingerprint(path: impl AsRef<Path>) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
