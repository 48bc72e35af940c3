//! Immutable, segment-sorted view of the traffic CSV

use super::error::SegmentError;
use crate::dataset::{
    csv_reader, invalid_value, require_columns, Delimiter, Result, ROAD_SEGMENT_ID,
    SEGMENT_COLUMNS, TIME_STEP,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Read;
use std::path::Path;

/// One row of the dataset: the two integer keys plus every other column as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub time_step: i64,
    pub road_segment_id: i64,
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

/// Rows sorted ascending by `(road_segment_id, time_step)`
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    records: Vec<SegmentRecord>,
}

impl SegmentTable {
    /// Sort records into segment order; rows with equal keys keep input order
    pub fn from_records(mut records: Vec<SegmentRecord>) -> Self {
        records.sort_by_key(|r| (r.road_segment_id, r.time_step));
        Self { records }
    }

    /// Parse CSV content, sniffing the delimiter from the header line
    pub fn read(mut source: impl Read) -> Result<Self> {
        let mut content = String::new();
        source.read_to_string(&mut content)?;

        let mut reader = csv_reader(&content, Delimiter::Sniff);
        let headers = reader.headers()?.clone();
        let cols = require_columns(&headers, &SEGMENT_COLUMNS)?;
        let (time_col, segment_col) = (cols[0], cols[1]);

        let mut records = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let row = i + 1;

            let mut columns = Map::new();
            for (idx, (name, cell)) in headers.iter().zip(record.iter()).enumerate() {
                if idx != time_col && idx != segment_col {
                    columns.insert(name.to_string(), infer_cell(cell));
                }
            }

            records.push(SegmentRecord {
                time_step: parse_id(record.get(time_col).unwrap_or_default(), row, TIME_STEP)?,
                road_segment_id: parse_id(
                    record.get(segment_col).unwrap_or_default(),
                    row,
                    ROAD_SEGMENT_ID,
                )?,
                columns,
            });
        }

        Ok(Self::from_records(records))
    }

    /// Load and index the dataset file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let table = Self::read(file)?;
        tracing::info!(
            path = %path.as_ref().display(),
            rows = table.len(),
            segments = table.segment_count(),
            "Loaded segment table"
        );
        Ok(table)
    }

    /// All rows of one segment, ascending by `time_step`
    pub fn segment(&self, segment_id: i64) -> std::result::Result<&[SegmentRecord], SegmentError> {
        let start = self
            .records
            .partition_point(|r| r.road_segment_id < segment_id);
        let end = self
            .records
            .partition_point(|r| r.road_segment_id <= segment_id);

        if start == end {
            return Err(SegmentError::NotFound(segment_id));
        }
        Ok(&self.records[start..end])
    }

    pub fn records(&self) -> &[SegmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct segment ids
    pub fn segment_count(&self) -> usize {
        if self.records.is_empty() {
            return 0;
        }
        1 + self
            .records
            .windows(2)
            .filter(|w| w[0].road_segment_id != w[1].road_segment_id)
            .count()
    }
}

/// Integer key; integral floats such as `3.0` are truncated like a cast
fn parse_id(cell: &str, row: usize, column: &str) -> Result<i64> {
    if let Ok(v) = cell.parse::<i64>() {
        return Ok(v);
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v.trunc() as i64),
        _ => Err(invalid_value(cell, row, column)),
    }
}

/// Passthrough cell as the narrowest JSON value that holds it
fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(v) = cell.parse::<i64>() {
        return Value::from(v);
    }
    if let Ok(v) = cell.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(v) {
            return Value::Number(n);
        }
    }
    Value::String(cell.to_string())
}
