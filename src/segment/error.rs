use thiserror::Error;

/// Lookup failures against a loaded segment table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    #[error("No data for segment {0}")]
    NotFound(i64),
}
