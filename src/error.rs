use std::io;

/// Malformed or inconsistent map input.
#[derive(Debug, thiserror::Error)]
pub enum MapFormatError {
    #[error("failed to read map: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: expected `{expected}`")]
    MissingHeader { line: usize, expected: &'static str },
    #[error("unsupported map type `{0}`, expected octile")]
    UnsupportedType(String),
    #[error("line {line}: invalid {field} `{value}`")]
    InvalidDimension {
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("map declares {width}x{height} tiles but {cells} cells were supplied")]
    DimensionMismatch { width: u32, height: u32, cells: usize },
    #[error("row {row} has {found} tiles, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("map declares {expected} rows but {found} were found")]
    RowCount { expected: usize, found: usize },
}

/// Malformed scenario (test case) input.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] io::Error),
    #[error("unsupported scenario header `{0}`")]
    UnsupportedVersion(String),
    #[error("line {line}: missing field {field}")]
    MissingField { line: usize, field: &'static str },
    #[error("line {line}: invalid {field} `{value}`")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
}

/// The requested number of abstraction layers cannot be built for the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("layer depth {requested} exceeds the maximum of {max} for this grid and cluster size")]
pub struct LayerDepthExceededError {
    pub requested: usize,
    pub max: usize,
}
