//! Error taxonomy for the dashboard core.
//!
//! Each operation of the core surfaces exactly one of these enums; the
//! command-line layer wraps them in `anyhow` with context.

use thiserror::Error;

use crate::{data::ColumnType, schema::ColumnRole};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Input does not contain a header row")]
    MissingHeader,
    #[error("Duplicate column name '{0}' in header")]
    DuplicateHeader(String),
    #[error("Record on line {line} has {found} field(s) but the header declares {expected}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("Column '{column}' has {found} cell(s) but the table has {expected} row(s)")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("Input is not valid {encoding} text")]
    Encoding { encoding: String },
    #[error("Malformed CSV input: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Column '{0}' does not exist")]
    UnknownColumn(String),
    #[error("Column '{column}' is {actual} but the {slot} slot requires a {expected} column")]
    WrongRole {
        slot: &'static str,
        column: String,
        expected: ColumnRole,
        actual: ColumnRole,
    },
    #[error("No {role} column is available for the {slot} slot")]
    NoCandidate {
        slot: &'static str,
        role: ColumnRole,
    },
    #[error("{kind} charts do not use a {slot} column")]
    UnusedSlot {
        kind: &'static str,
        slot: &'static str,
    },
    #[error("Column '{0}' already has a filter")]
    DuplicateFilter(String),
    #[error("Range for '{column}' is invalid: {min} > {max}")]
    InvertedRange { column: String, min: f64, max: f64 },
    #[error("Range bound for '{0}' is not a number")]
    NonFiniteBound(String),
    #[error("Column '{0}' has no observed values to anchor a range")]
    NoBounds(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("Column '{0}' does not exist")]
    UnknownColumn(String),
    #[error("Row {row}: cannot convert '{value}' to {target}")]
    CastFailure {
        row: usize,
        value: String,
        target: ColumnType,
    },
    #[error("Column '{0}' has no numeric values to compute a statistic from")]
    EmptyColumn(String),
    #[error("Fill value '{0}' reads as missing and would not survive an export")]
    MissingFill(String),
    #[error("Formula error: {0}")]
    FormulaError(String),
    #[error(transparent)]
    Shape(#[from] ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No data loaded yet")]
pub struct EmptyStore;

/// Failure of a store-level edit: either nothing is loaded or the transform failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error(transparent)]
    Empty(#[from] EmptyStore),
    #[error(transparent)]
    Transform(#[from] TransformError),
}
