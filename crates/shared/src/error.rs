use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::MatrixSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    OutOfRange,
    Conflict,
    NotFound,
    Computation,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatrixError {
    #[error("matrix must have at least one row and one column, got {rows}×{cols}")]
    EmptyShape { rows: usize, cols: usize },
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("declared shape {declared:?} does not match data shape {actual:?}")]
    DeclaredShapeMismatch {
        declared: (usize, usize),
        actual: (usize, usize),
    },
    #[error("{message}")]
    DimensionMismatch { message: String },
    #[error("cell ({row}, {col}) is outside a {rows}×{cols} matrix")]
    CellOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("dimension {value} is outside the allowed range 1..={max}")]
    DimensionOutOfRange { value: usize, max: usize },
    #[error("precision {value} is outside the allowed range 0..={max}")]
    PrecisionOutOfRange { value: usize, max: usize },
    #[error("speed must be a positive number of steps per second, got {0}")]
    InvalidSpeed(f64),
    #[error("matrix {slot} cannot be edited while an animation is active")]
    EditLocked { slot: MatrixSlot },
    #[error("matrix {slot} is read-only")]
    ReadOnlySlot { slot: MatrixSlot },
    #[error("no preset at index {index}")]
    UnknownPreset { index: usize },
}

impl MatrixError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MatrixError::EmptyShape { .. }
            | MatrixError::RaggedRows { .. }
            | MatrixError::DeclaredShapeMismatch { .. }
            | MatrixError::DimensionMismatch { .. }
            | MatrixError::InvalidSpeed(_) => ErrorCode::Validation,
            MatrixError::CellOutOfBounds { .. }
            | MatrixError::DimensionOutOfRange { .. }
            | MatrixError::PrecisionOutOfRange { .. } => ErrorCode::OutOfRange,
            MatrixError::EditLocked { .. } | MatrixError::ReadOnlySlot { .. } => {
                ErrorCode::Conflict
            }
            MatrixError::UnknownPreset { .. } => ErrorCode::NotFound,
        }
    }
}

/// Raised by a direct multiplication call on a pair that never passed
/// validation. Carries the same message the validation result would.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code:?}: {message}")]
pub struct ComputationError {
    pub code: ErrorCode,
    pub message: String,
}

impl ComputationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Computation,
            message: message.into(),
        }
    }
}

/// Serializable form of a rejected request, carried on the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorReport {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&MatrixError> for ErrorReport {
    fn from(value: &MatrixError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}
