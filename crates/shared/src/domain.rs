use std::{fmt, num::NonZeroUsize, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::MatrixError;

/// Rectangular `f64` grid. Every constructor checks that the grid has at
/// least one row and column and that all rows share the same length, so a
/// `Matrix` value is never partially inconsistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix", into = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn from_rows(data: Vec<Vec<f64>>) -> Result<Self, MatrixError> {
        let rows = data.len();
        let cols = data.first().map(Vec::len).unwrap_or_default();
        if rows == 0 || cols == 0 {
            return Err(MatrixError::EmptyShape { rows, cols });
        }
        if let Some((row, actual)) = data
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != cols)
        {
            return Err(MatrixError::RaggedRows {
                row,
                expected: cols,
                actual,
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn filled(rows: usize, cols: usize, fill: f64) -> Result<Self, MatrixError> {
        if rows == 0 || cols == 0 {
            return Err(MatrixError::EmptyShape { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            data: vec![vec![fill; cols]; rows],
        })
    }

    pub fn zeros(rows: NonZeroUsize, cols: NonZeroUsize) -> Self {
        Self {
            rows: rows.get(),
            cols: cols.get(),
            data: vec![vec![0.0; cols.get()]; rows.get()],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn data(&self) -> &[Vec<f64>] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.data.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Overwrites one cell. The shape never changes, so the invariants hold.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<(), MatrixError> {
        let (rows, cols) = self.shape();
        let cell = self
            .data
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or(MatrixError::CellOutOfBounds {
                row,
                col,
                rows,
                cols,
            })?;
        *cell = value;
        Ok(())
    }

    /// `"2×3"` style label used in user-facing messages.
    pub fn shape_label(&self) -> String {
        format!("{}×{}", self.rows, self.cols)
    }
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = MatrixError;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        let matrix = Matrix::from_rows(raw.data)?;
        if matrix.shape() != (raw.rows, raw.cols) {
            return Err(MatrixError::DeclaredShapeMismatch {
                declared: (raw.rows, raw.cols),
                actual: matrix.shape(),
            });
        }
        Ok(matrix)
    }
}

impl From<Matrix> for RawMatrix {
    fn from(matrix: Matrix) -> Self {
        Self {
            rows: matrix.rows,
            cols: matrix.cols,
            data: matrix.data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPosition {
    pub row: usize,
    pub col: usize,
}

impl CellPosition {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// The A cell and B cell feeding the step currently on display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePair {
    pub a: CellPosition,
    pub b: CellPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub m: usize,
    pub n: usize,
    pub p: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Validation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(message.into()),
        }
    }
}

/// One multiply-accumulate contributing to result cell `(i, j)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DotProductStep {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub a_value: f64,
    pub b_value: f64,
    pub product: f64,
    pub partial_sum: f64,
    pub is_complete: bool,
}

impl DotProductStep {
    pub fn cell(&self) -> CellPosition {
        CellPosition::new(self.i, self.j)
    }

    pub fn active_pair(&self) -> ActivePair {
        ActivePair {
            a: CellPosition::new(self.i, self.k),
            b: CellPosition::new(self.k, self.j),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    #[default]
    Factor,
    Cell,
}

impl fmt::Display for StepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepMode::Factor => f.write_str("factor"),
            StepMode::Cell => f.write_str("cell"),
        }
    }
}

impl FromStr for StepMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("factor") {
            Ok(StepMode::Factor)
        } else if s.eq_ignore_ascii_case("cell") {
            Ok(StepMode::Cell)
        } else {
            Err(format!("unknown step mode '{s}', expected 'factor' or 'cell'"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub current_cell: Option<CellPosition>,
    pub total_cells: usize,
    pub completed_cells: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationState {
    pub is_playing: bool,
    /// Steps per second.
    pub speed: f64,
    pub current_step: Option<DotProductStep>,
    pub step_mode: StepMode,
    pub progress: Progress,
}

pub const DEFAULT_SPEED: f64 = 1.0;

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            is_playing: false,
            speed: DEFAULT_SPEED,
            current_step: None,
            step_mode: StepMode::Factor,
            progress: Progress::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HighlightState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_pair: Option<ActivePair>,
}

impl HighlightState {
    /// Highlight for matrix A: the row being dotted.
    pub fn row_of(step: &DotProductStep) -> Self {
        Self {
            row: Some(step.i),
            col: None,
            active_pair: Some(step.active_pair()),
        }
    }

    /// Highlight for matrix B: the column being dotted.
    pub fn col_of(step: &DotProductStep) -> Self {
        Self {
            row: None,
            col: Some(step.j),
            active_pair: Some(step.active_pair()),
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.row.is_none() && self.col.is_none() && self.active_pair.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FloatingNumberState {
    pub is_visible: bool,
    pub value: Option<f64>,
    pub start_position: Option<ScreenPoint>,
    pub end_position: Option<ScreenPoint>,
}

impl FloatingNumberState {
    pub fn flying(value: f64, start: ScreenPoint, end: ScreenPoint) -> Self {
        Self {
            is_visible: true,
            value: Some(value),
            start_position: Some(start),
            end_position: Some(end),
        }
    }
}

pub const DEFAULT_PRECISION: usize = 2;
/// Largest number of decimals a display setting may ask for.
pub const MAX_PRECISION: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub precision: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixSlot {
    A,
    B,
    C,
}

impl fmt::Display for MatrixSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixSlot::A => f.write_str("A"),
            MatrixSlot::B => f.write_str("B"),
            MatrixSlot::C => f.write_str("C"),
        }
    }
}

impl FromStr for MatrixSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "a" | "A" => Ok(MatrixSlot::A),
            "b" | "B" => Ok(MatrixSlot::B),
            "c" | "C" => Ok(MatrixSlot::C),
            other => Err(format!("unknown matrix '{other}', expected A, B or C")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub description: String,
    pub matrix_a: Vec<Vec<f64>>,
    pub matrix_b: Vec<Vec<f64>>,
}

impl Preset {
    pub fn matrices(&self) -> Result<(Matrix, Matrix), MatrixError> {
        Ok((
            Matrix::from_rows(self.matrix_a.clone())?,
            Matrix::from_rows(self.matrix_b.clone())?,
        ))
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
