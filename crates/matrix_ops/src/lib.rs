//! Pure matrix arithmetic behind the step visualizer: validation,
//! multiplication, per-cell dot-product expansion and resizing.

use shared::{
    domain::{DotProductStep, Matrix, Validation, MAX_PRECISION},
    error::{ComputationError, MatrixError},
};

mod presets;
pub mod sequencer;

pub use presets::{preset, presets};
pub use sequencer::generate_all_steps;

pub fn create_matrix(rows: usize, cols: usize, fill: f64) -> Result<Matrix, MatrixError> {
    Matrix::filled(rows, cols, fill)
}

pub fn validate_multiplication(a: &Matrix, b: &Matrix) -> Validation {
    if a.cols() != b.rows() {
        return Validation::invalid(format!(
            "Cannot multiply {} matrix with {} matrix. A's columns ({}) must equal B's rows ({}).",
            a.shape_label(),
            b.shape_label(),
            a.cols(),
            b.rows()
        ));
    }
    Validation::valid()
}

/// `Err` when `a × b` is undefined, carrying the validation message.
pub fn ensure_multipliable(a: &Matrix, b: &Matrix) -> Result<(), MatrixError> {
    match validate_multiplication(a, b).error {
        Some(message) => Err(MatrixError::DimensionMismatch { message }),
        None => Ok(()),
    }
}

pub fn multiply_matrices(a: &Matrix, b: &Matrix) -> Result<Matrix, ComputationError> {
    if let Some(message) = validate_multiplication(a, b).error {
        return Err(ComputationError::new(message));
    }

    let data: Vec<Vec<f64>> = (0..a.rows())
        .map(|i| {
            (0..b.cols())
                .map(|j| {
                    (0..a.cols())
                        .map(|k| a.data()[i][k] * b.data()[k][j])
                        .sum::<f64>()
                })
                .collect()
        })
        .collect();

    Matrix::from_rows(data).map_err(|err| ComputationError::new(err.to_string()))
}

/// Expands result cell `(row, col)` into one step per contraction index,
/// `k` ascending. Only the last step is marked complete.
pub fn generate_dot_product_steps(
    a: &Matrix,
    b: &Matrix,
    row: usize,
    col: usize,
) -> Result<Vec<DotProductStep>, MatrixError> {
    ensure_multipliable(a, b)?;
    if row >= a.rows() || col >= b.cols() {
        return Err(MatrixError::CellOutOfBounds {
            row,
            col,
            rows: a.rows(),
            cols: b.cols(),
        });
    }

    let last = a.cols() - 1;
    let mut partial_sum = 0.0;
    let steps = (0..a.cols())
        .map(|k| {
            let a_value = a.data()[row][k];
            let b_value = b.data()[k][col];
            let product = a_value * b_value;
            partial_sum += product;
            DotProductStep {
                i: row,
                j: col,
                k,
                a_value,
                b_value,
                product,
                partial_sum,
                is_complete: k == last,
            }
        })
        .collect();
    Ok(steps)
}

/// New `new_rows`×`new_cols` matrix keeping the overlapping top-left block
/// of `matrix`; every other cell is zero.
pub fn resize_matrix(
    matrix: &Matrix,
    new_rows: usize,
    new_cols: usize,
) -> Result<Matrix, MatrixError> {
    let mut resized = create_matrix(new_rows, new_cols, 0.0)?;
    for i in 0..matrix.rows().min(new_rows) {
        for j in 0..matrix.cols().min(new_cols) {
            resized.set(i, j, matrix.data()[i][j])?;
        }
    }
    Ok(resized)
}

pub fn update_matrix_cell(
    matrix: &Matrix,
    row: usize,
    col: usize,
    value: f64,
) -> Result<Matrix, MatrixError> {
    let mut updated = matrix.clone();
    updated.set(row, col, value)?;
    Ok(updated)
}

/// Parses a user-typed cell value. Returns `None` for anything that is not a
/// finite number, in which case the edit is dropped.
pub fn parse_cell_value(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Integral values print bare; everything else gets `precision` decimals,
/// capped at [`MAX_PRECISION`].
pub fn format_number(value: f64, precision: usize) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.0}")
    } else {
        let precision = precision.min(MAX_PRECISION);
        format!("{value:.precision$}")
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
