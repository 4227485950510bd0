//! Expands a multipliable pair into the full row-major step sequence for
//! every result cell.

use shared::{
    domain::{CellPosition, DotProductStep, Matrix, Progress},
    error::MatrixError,
};
use tracing::debug;

use crate::{ensure_multipliable, generate_dot_product_steps};

/// Steps for every cell of `a × b`, `i` outer, `j` inner, `k` ascending.
///
/// `on_progress` fires once per finished cell, in sequence order, with the
/// cumulative completed count.
pub fn generate_all_steps<F>(
    a: &Matrix,
    b: &Matrix,
    mut on_progress: F,
) -> Result<Vec<DotProductStep>, MatrixError>
where
    F: FnMut(Progress),
{
    ensure_multipliable(a, b)?;

    let (m, p) = (a.rows(), b.cols());
    let total_cells = m * p;
    if total_cells == 0 {
        return Ok(Vec::new());
    }

    let mut steps = Vec::with_capacity(total_cells * a.cols());
    let mut completed_cells = 0;
    for i in 0..m {
        for j in 0..p {
            steps.extend(generate_dot_product_steps(a, b, i, j)?);
            completed_cells += 1;
            on_progress(Progress {
                current_cell: Some(CellPosition::new(i, j)),
                total_cells,
                completed_cells,
            });
        }
    }

    debug!(
        cells = total_cells,
        steps = steps.len(),
        "materialized step sequence"
    );
    Ok(steps)
}

/// Index of the next cell-completing step strictly after `from`
/// (or from the start when `from` is `None`).
pub fn next_cell_boundary(steps: &[DotProductStep], from: Option<usize>) -> Option<usize> {
    let start = from.map_or(0, |index| index + 1);
    steps
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, step)| step.is_complete)
        .map(|(index, _)| index)
}

/// Index of the last cell-completing step strictly before `from`.
pub fn previous_cell_boundary(steps: &[DotProductStep], from: usize) -> Option<usize> {
    steps[..from.min(steps.len())]
        .iter()
        .rposition(|step| step.is_complete)
}

#[cfg(test)]
#[path = "tests/sequencer_tests.rs"]
mod tests;
