//! Plain-text rendering of matrices and store events for the terminal.

use matrix_ops::format_number;
use shared::{
    domain::{DotProductStep, HighlightState, Matrix},
    protocol::StoreEvent,
};

/// Right-aligned grid. Highlighted rows/columns are bracketed and the
/// active cell is starred.
pub fn render_matrix(
    label: &str,
    matrix: &Matrix,
    precision: usize,
    highlight: &HighlightState,
    active: Option<(usize, usize)>,
) -> String {
    let cells: Vec<Vec<String>> = matrix
        .data()
        .iter()
        .map(|row| row.iter().map(|v| format_number(*v, precision)).collect())
        .collect();
    let width = cells.iter().flatten().map(String::len).max().unwrap_or(1);

    let mut out = format!("{label} ({})\n", matrix.shape_label());
    for (i, row) in cells.iter().enumerate() {
        let row_marked = highlight.row == Some(i);
        out.push_str(if row_marked { "> [" } else { "  [" });
        for (j, cell) in row.iter().enumerate() {
            let marker = if active == Some((i, j)) {
                '*'
            } else if highlight.col == Some(j) {
                '|'
            } else {
                ' '
            };
            out.push_str(&format!(" {cell:>width$}{marker}"));
        }
        out.push_str(" ]\n");
    }
    out
}

pub fn describe_step(step: &DotProductStep, precision: usize) -> String {
    let fmt = |v: f64| format_number(v, precision);
    let mut line = format!(
        "C[{},{}] k={}: {} × {} = {}  (running sum {})",
        step.i,
        step.j,
        step.k,
        fmt(step.a_value),
        fmt(step.b_value),
        fmt(step.product),
        fmt(step.partial_sum)
    );
    if step.is_complete {
        line.push_str("  ✓");
    }
    line
}

/// One line per event worth showing, `None` for bookkeeping noise. Step
/// changes are rendered by the caller, which knows the previous step.
pub fn describe_event(event: &StoreEvent, precision: usize) -> Option<String> {
    match event {
        StoreEvent::ResultCellCommitted { row, col, value } => Some(format!(
            "  -> C[{row},{col}] = {}",
            format_number(*value, precision)
        )),
        StoreEvent::StepsPublished { len } => Some(format!("sequence ready: {len} steps")),
        StoreEvent::Rejected(report) => Some(format!(
            "rejected ({:?}): {}",
            report.code, report.message
        )),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
