//! Screen geometry supplied by the presentation layer for flight effects.

use shared::domain::{CellPosition, ScreenPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightAnchor {
    /// The running-sum readout of the active dot product.
    RunningSum,
    ResultCell(CellPosition),
}

pub trait LayoutProvider: Send + Sync {
    /// Center of `anchor` on screen, or `None` when it is not laid out.
    fn anchor_center(&self, anchor: FlightAnchor) -> Option<ScreenPoint>;
}

/// Headless layout: nothing is on screen, so floating numbers stay hidden.
pub struct NullLayout;

impl LayoutProvider for NullLayout {
    fn anchor_center(&self, _anchor: FlightAnchor) -> Option<ScreenPoint> {
        None
    }
}

/// Fixed grid geometry for the result matrix plus a fixed running-sum spot.
#[derive(Debug, Clone, Copy)]
pub struct GridLayout {
    pub result_origin: ScreenPoint,
    pub cell_size: f64,
    pub running_sum: ScreenPoint,
    pub rows: usize,
    pub cols: usize,
}

impl LayoutProvider for GridLayout {
    fn anchor_center(&self, anchor: FlightAnchor) -> Option<ScreenPoint> {
        match anchor {
            FlightAnchor::RunningSum => Some(self.running_sum),
            FlightAnchor::ResultCell(cell) if cell.row < self.rows && cell.col < self.cols => {
                Some(ScreenPoint {
                    x: self.result_origin.x + (cell.col as f64 + 0.5) * self.cell_size,
                    y: self.result_origin.y + (cell.row as f64 + 0.5) * self.cell_size,
                })
            }
            FlightAnchor::ResultCell(_) => None,
        }
    }
}
