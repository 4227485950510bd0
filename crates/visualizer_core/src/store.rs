//! Single source of truth for the visualizer. Every mutation goes through a
//! named setter and is announced on the event bus.

use std::{num::NonZeroUsize, sync::Arc};

use matrix_ops::{
    create_matrix, parse_cell_value, resize_matrix, update_matrix_cell, validate_multiplication,
};
use serde::Serialize;
use shared::{
    domain::{
        AnimationState, CellPosition, Dimensions, DisplaySettings, DotProductStep,
        FloatingNumberState, HighlightState, Matrix, MatrixSlot, Preset, Progress, ScreenPoint,
        StepMode, Validation, MAX_PRECISION,
    },
    error::{ErrorReport, MatrixError},
    protocol::StoreEvent,
};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::persistence::PersistedMatrices;

pub const DEFAULT_MAX_DIMENSION: usize = 10;
const EVENT_CAPACITY: usize = 256;
const DEFAULT_A_ROWS: NonZeroUsize = match NonZeroUsize::new(2) {
    Some(n) => n,
    None => unreachable!(),
};
const DEFAULT_INNER: NonZeroUsize = match NonZeroUsize::new(3) {
    Some(n) => n,
    None => unreachable!(),
};

pub type SharedStore = Arc<Mutex<MatrixStore>>;

/// Everything the presentation layer needs to render one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSnapshot {
    pub matrix_a: Matrix,
    pub matrix_b: Matrix,
    pub matrix_c: Option<Matrix>,
    pub dimensions: Dimensions,
    pub validation: Validation,
    pub highlight_a: HighlightState,
    pub highlight_b: HighlightState,
    pub animation: AnimationState,
    pub floating_number: FloatingNumberState,
    pub settings: DisplaySettings,
    pub current_steps: Vec<DotProductStep>,
    pub revision: u64,
    pub edit_locked: bool,
}

pub struct MatrixStore {
    matrix_a: Matrix,
    matrix_b: Matrix,
    matrix_c: Option<Matrix>,
    dimensions: Dimensions,
    validation: Validation,
    highlight_a: HighlightState,
    highlight_b: HighlightState,
    animation: AnimationState,
    floating_number: FloatingNumberState,
    settings: DisplaySettings,
    current_steps: Vec<DotProductStep>,
    revision: u64,
    max_dimension: usize,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for MatrixStore {
    fn default() -> Self {
        Self::new(
            Matrix::zeros(DEFAULT_A_ROWS, DEFAULT_INNER),
            Matrix::zeros(DEFAULT_INNER, DEFAULT_A_ROWS),
        )
    }
}

impl MatrixStore {
    pub fn new(matrix_a: Matrix, matrix_b: Matrix) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut store = Self {
            dimensions: Dimensions {
                m: matrix_a.rows(),
                n: matrix_a.cols(),
                p: matrix_b.cols(),
            },
            matrix_a,
            matrix_b,
            matrix_c: None,
            validation: Validation::valid(),
            highlight_a: HighlightState::default(),
            highlight_b: HighlightState::default(),
            animation: AnimationState::default(),
            floating_number: FloatingNumberState::default(),
            settings: DisplaySettings::default(),
            current_steps: Vec::new(),
            revision: 0,
            max_dimension: DEFAULT_MAX_DIMENSION,
            events,
        };
        store.derive_from_inputs();
        store
    }

    pub fn from_persisted(persisted: PersistedMatrices) -> Self {
        Self::new(persisted.matrix_a, persisted.matrix_b)
    }

    pub fn with_max_dimension(mut self, max_dimension: usize) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn matrix_a(&self) -> &Matrix {
        &self.matrix_a
    }

    pub fn matrix_b(&self) -> &Matrix {
        &self.matrix_b
    }

    pub fn matrix_c(&self) -> Option<&Matrix> {
        self.matrix_c.as_ref()
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn validation(&self) -> &Validation {
        &self.validation
    }

    pub fn highlight(&self, slot: MatrixSlot) -> HighlightState {
        match slot {
            MatrixSlot::A => self.highlight_a,
            MatrixSlot::B => self.highlight_b,
            MatrixSlot::C => HighlightState::default(),
        }
    }

    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    pub fn floating_number(&self) -> FloatingNumberState {
        self.floating_number
    }

    pub fn settings(&self) -> DisplaySettings {
        self.settings
    }

    pub fn current_steps(&self) -> &[DotProductStep] {
        &self.current_steps
    }

    /// Bumped every time A or B is replaced.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn max_dimension(&self) -> usize {
        self.max_dimension
    }

    /// Inputs are frozen while playback runs or a step is on display.
    pub fn is_edit_locked(&self) -> bool {
        self.animation.is_playing || self.animation.current_step.is_some()
    }

    pub fn result_cell_count(&self) -> usize {
        self.matrix_c.as_ref().map_or(0, Matrix::cell_count)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            matrix_a: self.matrix_a.clone(),
            matrix_b: self.matrix_b.clone(),
            matrix_c: self.matrix_c.clone(),
            dimensions: self.dimensions,
            validation: self.validation.clone(),
            highlight_a: self.highlight_a,
            highlight_b: self.highlight_b,
            animation: self.animation.clone(),
            floating_number: self.floating_number,
            settings: self.settings,
            current_steps: self.current_steps.clone(),
            revision: self.revision,
            edit_locked: self.is_edit_locked(),
        }
    }

    pub fn persisted(&self) -> PersistedMatrices {
        PersistedMatrices {
            matrix_a: self.matrix_a.clone(),
            matrix_b: self.matrix_b.clone(),
        }
    }

    pub fn update_matrix_a(&mut self, matrix: Matrix) -> Result<(), MatrixError> {
        self.ensure_editable(MatrixSlot::A)?;
        self.matrix_a = matrix;
        self.derive_from_inputs();
        Ok(())
    }

    pub fn update_matrix_b(&mut self, matrix: Matrix) -> Result<(), MatrixError> {
        self.ensure_editable(MatrixSlot::B)?;
        self.matrix_b = matrix;
        self.derive_from_inputs();
        Ok(())
    }

    pub fn update_matrix_cell(
        &mut self,
        slot: MatrixSlot,
        row: usize,
        col: usize,
        value: f64,
    ) -> Result<(), MatrixError> {
        let updated = update_matrix_cell(self.input(slot)?, row, col, value)?;
        match slot {
            MatrixSlot::A => self.update_matrix_a(updated),
            _ => self.update_matrix_b(updated),
        }
    }

    /// Applies a user-typed value. Malformed input is dropped and the old
    /// value kept; the return value says whether the edit was applied.
    pub fn edit_cell(
        &mut self,
        slot: MatrixSlot,
        row: usize,
        col: usize,
        raw: &str,
    ) -> Result<bool, MatrixError> {
        let Some(value) = parse_cell_value(raw) else {
            debug!(%slot, row, col, raw, "discarding non-numeric cell edit");
            return Ok(false);
        };
        self.update_matrix_cell(slot, row, col, value)?;
        Ok(true)
    }

    pub fn resize_matrix(
        &mut self,
        slot: MatrixSlot,
        rows: usize,
        cols: usize,
    ) -> Result<(), MatrixError> {
        for value in [rows, cols] {
            if value == 0 || value > self.max_dimension {
                return Err(MatrixError::DimensionOutOfRange {
                    value,
                    max: self.max_dimension,
                });
            }
        }
        let resized = resize_matrix(self.input(slot)?, rows, cols)?;
        match slot {
            MatrixSlot::A => self.update_matrix_a(resized),
            _ => self.update_matrix_b(resized),
        }
    }

    pub fn load_preset(&mut self, preset: &Preset) -> Result<(), MatrixError> {
        self.ensure_editable(MatrixSlot::A)?;
        let (matrix_a, matrix_b) = preset.matrices()?;
        self.matrix_a = matrix_a;
        self.matrix_b = matrix_b;
        self.derive_from_inputs();
        debug!(preset = %preset.name, "loaded preset");
        Ok(())
    }

    /// Replaces C with a zero matrix of the right shape, if A × B is defined.
    pub fn compute_result(&mut self) {
        if self.validation.is_valid {
            self.matrix_c = create_matrix(self.matrix_a.rows(), self.matrix_b.cols(), 0.0).ok();
            self.publish_matrices();
        }
    }

    pub fn clear_result(&mut self) {
        self.matrix_c = None;
        self.publish_matrices();
    }

    pub fn commit_result_cell(
        &mut self,
        row: usize,
        col: usize,
        value: f64,
    ) -> Result<(), MatrixError> {
        let Some(result) = self.matrix_c.as_mut() else {
            return Err(MatrixError::ReadOnlySlot {
                slot: MatrixSlot::C,
            });
        };
        result.set(row, col, value)?;
        self.emit(StoreEvent::ResultCellCommitted { row, col, value });
        Ok(())
    }

    pub fn set_highlight(&mut self, slot: MatrixSlot, highlight: HighlightState) {
        match slot {
            MatrixSlot::A => self.highlight_a = highlight,
            MatrixSlot::B => self.highlight_b = highlight,
            MatrixSlot::C => return,
        }
        self.emit(StoreEvent::HighlightChanged { slot, highlight });
    }

    pub fn clear_highlight(&mut self, slot: MatrixSlot) {
        self.set_highlight(slot, HighlightState::default());
    }

    pub fn clear_highlights(&mut self) {
        self.clear_highlight(MatrixSlot::A);
        self.clear_highlight(MatrixSlot::B);
    }

    pub fn set_playing(&mut self, is_playing: bool) {
        self.update_animation(|state| state.is_playing = is_playing);
    }

    pub fn set_current_step(&mut self, step: Option<DotProductStep>) {
        self.update_animation(|state| {
            state.current_step = step;
            if let Some(step) = step {
                state.progress.current_cell = Some(step.cell());
            }
        });
    }

    pub fn set_progress(&mut self, progress: Progress) {
        self.update_animation(|state| state.progress = progress);
    }

    pub fn mark_cell_completed(&mut self, cell: CellPosition) {
        self.update_animation(|state| {
            let progress = &mut state.progress;
            progress.completed_cells = (progress.completed_cells + 1).min(progress.total_cells);
            progress.current_cell = Some(cell);
        });
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.update_animation(|state| state.speed = speed);
    }

    pub fn set_step_mode(&mut self, mode: StepMode) {
        self.update_animation(|state| state.step_mode = mode);
    }

    /// Back to the idle animation state; speed and step mode are kept.
    pub fn reset_animation(&mut self) {
        let total_cells = self.result_cell_count();
        self.update_animation(|state| {
            state.is_playing = false;
            state.current_step = None;
            state.progress = Progress {
                current_cell: None,
                total_cells,
                completed_cells: 0,
            };
        });
    }

    pub fn set_current_steps(&mut self, steps: Vec<DotProductStep>) {
        let len = steps.len();
        self.current_steps = steps;
        self.emit(StoreEvent::StepsPublished { len });
    }

    pub fn show_floating_number(&mut self, value: f64, start: ScreenPoint, end: ScreenPoint) {
        self.floating_number = FloatingNumberState::flying(value, start, end);
        self.emit(StoreEvent::FloatingNumberChanged {
            state: self.floating_number,
        });
    }

    pub fn hide_floating_number(&mut self) {
        if self.floating_number == FloatingNumberState::default() {
            return;
        }
        self.floating_number = FloatingNumberState::default();
        self.emit(StoreEvent::FloatingNumberChanged {
            state: self.floating_number,
        });
    }

    pub fn set_precision(&mut self, precision: usize) -> Result<(), MatrixError> {
        if precision > MAX_PRECISION {
            return Err(MatrixError::PrecisionOutOfRange {
                value: precision,
                max: MAX_PRECISION,
            });
        }
        self.settings.precision = precision;
        self.emit(StoreEvent::SettingsChanged {
            settings: self.settings,
        });
        Ok(())
    }

    pub fn report_rejection(&self, err: &MatrixError) {
        self.emit(StoreEvent::Rejected(ErrorReport::from(err)));
    }

    fn input(&self, slot: MatrixSlot) -> Result<&Matrix, MatrixError> {
        match slot {
            MatrixSlot::A => Ok(&self.matrix_a),
            MatrixSlot::B => Ok(&self.matrix_b),
            MatrixSlot::C => Err(MatrixError::ReadOnlySlot { slot }),
        }
    }

    fn ensure_editable(&self, slot: MatrixSlot) -> Result<(), MatrixError> {
        if self.is_edit_locked() {
            return Err(MatrixError::EditLocked { slot });
        }
        Ok(())
    }

    /// Revalidates, recomputes the dimensions and replaces C after A or B
    /// changed. Any result or progress over the previous shape is dropped.
    fn derive_from_inputs(&mut self) {
        self.validation = validate_multiplication(&self.matrix_a, &self.matrix_b);
        self.dimensions = Dimensions {
            m: self.matrix_a.rows(),
            n: self.matrix_a.cols(),
            p: self.matrix_b.cols(),
        };
        self.matrix_c = if self.validation.is_valid {
            create_matrix(self.dimensions.m, self.dimensions.p, 0.0).ok()
        } else {
            None
        };
        self.revision += 1;
        self.current_steps.clear();

        let total_cells = self.result_cell_count();
        self.animation.progress = Progress {
            current_cell: None,
            total_cells,
            completed_cells: 0,
        };
        self.publish_matrices();
        self.emit(StoreEvent::AnimationChanged {
            state: self.animation.clone(),
        });
    }

    fn publish_matrices(&self) {
        self.emit(StoreEvent::MatricesChanged {
            dimensions: self.dimensions,
            validation: self.validation.clone(),
            revision: self.revision,
        });
    }

    fn update_animation(&mut self, apply: impl FnOnce(&mut AnimationState)) {
        apply(&mut self.animation);
        self.emit(StoreEvent::AnimationChanged {
            state: self.animation.clone(),
        });
    }

    fn emit(&self, event: StoreEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
