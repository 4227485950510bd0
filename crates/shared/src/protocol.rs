use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        AnimationState, Dimensions, DisplaySettings, FloatingNumberState, HighlightState,
        MatrixSlot, StepMode, Validation,
    },
    error::ErrorReport,
};

/// Requests raised by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum UserIntent {
    EditCell {
        slot: MatrixSlot,
        row: usize,
        col: usize,
        raw: String,
    },
    Resize {
        slot: MatrixSlot,
        rows: usize,
        cols: usize,
    },
    LoadPreset {
        index: usize,
    },
    SetSpeed {
        speed: f64,
    },
    SetStepMode {
        mode: StepMode,
    },
    SetPrecision {
        precision: usize,
    },
    Play,
    Pause,
    TogglePlay,
    StepForward,
    StepBackward,
    Reset,
}

/// Change notifications published by the store after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StoreEvent {
    MatricesChanged {
        dimensions: Dimensions,
        validation: Validation,
        revision: u64,
    },
    ResultCellCommitted {
        row: usize,
        col: usize,
        value: f64,
    },
    HighlightChanged {
        slot: MatrixSlot,
        highlight: HighlightState,
    },
    AnimationChanged {
        state: AnimationState,
    },
    StepsPublished {
        len: usize,
    },
    FloatingNumberChanged {
        state: FloatingNumberState,
    },
    SettingsChanged {
        settings: DisplaySettings,
    },
    Rejected(ErrorReport),
}
