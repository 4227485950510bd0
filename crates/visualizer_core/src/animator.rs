//! Playback controller: owns the step pointer, the materialized sequence,
//! the ticker task and the per-cell flight tasks. All matrix and UI state
//! lives in the store and is mutated through its setters.

use std::{
    collections::BTreeMap,
    sync::{Arc, Weak},
};

use matrix_ops::{
    generate_all_steps,
    sequencer::{next_cell_boundary, previous_cell_boundary},
};
use shared::{
    domain::{CellPosition, DotProductStep, HighlightState, MatrixSlot, Progress, StepMode},
    error::MatrixError,
};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    config::{tick_period, AnimatorConfig},
    layout::{FlightAnchor, LayoutProvider, NullLayout},
    store::{MatrixStore, SharedStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorPhase {
    /// No sequence materialized.
    Idle,
    /// Sequence materialized, nothing shown yet.
    Ready,
    /// A step is selected and the ticker is stopped.
    Stepping,
    /// The ticker is advancing the pointer.
    Playing,
}

/// Where a completed cell is in its hand-off to the result matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPhase {
    /// Waiting for the step highlight to render.
    Settling,
    /// Floating number on screen, travelling to its result cell.
    Flying,
    /// Value committed, waiting to clear the highlights.
    Committing,
}

struct MaterializedSequence {
    steps: Vec<DotProductStep>,
    revision: u64,
}

struct CellFlight {
    step: DotProductStep,
    phase: FlightPhase,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct AnimatorInner {
    pointer: Option<usize>,
    sequence: Option<MaterializedSequence>,
    ticker: Option<JoinHandle<()>>,
    flights: BTreeMap<u64, CellFlight>,
    next_flight_id: u64,
    /// Flight whose number is currently on screen.
    floating_owner: Option<u64>,
    /// Bumped by `reset` and teardown so late flight phases become no-ops.
    epoch: u64,
}

impl AnimatorInner {
    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn cancel_flights(&mut self) {
        for (_, flight) in std::mem::take(&mut self.flights) {
            flight.task.abort();
        }
        self.floating_owner = None;
        self.epoch += 1;
    }

    /// Hides the floating number only if `id` put the current one up.
    fn release_floating_number(&mut self, id: u64, store: &mut MatrixStore) {
        if self.floating_owner == Some(id) {
            self.floating_owner = None;
            store.hide_floating_number();
        }
    }

    fn steps(&self) -> &[DotProductStep] {
        self.sequence
            .as_ref()
            .map_or(&[], |sequence| sequence.steps.as_slice())
    }

    fn flight_is_live(&self, id: u64, epoch: u64) -> bool {
        self.epoch == epoch && self.flights.contains_key(&id)
    }
}

pub struct Animator {
    store: SharedStore,
    layout: Arc<dyn LayoutProvider>,
    config: AnimatorConfig,
    inner: Mutex<AnimatorInner>,
}

impl Animator {
    pub fn new(store: SharedStore, config: AnimatorConfig) -> Arc<Self> {
        Self::new_with_layout(store, config, Arc::new(NullLayout))
    }

    pub fn new_with_layout(
        store: SharedStore,
        config: AnimatorConfig,
        layout: Arc<dyn LayoutProvider>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            layout,
            config,
            inner: Mutex::new(AnimatorInner::default()),
        })
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn config(&self) -> &AnimatorConfig {
        &self.config
    }

    pub async fn phase(&self) -> AnimatorPhase {
        let inner = self.inner.lock().await;
        if inner.ticker.is_some() {
            AnimatorPhase::Playing
        } else if inner.sequence.is_none() {
            AnimatorPhase::Idle
        } else if inner.pointer.is_none() {
            AnimatorPhase::Ready
        } else {
            AnimatorPhase::Stepping
        }
    }

    pub async fn pointer(&self) -> Option<usize> {
        self.inner.lock().await.pointer
    }

    pub async fn sequence_len(&self) -> usize {
        self.inner.lock().await.steps().len()
    }

    /// Cells whose completion effect is still running, oldest first.
    pub async fn pending_flights(&self) -> Vec<(CellPosition, FlightPhase)> {
        self.inner
            .lock()
            .await
            .flights
            .values()
            .map(|flight| (flight.step.cell(), flight.phase))
            .collect()
    }

    pub async fn play(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;
        let mut store = self.store.lock().await;
        if store.matrix_c().is_none() {
            warn!("no result matrix to animate; ignoring play request");
            return;
        }
        if let Err(err) = Self::ensure_sequence(&mut inner, &mut store) {
            warn!(error = %err, "cannot build step sequence; ignoring play request");
            return;
        }
        if inner.pointer.is_none() && inner.flights.is_empty() {
            let total_cells = store.result_cell_count();
            store.set_progress(Progress {
                current_cell: None,
                total_cells,
                completed_cells: 0,
            });
        }

        store.set_playing(true);
        let speed = store.animation().speed;
        drop(store);

        self.start_ticker(&mut inner, speed);
        info!(
            speed,
            steps = inner.steps().len(),
            pointer = ?inner.pointer,
            "animation playing"
        );
    }

    pub async fn pause(&self) {
        let mut inner = self.inner.lock().await;
        let mut store = self.store.lock().await;
        Self::halt(&mut inner, &mut store);
    }

    /// Play/pause button semantics: a finished pass starts over from a
    /// zeroed result matrix.
    pub async fn toggle_play(self: &Arc<Self>) {
        let (is_playing, restart) = {
            let store = self.store.lock().await;
            let animation = store.animation();
            (
                animation.is_playing,
                animation.current_step.is_none() && store.matrix_c().is_some(),
            )
        };

        if is_playing {
            self.pause().await;
            return;
        }
        if restart {
            self.store.lock().await.compute_result();
            self.reset().await;
        }
        self.play().await;
    }

    pub async fn step_forward(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;
        let mut store = self.store.lock().await;
        if let Err(err) = Self::ensure_sequence(&mut inner, &mut store) {
            debug!(error = %err, "step forward ignored");
            return;
        }

        let steps = inner.steps();
        let target = match store.animation().step_mode {
            StepMode::Factor => match inner.pointer {
                None if !steps.is_empty() => Some(0),
                Some(index) if index + 1 < steps.len() => Some(index + 1),
                _ => None,
            },
            StepMode::Cell => next_cell_boundary(steps, inner.pointer),
        };

        let Some(index) = target else {
            Self::halt(&mut inner, &mut store);
            inner.pointer = None;
            store.set_current_step(None);
            store.clear_highlights();
            info!("animation pass complete");
            return;
        };

        let step = steps[index];
        inner.pointer = Some(index);
        Self::show_step(&mut store, step);
        debug!(index, i = step.i, j = step.j, k = step.k, "stepped forward");

        if step.is_complete {
            self.launch_flight(&mut inner, step, store.revision());
        }
    }

    pub async fn step_backward(&self) {
        let mut inner = self.inner.lock().await;
        let mut store = self.store.lock().await;

        let stale = inner
            .sequence
            .as_ref()
            .is_some_and(|sequence| sequence.revision != store.revision());
        if stale {
            debug!("step backward ignored; inputs changed since the sequence was built");
            return;
        }

        let steps = inner.steps();
        let target = match (inner.pointer, store.animation().step_mode) {
            (Some(index), StepMode::Factor) if index > 0 => Some(index - 1),
            (Some(index), StepMode::Cell) => previous_cell_boundary(steps, index),
            _ => None,
        };
        let Some(index) = target else {
            return;
        };

        let step = steps[index];
        inner.pointer = Some(index);
        Self::show_step(&mut store, step);
        debug!(index, i = step.i, j = step.j, k = step.k, "stepped backward");
    }

    /// Stops everything and drops the sequence; idempotent.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        let mut store = self.store.lock().await;

        inner.stop_ticker();
        inner.cancel_flights();
        inner.pointer = None;
        inner.sequence = None;

        store.reset_animation();
        store.clear_highlights();
        store.hide_floating_number();
        if !store.current_steps().is_empty() {
            store.set_current_steps(Vec::new());
        }
        debug!("animation reset");
    }

    /// Stores the clamped speed and, when playing, restarts the ticker at
    /// the new interval right away.
    pub async fn set_speed(self: &Arc<Self>, speed: f64) -> Result<f64, MatrixError> {
        let speed = self.config.clamp_speed(speed)?;
        let mut inner = self.inner.lock().await;
        self.store.lock().await.set_speed(speed);
        if inner.ticker.is_some() {
            self.start_ticker(&mut inner, speed);
            debug!(speed, "ticker restarted at new speed");
        }
        Ok(speed)
    }

    pub async fn set_step_mode(&self, mode: StepMode) {
        self.store.lock().await.set_step_mode(mode);
    }

    /// Neutralizes the ticker and every pending flight. Called on teardown.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        let mut store = self.store.lock().await;
        inner.cancel_flights();
        Self::halt(&mut inner, &mut store);
    }

    fn halt(inner: &mut AnimatorInner, store: &mut MatrixStore) {
        inner.stop_ticker();
        if store.animation().is_playing {
            store.set_playing(false);
        }
    }

    fn show_step(store: &mut MatrixStore, step: DotProductStep) {
        store.set_current_step(Some(step));
        store.clear_highlights();
        store.set_highlight(MatrixSlot::A, HighlightState::row_of(&step));
        store.set_highlight(MatrixSlot::B, HighlightState::col_of(&step));
    }

    /// Builds the sequence if there is none or the inputs changed since it
    /// was built, and publishes it to the store.
    fn ensure_sequence(
        inner: &mut AnimatorInner,
        store: &mut MatrixStore,
    ) -> Result<(), MatrixError> {
        let revision = store.revision();
        match inner.sequence.as_ref().map(|sequence| sequence.revision) {
            Some(built) if built == revision => return Ok(()),
            Some(_) => {
                debug!("inputs changed; rebuilding step sequence");
                inner.sequence = None;
            }
            None => {}
        }
        inner.pointer = None;

        let (matrix_a, matrix_b) = (store.matrix_a().clone(), store.matrix_b().clone());
        let steps = generate_all_steps(&matrix_a, &matrix_b, |progress| {
            store.set_progress(progress);
        })?;
        let total_cells = store.result_cell_count();
        store.set_progress(Progress {
            current_cell: None,
            total_cells,
            completed_cells: 0,
        });
        store.set_current_steps(steps.clone());

        inner.sequence = Some(MaterializedSequence { steps, revision });
        inner.pointer = None;
        Ok(())
    }

    fn start_ticker(self: &Arc<Self>, inner: &mut AnimatorInner, speed: f64) {
        inner.stop_ticker();
        let period = tick_period(speed);
        let animator = Arc::downgrade(self);
        inner.ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(animator) = animator.upgrade() else {
                    break;
                };
                animator.step_forward().await;
            }
        }));
    }

    fn launch_flight(
        self: &Arc<Self>,
        inner: &mut AnimatorInner,
        step: DotProductStep,
        revision: u64,
    ) {
        let id = inner.next_flight_id;
        inner.next_flight_id += 1;
        let epoch = inner.epoch;
        let animator = Arc::downgrade(self);
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            time::sleep(config.settle_delay).await;
            if !Self::with_live(&animator, |a| a.begin_flight(id, epoch, step)).await {
                return;
            }
            time::sleep(config.flight_duration).await;
            if !Self::with_live(&animator, |a| a.commit_flight(id, epoch, step, revision)).await {
                return;
            }
            time::sleep(config.clear_delay).await;
            Self::with_live(&animator, |a| a.settle_flight(id, epoch, step)).await;
        });

        inner.flights.insert(
            id,
            CellFlight {
                step,
                phase: FlightPhase::Settling,
                task,
            },
        );
    }

    async fn with_live<F, Fut>(animator: &Weak<Self>, phase: F) -> bool
    where
        F: FnOnce(Arc<Self>) -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        match animator.upgrade() {
            Some(animator) => phase(animator).await,
            None => false,
        }
    }

    async fn begin_flight(self: Arc<Self>, id: u64, epoch: u64, step: DotProductStep) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.flight_is_live(id, epoch) {
            return false;
        }
        if let Some(flight) = inner.flights.get_mut(&id) {
            flight.phase = FlightPhase::Flying;
        }

        let start = self.layout.anchor_center(FlightAnchor::RunningSum);
        let end = self
            .layout
            .anchor_center(FlightAnchor::ResultCell(step.cell()));
        match (start, end) {
            (Some(start), Some(end)) => {
                self.store
                    .lock()
                    .await
                    .show_floating_number(step.partial_sum, start, end);
                inner.floating_owner = Some(id);
            }
            _ => debug!(i = step.i, j = step.j, "flight anchors not laid out; skipping effect"),
        }
        true
    }

    async fn commit_flight(
        self: Arc<Self>,
        id: u64,
        epoch: u64,
        step: DotProductStep,
        revision: u64,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.flight_is_live(id, epoch) {
            return false;
        }
        if let Some(flight) = inner.flights.get_mut(&id) {
            flight.phase = FlightPhase::Committing;
        }

        let mut store = self.store.lock().await;
        inner.release_floating_number(id, &mut store);
        if store.revision() != revision {
            debug!(i = step.i, j = step.j, "inputs changed mid-flight; dropping commit");
            inner.flights.remove(&id);
            return false;
        }
        match store.commit_result_cell(step.i, step.j, step.partial_sum) {
            Ok(()) => {
                store.mark_cell_completed(step.cell());
                debug!(
                    i = step.i,
                    j = step.j,
                    value = step.partial_sum,
                    "result cell committed"
                );
            }
            Err(err) => warn!(error = %err, "failed to commit result cell"),
        }
        true
    }

    async fn settle_flight(self: Arc<Self>, id: u64, epoch: u64, step: DotProductStep) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.flight_is_live(id, epoch) {
            return false;
        }
        inner.flights.remove(&id);

        let mut store = self.store.lock().await;
        let showing_newer_step = store
            .animation()
            .current_step
            .is_some_and(|current| (current.i, current.j, current.k) != (step.i, step.j, step.k));
        if !showing_newer_step {
            store.clear_highlights();
        }
        true
    }
}

impl Drop for Animator {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        inner.stop_ticker();
        for (_, flight) in std::mem::take(&mut inner.flights) {
            flight.task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/animator_tests.rs"]
mod tests;
