pub mod animator;
pub mod config;
pub mod layout;
pub mod persistence;
pub mod store;

use std::sync::Arc;

use anyhow::Result;
use shared::{error::MatrixError, protocol::UserIntent};
use tracing::{debug, info, warn};

pub use animator::{Animator, AnimatorPhase, FlightPhase};
pub use config::AnimatorConfig;
pub use layout::{FlightAnchor, GridLayout, LayoutProvider, NullLayout};
pub use persistence::{MatrixPersistence, MemoryPersistence, PersistedMatrices};
pub use store::{MatrixStore, SharedStore, StoreSnapshot};

/// Routes one presentation-layer request to the store or the controller.
/// Rejected requests are also broadcast as `StoreEvent::Rejected`.
pub async fn dispatch_intent(animator: &Arc<Animator>, intent: UserIntent) -> Result<(), MatrixError> {
    debug!(?intent, "dispatching intent");
    let outcome = route_intent(animator, intent).await;
    if let Err(err) = &outcome {
        warn!(error = %err, "intent rejected");
        animator.store().lock().await.report_rejection(err);
    }
    outcome
}

async fn route_intent(animator: &Arc<Animator>, intent: UserIntent) -> Result<(), MatrixError> {
    match intent {
        UserIntent::EditCell {
            slot,
            row,
            col,
            raw,
        } => {
            animator
                .store()
                .lock()
                .await
                .edit_cell(slot, row, col, &raw)?;
        }
        UserIntent::Resize { slot, rows, cols } => {
            animator
                .store()
                .lock()
                .await
                .resize_matrix(slot, rows, cols)?;
        }
        UserIntent::LoadPreset { index } => {
            let preset = matrix_ops::preset(index)?;
            animator.store().lock().await.load_preset(&preset)?;
        }
        UserIntent::SetSpeed { speed } => {
            animator.set_speed(speed).await?;
        }
        UserIntent::SetStepMode { mode } => animator.set_step_mode(mode).await,
        UserIntent::SetPrecision { precision } => {
            animator.store().lock().await.set_precision(precision)?;
        }
        UserIntent::Play => animator.play().await,
        UserIntent::Pause => animator.pause().await,
        UserIntent::TogglePlay => animator.toggle_play().await,
        UserIntent::StepForward => animator.step_forward().await,
        UserIntent::StepBackward => animator.step_backward().await,
        UserIntent::Reset => animator.reset().await,
    }
    Ok(())
}

/// Builds a store from whatever the backend saved last, falling back to the
/// default 2×3 · 3×2 pair on first run.
pub async fn restore_store(persistence: &dyn MatrixPersistence) -> Result<MatrixStore> {
    match persistence.load_matrices().await? {
        Some(saved) => {
            info!(
                a = %saved.matrix_a.shape_label(),
                b = %saved.matrix_b.shape_label(),
                "restored saved matrices"
            );
            Ok(MatrixStore::from_persisted(saved))
        }
        None => {
            info!("no saved matrices; starting from defaults");
            Ok(MatrixStore::default())
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
