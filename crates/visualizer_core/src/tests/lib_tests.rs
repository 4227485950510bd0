use shared::{
    domain::{Matrix, MatrixSlot, StepMode},
    error::ErrorCode,
    protocol::StoreEvent,
};

use super::*;

fn fresh_animator() -> Arc<Animator> {
    Animator::new(MatrixStore::default().into_shared(), AnimatorConfig::default())
}

#[tokio::test(start_paused = true)]
async fn edit_and_resize_intents_reach_the_store() {
    let animator = fresh_animator();

    dispatch_intent(
        &animator,
        UserIntent::EditCell {
            slot: MatrixSlot::A,
            row: 1,
            col: 2,
            raw: "7.5".to_string(),
        },
    )
    .await
    .expect("edit");
    dispatch_intent(
        &animator,
        UserIntent::Resize {
            slot: MatrixSlot::B,
            rows: 3,
            cols: 4,
        },
    )
    .await
    .expect("resize");

    let store = animator.store().lock().await;
    assert_eq!(store.matrix_a().get(1, 2), Some(7.5));
    assert_eq!(store.matrix_c().map(Matrix::shape), Some((2, 4)));
}

#[tokio::test(start_paused = true)]
async fn rejected_intents_are_returned_and_broadcast() {
    let animator = fresh_animator();
    let mut events = animator.store().lock().await.subscribe();

    let err = dispatch_intent(&animator, UserIntent::LoadPreset { index: 42 })
        .await
        .expect_err("unknown preset");
    assert_eq!(err, MatrixError::UnknownPreset { index: 42 });

    match events.try_recv() {
        Ok(StoreEvent::Rejected(report)) => assert_eq!(report.code, ErrorCode::NotFound),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn edits_are_refused_while_a_step_is_shown() {
    let animator = fresh_animator();
    dispatch_intent(&animator, UserIntent::StepForward)
        .await
        .expect("step");

    let err = dispatch_intent(
        &animator,
        UserIntent::Resize {
            slot: MatrixSlot::A,
            rows: 4,
            cols: 4,
        },
    )
    .await
    .expect_err("locked");
    assert_eq!(
        err,
        MatrixError::EditLocked {
            slot: MatrixSlot::A
        }
    );

    dispatch_intent(&animator, UserIntent::Reset)
        .await
        .expect("reset");
    dispatch_intent(
        &animator,
        UserIntent::Resize {
            slot: MatrixSlot::A,
            rows: 4,
            cols: 4,
        },
    )
    .await
    .expect("unlocked after reset");
}

#[tokio::test(start_paused = true)]
async fn settings_intents_update_animation_and_display() {
    let animator = fresh_animator();

    for intent in [
        UserIntent::SetSpeed { speed: 2.0 },
        UserIntent::SetStepMode {
            mode: StepMode::Cell,
        },
        UserIntent::SetPrecision { precision: 4 },
    ] {
        dispatch_intent(&animator, intent).await.expect("setting");
    }

    let store = animator.store().lock().await;
    assert_eq!(store.animation().speed, 2.0);
    assert_eq!(store.animation().step_mode, StepMode::Cell);
    assert_eq!(store.settings().precision, 4);
}

#[tokio::test(start_paused = true)]
async fn invalid_speed_is_rejected() {
    let animator = fresh_animator();

    assert_eq!(
        dispatch_intent(&animator, UserIntent::SetSpeed { speed: -1.0 }).await,
        Err(MatrixError::InvalidSpeed(-1.0))
    );
    assert_eq!(animator.store().lock().await.animation().speed, 1.0);
}

#[tokio::test(start_paused = true)]
async fn oversized_precision_is_rejected_and_reported() {
    let animator = fresh_animator();
    let mut events = animator.store().lock().await.subscribe();

    let err = dispatch_intent(&animator, UserIntent::SetPrecision { precision: 70_000 })
        .await
        .expect_err("precision out of range");

    assert_eq!(err.code(), ErrorCode::OutOfRange);
    assert_eq!(animator.store().lock().await.settings().precision, 2);
    match events.try_recv() {
        Ok(StoreEvent::Rejected(report)) => assert_eq!(report.code, ErrorCode::OutOfRange),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn playback_intents_drive_the_controller() {
    let animator = fresh_animator();

    dispatch_intent(&animator, UserIntent::LoadPreset { index: 0 })
        .await
        .expect("preset");
    dispatch_intent(&animator, UserIntent::Play).await.expect("play");
    assert_eq!(animator.phase().await, AnimatorPhase::Playing);

    dispatch_intent(&animator, UserIntent::Pause)
        .await
        .expect("pause");
    assert_eq!(animator.phase().await, AnimatorPhase::Ready);

    dispatch_intent(&animator, UserIntent::StepForward)
        .await
        .expect("forward");
    dispatch_intent(&animator, UserIntent::StepForward)
        .await
        .expect("forward");
    dispatch_intent(&animator, UserIntent::StepBackward)
        .await
        .expect("backward");
    assert_eq!(animator.pointer().await, Some(0));

    dispatch_intent(&animator, UserIntent::TogglePlay)
        .await
        .expect("toggle");
    assert_eq!(animator.phase().await, AnimatorPhase::Playing);
}

#[tokio::test]
async fn restore_falls_back_to_defaults() {
    let persistence = MemoryPersistence::default();

    let store = restore_store(&persistence).await.expect("restore");

    assert_eq!(store.matrix_a().shape(), (2, 3));
    assert_eq!(store.matrix_b().shape(), (3, 2));
}

#[tokio::test]
async fn restore_uses_saved_inputs_and_derives_the_rest() {
    let persistence = MemoryPersistence::default();
    let (matrix_a, matrix_b) = matrix_ops::preset(1)
        .and_then(|preset| preset.matrices())
        .expect("identity preset");
    persistence
        .save_matrices(&PersistedMatrices {
            matrix_a: matrix_a.clone(),
            matrix_b,
        })
        .await
        .expect("save");

    let store = restore_store(&persistence).await.expect("restore");

    assert_eq!(store.matrix_a(), &matrix_a);
    assert!(store.validation().is_valid);
    assert!(store.matrix_c().is_some());
    assert!(store.animation().current_step.is_none());
}
