use super::*;

fn matrix(rows: &[&[f64]]) -> Matrix {
    Matrix::from_rows(rows.iter().map(|row| row.to_vec()).collect()).expect("matrix")
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new(MEMORY_URL).await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("matrices.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn empty_database_has_nothing_to_restore() {
    let storage = Storage::new(MEMORY_URL).await.expect("db");

    assert!(storage.load_matrices().await.expect("load").is_none());
    assert!(storage
        .load_matrix(MatrixSlot::A)
        .await
        .expect("load A")
        .is_none());
}

#[tokio::test]
async fn saving_twice_keeps_only_the_latest_matrix() {
    let storage = Storage::new(MEMORY_URL).await.expect("db");
    let first = matrix(&[&[1.0, 2.0]]);
    let second = matrix(&[&[3.0], &[4.0]]);

    upsert_matrix(storage.pool(), MatrixSlot::B, &first, Utc::now())
        .await
        .expect("save first");
    upsert_matrix(storage.pool(), MatrixSlot::B, &second, Utc::now())
        .await
        .expect("save second");

    let stored = storage
        .load_matrix(MatrixSlot::B)
        .await
        .expect("load")
        .expect("saved");
    assert_eq!(stored.slot, MatrixSlot::B);
    assert_eq!(stored.matrix, second);
    assert!(stored.updated_at <= Utc::now());
}

#[tokio::test]
async fn a_partial_snapshot_is_not_restored() {
    let storage = Storage::new(MEMORY_URL).await.expect("db");
    upsert_matrix(storage.pool(), MatrixSlot::A, &matrix(&[&[1.0]]), Utc::now())
        .await
        .expect("save A");

    assert!(storage.load_matrices().await.expect("load").is_none());
}

#[tokio::test]
async fn result_slot_is_rejected_by_the_schema() {
    let storage = Storage::new(MEMORY_URL).await.expect("db");

    let err = upsert_matrix(storage.pool(), MatrixSlot::C, &matrix(&[&[1.0]]), Utc::now())
        .await
        .expect_err("C is never persisted");
    assert!(err.to_string().contains("matrix C"), "{err:#}");
}

#[tokio::test]
async fn corrupt_payloads_surface_as_errors() {
    let storage = Storage::new(MEMORY_URL).await.expect("db");
    sqlx::query("INSERT INTO matrix_snapshots (slot, payload) VALUES ('A', ?1)")
        .bind(r#"{"rows":2,"cols":1,"data":[[1.0]]}"#)
        .execute(storage.pool())
        .await
        .expect("raw insert");

    let err = storage
        .load_matrix(MatrixSlot::A)
        .await
        .expect_err("shape mismatch");
    assert!(err.to_string().contains("corrupt"), "{err:#}");
}

#[tokio::test]
async fn clear_forgets_both_inputs() {
    let storage = Storage::new(MEMORY_URL).await.expect("db");
    storage
        .save_matrices(&PersistedMatrices {
            matrix_a: matrix(&[&[1.0]]),
            matrix_b: matrix(&[&[2.0]]),
        })
        .await
        .expect("save");

    assert_eq!(storage.clear_matrices().await.expect("clear"), 2);
    assert!(storage.load_matrices().await.expect("load").is_none());
}

#[test]
fn sqlite_path_ignores_memory_and_foreign_urls() {
    assert_eq!(sqlite_path(MEMORY_URL), None);
    assert_eq!(sqlite_path("postgres://localhost/db"), None);
    assert_eq!(
        sqlite_path("sqlite://data/matrices.db?mode=rwc"),
        Some(PathBuf::from("data/matrices.db"))
    );
}
