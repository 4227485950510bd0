use storage::Storage;
use visualizer_core::{restore_store, MatrixPersistence};

#[tokio::test]
async fn edited_inputs_survive_a_restart() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("matrices.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    {
        let storage = Storage::new(&database_url).await.expect("db");
        let mut store = restore_store(&storage).await.expect("first start");
        store
            .load_preset(&matrix_ops::preset(3).expect("preset"))
            .expect("load preset");
        store
            .edit_cell(shared::domain::MatrixSlot::A, 0, 0, "9")
            .expect("edit");
        storage
            .save_matrices(&store.persisted())
            .await
            .expect("save");
    }

    let storage = Storage::new(&database_url).await.expect("reopen");
    let store = restore_store(&storage).await.expect("second start");

    assert_eq!(store.matrix_a().shape(), (3, 4));
    assert_eq!(store.matrix_a().get(0, 0), Some(9.0));
    assert_eq!(store.matrix_b().shape(), (4, 3));
    let result = store.matrix_c().expect("derived result");
    assert_eq!(result.shape(), (3, 3));
    assert!(result.data().iter().flatten().all(|value| *value == 0.0));
    assert!(!store.is_edit_locked());
}
