use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::domain::Matrix;
use tokio::sync::Mutex;

/// The only state that survives a restart: the two input matrices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedMatrices {
    pub matrix_a: Matrix,
    pub matrix_b: Matrix,
}

#[async_trait]
pub trait MatrixPersistence: Send + Sync {
    async fn load_matrices(&self) -> Result<Option<PersistedMatrices>>;
    async fn save_matrices(&self, matrices: &PersistedMatrices) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryPersistence {
    saved: Mutex<Option<PersistedMatrices>>,
}

#[async_trait]
impl MatrixPersistence for MemoryPersistence {
    async fn load_matrices(&self) -> Result<Option<PersistedMatrices>> {
        Ok(self.saved.lock().await.clone())
    }

    async fn save_matrices(&self, matrices: &PersistedMatrices) -> Result<()> {
        *self.saved.lock().await = Some(matrices.clone());
        Ok(())
    }
}
