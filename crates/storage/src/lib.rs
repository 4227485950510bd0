use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Executor, Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::domain::{Matrix, MatrixSlot};
use visualizer_core::persistence::{MatrixPersistence, PersistedMatrices};

const MEMORY_URL: &str = "sqlite::memory:";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredMatrix {
    pub slot: MatrixSlot,
    pub matrix: Matrix,
    pub updated_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        // Every in-memory connection is its own database.
        let max_connections = if database_url == MEMORY_URL { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn load_matrix(&self, slot: MatrixSlot) -> Result<Option<StoredMatrix>> {
        let row = sqlx::query("SELECT payload, updated_at FROM matrix_snapshots WHERE slot = ?1")
            .bind(slot.to_string())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load matrix {slot}"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: String = row.get("payload");
        let matrix = serde_json::from_str(&payload)
            .with_context(|| format!("stored matrix {slot} is corrupt"))?;
        Ok(Some(StoredMatrix {
            slot,
            matrix,
            updated_at: row.get("updated_at"),
        }))
    }

    /// Forgets the saved inputs so the next start uses the defaults.
    pub async fn clear_matrices(&self) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM matrix_snapshots")
            .execute(&self.pool)
            .await
            .context("failed to clear saved matrices")?
            .rows_affected();
        Ok(removed)
    }
}

async fn upsert_matrix<'e, E>(
    executor: E,
    slot: MatrixSlot,
    matrix: &Matrix,
    updated_at: DateTime<Utc>,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let payload = serde_json::to_string(matrix).context("failed to encode matrix")?;
    sqlx::query(
        "INSERT INTO matrix_snapshots (slot, payload, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(slot) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
    )
    .bind(slot.to_string())
    .bind(payload)
    .bind(updated_at)
    .execute(executor)
    .await
    .with_context(|| format!("failed to save matrix {slot}"))?;
    Ok(())
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == MEMORY_URL || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[async_trait]
impl MatrixPersistence for Storage {
    async fn load_matrices(&self) -> Result<Option<PersistedMatrices>> {
        let matrix_a = self.load_matrix(MatrixSlot::A).await?;
        let matrix_b = self.load_matrix(MatrixSlot::B).await?;
        match (matrix_a, matrix_b) {
            (Some(a), Some(b)) => Ok(Some(PersistedMatrices {
                matrix_a: a.matrix,
                matrix_b: b.matrix,
            })),
            (None, None) => Ok(None),
            _ => {
                debug!("only one input matrix saved; ignoring the partial snapshot");
                Ok(None)
            }
        }
    }

    async fn save_matrices(&self, matrices: &PersistedMatrices) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        for (slot, matrix) in [
            (MatrixSlot::A, &matrices.matrix_a),
            (MatrixSlot::B, &matrices.matrix_b),
        ] {
            upsert_matrix(&mut *tx, slot, matrix, now).await?;
        }
        tx.commit().await?;
        debug!(
            a = %matrices.matrix_a.shape_label(),
            b = %matrices.matrix_b.shape_label(),
            "saved input matrices"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
