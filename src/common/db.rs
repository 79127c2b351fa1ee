use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::common::config::AppConfig;

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS trashed_photos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        original_photo_id INTEGER NOT NULL,
        original_uri TEXT NOT NULL,
        display_name TEXT NOT NULL,
        mime_type TEXT NOT NULL,
        size INTEGER NOT NULL,
        width INTEGER NOT NULL,
        height INTEGER NOT NULL,
        original_bucket_id TEXT NOT NULL,
        original_bucket_display_name TEXT NOT NULL,
        original_relative_path TEXT,
        trash_file_path TEXT NOT NULL,
        date_trashed INTEGER NOT NULL,
        date_added INTEGER NOT NULL,
        date_taken INTEGER
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_trashed_photos_date_trashed ON trashed_photos(date_trashed)",
    "CREATE INDEX IF NOT EXISTS idx_trashed_photos_original_id ON trashed_photos(original_photo_id)",
];

/// Abre (o crea) la base de datos del ledger de papelera y aplica el esquema
pub async fn create_ledger_pool(config: &AppConfig) -> Result<SqlitePool> {
    let path = &config.storage.database_path;
    tracing::info!("Inicializando ledger SQLite en {}", path.display());

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }
    }

    let opts = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(config.database.busy_timeout());

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections.max(1))
        .connect_with(opts)
        .await
        .with_context(|| format!("Failed to open trash ledger at {}", path.display()))?;

    apply_schema(&pool).await?;
    tracing::info!("Ledger de papelera listo");
    Ok(pool)
}

/// Ledger en memoria, usado en pruebas
pub async fn create_in_memory_pool() -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
    // A single connection, otherwise every connection gets its own empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await
        .context("Failed to open in-memory trash ledger")?;

    apply_schema(&pool).await?;
    Ok(pool)
}

async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to create trash ledger schema")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::StorageConfig;

    #[tokio::test]
    async fn test_create_ledger_pool_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            storage: StorageConfig::under(dir.path().join("data"), dir.path().join("media")),
            ..AppConfig::default()
        };

        let pool = create_ledger_pool(&config).await.unwrap();
        pool.close().await;

        // Second open runs the schema again against the existing file
        let pool = create_ledger_pool(&config).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trashed_photos")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(config.storage.database_path.exists());
    }
}
