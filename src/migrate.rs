use sqlx::SqlitePool;

use log_sync_core::StoreError;

use crate::errors::SyncError;

/// Create the schema if it does not exist. Idempotent.
///
/// One `documents` table holds every collection; `namespace` is
/// `<database>.<collection>` and `(namespace, id_kind, id)` is the dedup
/// key, so a string id never collides with a fingerprint or a numeric id.
/// `seq` gives the stable insertion order used by scans and tie-breaks.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SyncError> {
    let fail =
        |e: sqlx::Error| SyncError::Store(StoreError::Rejected(format!("schema migration: {}", e)));

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            namespace TEXT NOT NULL,
            id TEXT NOT NULL,
            id_kind TEXT NOT NULL,
            body TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            inserted_at INTEGER NOT NULL,
            UNIQUE(namespace, id_kind, id)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(fail)?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_content_hash ON documents(namespace, content_hash)",
    )
    .execute(pool)
    .await
    .map_err(fail)?;

    Ok(())
}
