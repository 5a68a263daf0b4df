//! SQLite-backed [`Store`] implementation.
//!
//! Each store instance is scoped to one namespace (`<database>.<collection>`)
//! of the shared `documents` table, and every statement is bounded by the
//! per-operation timeout.
//!
//! Grouped counts use the trait's default (a scan folded by
//! [`log_sync_core::export::group_counts`]), so `logsync stats` and the
//! aggregate CSV render group values identically.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use log_sync_core::models::{DocumentId, IdKind};
use log_sync_core::{Fingerprint, InsertOutcome, Record, Store, StoreError, StoreKey, StoredDocument};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
    namespace: String,
    op_timeout: Duration,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, namespace: impl Into<String>, op_timeout: Duration) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
            op_timeout,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(res) => res.map_err(store_error),
            Err(_) => Err(StoreError::Timeout(self.op_timeout)),
        }
    }
}

/// Split sqlx errors into "the store is gone" and "this statement failed".
fn store_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
        other => StoreError::Rejected(other.to_string()),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_if_absent(
        &self,
        key: &StoreKey,
        body: &Record,
        content_hash: &Fingerprint,
    ) -> Result<InsertOutcome, StoreError> {
        let body_json =
            serde_json::to_string(body).map_err(|e| StoreError::Rejected(e.to_string()))?;
        let id = key.to_string();

        let res = self
            .bounded(
                sqlx::query(
                    r#"
                    INSERT INTO documents (namespace, id, id_kind, body, content_hash, inserted_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    ON CONFLICT(namespace, id_kind, id) DO NOTHING
                    "#,
                )
                .bind(&self.namespace)
                .bind(&id)
                .bind(key.kind().as_str())
                .bind(&body_json)
                .bind(content_hash.as_str())
                .bind(chrono::Utc::now().timestamp())
                .execute(&self.pool),
            )
            .await?;

        Ok(if res.rows_affected() == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyPresent
        })
    }

    async fn scan(&self) -> Result<Vec<StoredDocument>, StoreError> {
        let rows = self
            .bounded(
                sqlx::query(
                    "SELECT id, id_kind, body, content_hash, inserted_at \
                     FROM documents WHERE namespace = ? ORDER BY seq",
                )
                .bind(&self.namespace)
                .fetch_all(&self.pool),
            )
            .await?;

        rows.iter()
            .map(|row| {
                let id: String = row.get("id");
                let kind_str: String = row.get("id_kind");
                let body_json: String = row.get("body");

                let kind = IdKind::parse(&kind_str).ok_or_else(|| StoreError::Corrupt {
                    id: id.clone(),
                    reason: format!("unknown id kind '{}'", kind_str),
                })?;
                let body: Record =
                    serde_json::from_str(&body_json).map_err(|e| StoreError::Corrupt {
                        id: id.clone(),
                        reason: e.to_string(),
                    })?;

                Ok(StoredDocument {
                    id: DocumentId { value: id, kind },
                    body,
                    content_hash: row.get("content_hash"),
                    inserted_at: row.get("inserted_at"),
                })
            })
            .collect()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .bounded(
                sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE namespace = ?")
                    .bind(&self.namespace)
                    .fetch_one(&self.pool),
            )
            .await?;
        Ok(n as u64)
    }
}
