//! SQLite connection management.
//!
//! Opens a single-connection pool for the configured connection string and
//! pings it before any work starts. The database file is created if missing,
//! but its directory is not: a store location that does not exist counts as
//! an unreachable store.
//!
//! Both the pool acquire and SQLite's busy handler are bounded by the
//! configured connect timeout. [`run_bounded`] applies the overall run limit
//! and owns closing the pool.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use crate::config::Config;
use crate::errors::SyncError;

/// Connect to the configured store and verify it answers.
///
/// # Errors
///
/// [`SyncError::Configuration`] if the connection string does not parse,
/// [`SyncError::Connection`] if the store cannot be opened or pinged in time.
pub async fn connect(config: &Config) -> Result<SqlitePool, SyncError> {
    let url = &config.store.url;
    let timeout = config.store.connect_timeout();

    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| SyncError::Configuration(format!("invalid store url '{}': {}", url, e)))?
        .create_if_missing(true)
        .busy_timeout(timeout)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let unreachable = |reason: String| SyncError::Connection {
        url: url.clone(),
        reason,
    };

    let pool = tokio::time::timeout(
        timeout,
        SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(timeout)
            .connect_with(options),
    )
    .await
    .map_err(|_| unreachable(format!("connect timed out after {:?}", timeout)))?
    .map_err(|e| unreachable(e.to_string()))?;

    if let Err(e) = sqlx::query("SELECT 1").execute(&pool).await {
        pool.close().await;
        return Err(unreachable(format!("ping failed: {}", e)));
    }

    Ok(pool)
}

/// Run `work` within `limit`, then close `pool` whether the work finished,
/// failed, or ran out of time.
///
/// # Errors
///
/// Whatever `work` returns, or [`SyncError::Timeout`] once `limit` passes.
pub async fn run_bounded<T, F>(pool: &SqlitePool, limit: Duration, work: F) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, SyncError>>,
{
    // The timed-out future is dropped here, returning its connections.
    let result = match tokio::time::timeout(limit, work).await {
        Ok(res) => res,
        Err(_) => Err(SyncError::Timeout(limit)),
    };
    pool.close().await;
    result
}
