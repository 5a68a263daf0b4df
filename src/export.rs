//! CSV export of the persisted collection.
//!
//! Writes two files: the full document table (`logs.csv` by default) and
//! the grouped count over the configured categorical field
//! (`stats_actions.csv`). Both are replaced atomically. A failed export
//! never undoes upserts that already happened.

use std::path::Path;

use log_sync_core::export::{aggregate, tabular, AggregateExport, TabularExport};
use log_sync_core::Store;
use sqlx::SqlitePool;
use tracing::info;

use crate::config::Config;
use crate::errors::SyncError;
use crate::migrate;
use crate::source::write_atomic;
use crate::sqlite_store::SqliteStore;

/// What an export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub documents: usize,
    pub columns: usize,
    pub groups: usize,
}

/// Read every document back from `store` and write both CSV files.
pub async fn export_store<S>(store: &S, config: &Config) -> Result<ExportSummary, SyncError>
where
    S: Store + ?Sized,
{
    let docs = store
        .scan()
        .await
        .map_err(|e| SyncError::export(&config.paths.export_csv, e))?;

    let table = tabular(&docs, &config.sync.id_field);
    let groups = aggregate(&docs, &config.sync.group_by);

    write_tabular_csv(&table, &config.paths.export_csv)?;
    write_aggregate_csv(&groups, &config.paths.aggregate_csv)?;

    info!(
        documents = docs.len(),
        groups = groups.rows.len(),
        "export written"
    );

    Ok(ExportSummary {
        documents: docs.len(),
        columns: table.header.len(),
        groups: groups.rows.len(),
    })
}

pub fn write_tabular_csv(table: &TabularExport, path: &Path) -> Result<(), SyncError> {
    let fail = |e: csv::Error| SyncError::export(path, e);

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&table.header).map_err(fail)?;
    for row in &table.rows {
        wtr.write_record(row).map_err(fail)?;
    }
    finish(wtr, path)
}

pub fn write_aggregate_csv(groups: &AggregateExport, path: &Path) -> Result<(), SyncError> {
    let fail = |e: csv::Error| SyncError::export(path, e);

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(groups.header()).map_err(fail)?;
    for group in &groups.rows {
        let count = group.count.to_string();
        wtr.write_record([group.value.as_str(), count.as_str()])
            .map_err(fail)?;
    }
    finish(wtr, path)
}

fn finish(wtr: csv::Writer<Vec<u8>>, path: &Path) -> Result<(), SyncError> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| SyncError::export(path, e.error()))?;
    write_atomic(path, &bytes).map_err(|e| SyncError::export(path, e))
}

/// `logsync export`: regenerate the CSV files without syncing.
pub async fn run_export(config: &Config, pool: &SqlitePool) -> Result<ExportSummary, SyncError> {
    migrate::run_migrations(pool).await?;
    let store = SqliteStore::new(
        pool.clone(),
        config.store.namespace(),
        config.store.op_timeout(),
    );
    let summary = export_store(&store, config).await?;
    println!("export {}", config.store.namespace());
    println!(
        "  documents: {} -> {}",
        summary.documents,
        config.paths.export_csv.display()
    );
    println!(
        "  groups by {}: {} -> {}",
        config.sync.group_by,
        summary.groups,
        config.paths.aggregate_csv.display()
    );
    println!("ok");
    Ok(summary)
}
