//! Sync pipeline orchestration.
//!
//! Coordinates the full run: load → upsert → clear source → export →
//! report. Per-record failures are non-fatal and end up in
//! [`SyncOutcome::failed`]; a malformed source file stops the run before
//! anything is written, and the file is then left as it was.

use log_sync_core::{upsert_records, FailedRecord, Record, Store};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::SyncError;
use crate::export::{export_store, ExportSummary};
use crate::loader;
use crate::migrate;
use crate::progress::{should_report, ProgressMode, SyncProgressEvent, SyncProgressReporter};
use crate::report::{write_report_csv, SyncReport};
use crate::source::clear_source;
use crate::sqlite_store::SqliteStore;

/// Upsert ticks reported at most once per this many records.
const PROGRESS_EVERY: u64 = 500;

/// Everything a sync produced.
#[derive(Debug)]
pub struct SyncOutcome {
    pub report: SyncReport,
    pub failed: Vec<FailedRecord>,
    pub export: ExportSummary,
}

/// `logsync sync`: run the pipeline against the SQLite store behind `pool`
/// and print a summary. The caller owns closing the pool.
pub async fn run_sync(
    config: &Config,
    pool: &SqlitePool,
    progress: ProgressMode,
) -> Result<SyncOutcome, SyncError> {
    let records = loader::load(&config.paths.source)?;
    info!(
        source = %config.paths.source.display(),
        records = records.len(),
        "source loaded"
    );

    migrate::run_migrations(pool).await?;
    let store = SqliteStore::new(
        pool.clone(),
        config.store.namespace(),
        config.store.op_timeout(),
    );
    let reporter = progress.reporter();
    let outcome = sync_records(&store, records, config, reporter.as_ref()).await?;
    print_summary(config, &outcome);
    Ok(outcome)
}

/// Run upsert, clear, export, and report against an already connected store.
pub async fn sync_records<S>(
    store: &S,
    records: Vec<Record>,
    config: &Config,
    reporter: &dyn SyncProgressReporter,
) -> Result<SyncOutcome, SyncError>
where
    S: Store + ?Sized,
{
    reporter.report(SyncProgressEvent::Loaded {
        source: config.paths.source.display().to_string(),
        records: records.len() as u64,
    });

    let batch = upsert_records(store, records, &config.sync.id_field, |n, total| {
        let (n, total) = (n as u64, total as u64);
        if should_report(n, total, PROGRESS_EVERY) {
            reporter.report(SyncProgressEvent::Upserting { n, total });
        }
    })
    .await?;

    info!(
        inserted = batch.inserted,
        already_present = batch.already_present,
        failed = batch.failed.len(),
        "upsert finished"
    );

    let mut source_cleared = false;
    if config.sync.clear_policy.should_clear(batch.failed.len()) {
        match clear_source(&config.paths.source) {
            Ok(cleared) => source_cleared = cleared,
            Err(e) => warn!(
                source = %config.paths.source.display(),
                error = %e,
                "could not clear source file"
            ),
        }
    } else {
        info!(
            policy = ?config.sync.clear_policy,
            failed = batch.failed.len(),
            "source file kept"
        );
    }

    reporter.report(SyncProgressEvent::Exporting {
        namespace: config.store.namespace(),
    });
    let export = export_store(store, config).await?;

    let report = SyncReport {
        finished_at: chrono::Utc::now(),
        seen: batch.seen(),
        inserted: batch.inserted,
        already_present: batch.already_present,
        failed: batch.failed.len() as u64,
        total_documents: export.documents as u64,
        source_cleared,
    };
    write_report_csv(&report, &config.paths.report_csv)?;

    Ok(SyncOutcome {
        report,
        failed: batch.failed,
        export,
    })
}

fn print_summary(config: &Config, outcome: &SyncOutcome) {
    let r = &outcome.report;
    println!(
        "sync {} -> {}",
        config.paths.source.display(),
        config.store.namespace()
    );
    println!("  loaded: {} records", r.seen);
    println!("  inserted: {}", r.inserted);
    println!("  already present: {}", r.already_present);
    println!("  failed: {}", r.failed);
    for f in &outcome.failed {
        println!("    record {}: {}", f.index, f.error);
    }
    println!(
        "  source cleared: {}",
        if r.source_cleared { "yes" } else { "no" }
    );
    println!("  total documents: {}", r.total_documents);
    println!(
        "  exported: {}, {}",
        config.paths.export_csv.display(),
        config.paths.aggregate_csv.display()
    );
    if outcome.failed.is_empty() {
        println!("ok");
    } else {
        println!("partial: {} record(s) not written", outcome.failed.len());
    }
}
