//! Sync report: the one-row CSV summary of a run.
//!
//! Kept for dashboards that show when the last sync happened and how much
//! it did.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::SyncError;
use crate::source::write_atomic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub finished_at: DateTime<Utc>,
    pub seen: u64,
    pub inserted: u64,
    pub already_present: u64,
    pub failed: u64,
    pub total_documents: u64,
    /// Whether the source file was truncated this run.
    pub source_cleared: bool,
}

const HEADER: [&str; 6] = [
    "last_sync_iso",
    "seen_count",
    "inserted_count",
    "already_present_count",
    "failed_count",
    "total_documents",
];

pub fn write_report_csv(report: &SyncReport, path: &Path) -> Result<(), SyncError> {
    let fail = |e: csv::Error| SyncError::export(path, e);

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(HEADER).map_err(fail)?;
    wtr.write_record([
        report.finished_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        report.seen.to_string(),
        report.inserted.to_string(),
        report.already_present.to_string(),
        report.failed.to_string(),
        report.total_documents.to_string(),
    ])
    .map_err(fail)?;

    let bytes = wtr
        .into_inner()
        .map_err(|e| SyncError::export(path, e.error()))?;
    write_atomic(path, &bytes).map_err(|e| SyncError::export(path, e))
}
