//! Sync progress reporting.
//!
//! Reports what `logsync sync` is doing while it runs. Progress is emitted
//! on **stderr** so stdout remains parseable for scripts.

use std::io::Write;
use std::str::FromStr;

/// A single progress event for sync.
#[derive(Clone, Debug)]
pub enum SyncProgressEvent {
    /// Source file read: `records` entries to process.
    Loaded { source: String, records: u64 },
    /// Upsert phase: n records processed out of total.
    Upserting { n: u64, total: u64 },
    /// Reading the collection back for export.
    Exporting { namespace: String },
}

/// Reports sync progress. Implementations write to stderr (human or JSON).
pub trait SyncProgressReporter: Send + Sync {
    fn report(&self, event: SyncProgressEvent);
}

/// Human-friendly progress on stderr: "sync  upserting  1,234 / 5,000 records".
pub struct StderrProgress;

impl SyncProgressReporter for StderrProgress {
    fn report(&self, event: SyncProgressEvent) {
        let line = match &event {
            SyncProgressEvent::Loaded { source, records } => {
                format!("sync  loaded {} records from {}\n", format_number(*records), source)
            }
            SyncProgressEvent::Upserting { n, total } => format!(
                "sync  upserting  {} / {} records\n",
                format_number(*n),
                format_number(*total)
            ),
            SyncProgressEvent::Exporting { namespace } => {
                format!("sync  exporting {}\n", namespace)
            }
        };
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl SyncProgressReporter for JsonProgress {
    fn report(&self, event: SyncProgressEvent) {
        let obj = match &event {
            SyncProgressEvent::Loaded { source, records } => serde_json::json!({
                "phase": "loaded",
                "source": source,
                "records": records
            }),
            SyncProgressEvent::Upserting { n, total } => serde_json::json!({
                "phase": "upserting",
                "done": n,
                "of": total
            }),
            SyncProgressEvent::Exporting { namespace } => serde_json::json!({
                "phase": "exporting",
                "namespace": namespace
            }),
        };
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", obj);
        let _ = err.flush();
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl SyncProgressReporter for NoProgress {
    fn report(&self, _event: SyncProgressEvent) {}
}

/// `1234567` -> `1,234,567`.
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::from(&digits[..head]);
    for group in digits.as_bytes()[head..].chunks(3) {
        if !out.is_empty() {
            out.push(',');
        }
        out.extend(group.iter().map(|&b| b as char));
    }
    out
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn SyncProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

impl FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => Err(format!(
                "unknown progress mode '{}': expected off, human, or json",
                other
            )),
        }
    }
}

/// Whether an upsert tick is worth reporting: every `every` records and
/// the last one.
pub fn should_report(n: u64, total: u64, every: u64) -> bool {
    n == total || (every > 0 && n % every == 0)
}
