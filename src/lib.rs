//! # Log Sync
//!
//! Deduplicating sync of a local JSON log file into a document store, with
//! CSV export of everything stored.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ logs.json │──▶│   Loader    │──▶│ Fingerprint  │──▶│  Store   │
//! │           │   │ obj | [obj] │   │ + upsert fold│   │ (SQLite) │
//! └─────┬─────┘   └─────────────┘   └──────────────┘   └────┬─────┘
//!       │ cleared to [] (policy)                            │
//!       ◀───────────────────────────────────────────────────┤
//!                                                           ▼
//!                                           ┌──────────────────────────┐
//!                                           │ logs.csv                 │
//!                                           │ stats_actions.csv        │
//!                                           │ sync_report.csv          │
//!                                           └──────────────────────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. The [`loader`] reads the source file: a JSON object or an array of
//!    objects. A missing or blank file is an empty batch.
//! 2. Each record is keyed by its identifier field (coerced to a native
//!    object id when it looks like one) or by the SHA-256 of its canonical
//!    content ([`log_sync_core::fingerprint`]).
//! 3. [`log_sync_core::upsert_records`] inserts records whose key is absent
//!    and leaves existing documents untouched. Single-record failures are
//!    collected; an unreachable store aborts.
//! 4. The source file is truncated per the configured
//!    [`config::ClearPolicy`].
//! 5. The [`export`] module writes the full table and the grouped counts;
//!    [`report`] writes the run summary.
//!
//! ## Quick Start
//!
//! ```bash
//! export LOGSYNC_DATABASE_URL=sqlite://data/logs.db
//! logsync init
//! logsync sync
//! logsync stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML file + `LOGSYNC_*` environment configuration |
//! | [`errors`] | Run-level error kinds and exit codes |
//! | [`loader`] | Source file parsing |
//! | [`sync`] | Pipeline orchestration (`logsync sync`) |
//! | [`export`] | CSV export (`logsync export`) |
//! | [`report`] | Sync report CSV |
//! | [`stats`] | Collection statistics (`logsync stats`) |
//! | [`source`] | Atomic file replacement and source clearing |
//! | [`progress`] | Progress reporting on stderr |
//! | [`sqlite_store`] | SQLite implementation of the store trait |
//! | [`db`] | SQLite connection with timeouts |
//! | [`migrate`] | Schema migration (idempotent) |

pub mod config;
pub mod db;
pub mod errors;
pub mod export;
pub mod loader;
pub mod migrate;
pub mod progress;
pub mod report;
pub mod source;
pub mod sqlite_store;
pub mod stats;
pub mod sync;

pub use errors::SyncError;
pub use log_sync_core::store;
