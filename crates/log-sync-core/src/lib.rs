//! # Log Sync Core
//!
//! Storage-agnostic logic for Log Sync: the record model, canonical
//! fingerprints, identifier coercion, the [`store::Store`] abstraction, the
//! deduplicating upsert fold, and the rows behind the CSV exports.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies.

pub mod export;
pub mod fingerprint;
pub mod models;
pub mod store;
pub mod upsert;

pub use fingerprint::{canonical_json, fingerprint, Fingerprint};
pub use models::{coerce_id, DocumentId, IdKind, ObjectId, Record, RecordId, StoreKey, StoredDocument};
pub use store::{InsertOutcome, Store, StoreError};
pub use upsert::{upsert_records, BatchResult, FailedRecord, RecordError};
