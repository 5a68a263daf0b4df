//! Storage abstraction for Log Sync.
//!
//! The [`Store`] trait is the one external collaborator of the pipeline:
//! insert-if-absent by key, a full scan, and grouped counts. Implementations
//! are scoped to a single collection when constructed.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::export::{group_counts, GroupCount};
use crate::fingerprint::Fingerprint;
use crate::models::{Record, StoreKey, StoredDocument};

/// Result of a single insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new document was created.
    Inserted,
    /// A document with the same key already existed and was left untouched.
    AlreadyPresent,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store itself cannot be reached. Fatal for the whole run.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store refused this one write.
    #[error("store rejected write: {0}")]
    Rejected(String),
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("stored document '{id}' is unreadable: {reason}")]
    Corrupt { id: String, reason: String },
}

impl StoreError {
    /// Whether this error means the connection is gone rather than a single
    /// operation failing.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Abstract document store scoped to one collection.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_if_absent`](Store::insert_if_absent) | Create a document unless its key exists |
/// | [`scan`](Store::scan) | Every document, in insertion order |
/// | [`count`](Store::count) | Number of documents |
/// | [`count_by`](Store::count_by) | Grouped counts over a body field |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert `body` under `key` unless a document with that key exists.
    /// An existing document is never overwritten.
    async fn insert_if_absent(
        &self,
        key: &StoreKey,
        body: &Record,
        content_hash: &Fingerprint,
    ) -> Result<InsertOutcome, StoreError>;

    /// All documents in insertion order.
    async fn scan(&self) -> Result<Vec<StoredDocument>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.scan().await?.len() as u64)
    }

    /// Count documents grouped by the scalar value of `field`, sorted by
    /// count descending with ties in first-seen order.
    async fn count_by(&self, field: &str) -> Result<Vec<GroupCount>, StoreError> {
        let docs = self.scan().await?;
        Ok(group_counts(&docs, field))
    }
}
