//! The deduplicating upsert fold.
//!
//! Each record is keyed ([`StoreKey::for_record`]) and handed to
//! [`Store::insert_if_absent`] in input order. Records that fail on their
//! own are collected in [`BatchResult::failed`] and the batch carries on;
//! only a [`StoreError::Unavailable`] stops it.

use tracing::{debug, warn};

use crate::fingerprint::fingerprint;
use crate::models::{strip_id, Record, StoreKey};
use crate::store::{InsertOutcome, Store, StoreError};

/// Why a single record could not be written.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("identifier field '{field}' must not be an array")]
    InvalidIdentifier { field: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A record that was not written, with its position in the input.
#[derive(Debug)]
pub struct FailedRecord {
    pub index: usize,
    pub record: Record,
    pub error: RecordError,
}

/// Outcome of one batch.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub inserted: u64,
    pub already_present: u64,
    pub failed: Vec<FailedRecord>,
}

impl BatchResult {
    /// Records processed, whatever their outcome.
    pub fn seen(&self) -> u64 {
        self.inserted + self.already_present + self.failed.len() as u64
    }

    /// True when no record failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Upsert `records` into `store`, keyed by `id_field` or content.
///
/// `on_progress(n, total)` is called after each record.
pub async fn upsert_records<S, F>(
    store: &S,
    records: Vec<Record>,
    id_field: &str,
    mut on_progress: F,
) -> Result<BatchResult, StoreError>
where
    S: Store + ?Sized,
    F: FnMut(usize, usize),
{
    let total = records.len();
    let mut result = BatchResult::default();

    for (index, record) in records.into_iter().enumerate() {
        match upsert_one(store, &record, id_field).await {
            Ok(InsertOutcome::Inserted) => {
                debug!(index, "inserted");
                result.inserted += 1;
            }
            Ok(InsertOutcome::AlreadyPresent) => {
                debug!(index, "already present");
                result.already_present += 1;
            }
            Err(RecordError::Store(e)) if e.is_fatal() => return Err(e),
            Err(error) => {
                warn!(index, %error, "record not written");
                result.failed.push(FailedRecord {
                    index,
                    record,
                    error,
                });
            }
        }
        on_progress(index + 1, total);
    }

    Ok(result)
}

async fn upsert_one<S>(store: &S, record: &Record, id_field: &str) -> Result<InsertOutcome, RecordError>
where
    S: Store + ?Sized,
{
    let body = strip_id(record, id_field);
    let content_hash = fingerprint(&body, id_field);
    let key = StoreKey::for_record(record, id_field, &content_hash)?;
    Ok(store.insert_if_absent(&key, &body, &content_hash).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use serde_json::{json, Value};

    fn records(v: Value) -> Vec<Record> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect()
    }

    #[tokio::test]
    async fn second_run_inserts_nothing() {
        let store = InMemoryStore::new();
        let batch = records(json!([
            {"user": "amel", "action": "login"},
            {"user": "amel", "action": "logout"},
            {"action": "login", "user": "amel"}
        ]));

        let first = upsert_records(&store, batch.clone(), "_id", |_, _| {})
            .await
            .unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(first.already_present, 1);

        let before = store.scan().await.unwrap();
        let second = upsert_records(&store, batch, "_id", |_, _| {})
            .await
            .unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.already_present, 3);
        assert_eq!(second.seen(), 3);
        assert_eq!(store.scan().await.unwrap(), before);
    }

    #[tokio::test]
    async fn supplied_id_wins_over_content() {
        let store = InMemoryStore::new();
        let batch = records(json!([
            {"_id": "evt-1", "action": "login"},
            {"_id": "evt-1", "action": "logout"}
        ]));
        let result = upsert_records(&store, batch, "_id", |_, _| {})
            .await
            .unwrap();
        assert_eq!(result.inserted, 1);
        assert_eq!(result.already_present, 1);

        let docs = store.scan().await.unwrap();
        assert_eq!(docs[0].id.value, "evt-1");
        assert_eq!(docs[0].body.get("action"), Some(&json!("login")));
        assert!(docs[0].body.get("_id").is_none());
    }

    #[tokio::test]
    async fn invalid_identifier_fails_only_that_record() {
        let store = InMemoryStore::new();
        let batch = records(json!([
            {"action": "a"},
            {"_id": [1], "action": "b"},
            {"action": "c"}
        ]));
        let mut ticks = Vec::new();
        let result = upsert_records(&store, batch, "_id", |n, total| ticks.push((n, total)))
            .await
            .unwrap();
        assert_eq!(result.inserted, 2);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].index, 1);
        assert!(!result.is_complete());
        assert_eq!(ticks, vec![(1, 3), (2, 3), (3, 3)]);
    }
}
