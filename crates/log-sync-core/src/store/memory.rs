//! In-memory [`Store`] implementation for testing.
//!
//! Documents live in a `Vec` (insertion order) with a `HashMap` index from
//! `(kind, value)` to position, behind a `std::sync::RwLock`.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::fingerprint::Fingerprint;
use crate::models::{IdKind, Record, StoreKey, StoredDocument};

use super::{InsertOutcome, Store, StoreError};

#[derive(Default)]
struct Inner {
    docs: Vec<StoredDocument>,
    by_id: HashMap<(IdKind, String), usize>,
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_if_absent(
        &self,
        key: &StoreKey,
        body: &Record,
        content_hash: &Fingerprint,
    ) -> Result<InsertOutcome, StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let id = key.to_document_id();
        let slot = (id.kind, id.value.clone());
        if inner.by_id.contains_key(&slot) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        let pos = inner.docs.len();
        inner.by_id.insert(slot, pos);
        inner.docs.push(StoredDocument {
            id,
            body: body.clone(),
            content_hash: content_hash.to_string(),
            inserted_at: chrono::Utc::now().timestamp(),
        });
        Ok(InsertOutcome::Inserted)
    }

    async fn scan(&self) -> Result<Vec<StoredDocument>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.docs.clone())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.docs.len() as u64)
    }
}
