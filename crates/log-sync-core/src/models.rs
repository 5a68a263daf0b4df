//! Core data models used throughout Log Sync.
//!
//! A [`Record`] is one JSON log entry as read from the source file. Before a
//! record reaches the store it is given a [`StoreKey`]: either the identifier
//! it already carries (coerced by [`coerce_id`]) or its content
//! [`Fingerprint`]. What comes back from the store is a [`StoredDocument`].

use std::fmt;

use serde_json::{Map, Value};

use crate::fingerprint::{canonical_json, Fingerprint};
use crate::upsert::RecordError;

/// One log entry: an ordered mapping from field name to JSON value.
///
/// Field order is insertion order (serde_json `preserve_order`), which is
/// what drives CSV column order on export.
pub type Record = Map<String, Value>;

/// A 12-byte store-native identifier, written as 24 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Parse a 24-digit hex string. Returns `None` for anything else.
    pub fn parse_str(s: &str) -> Option<Self> {
        if s.len() != 24 {
            return None;
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An identifier supplied by the source record itself.
///
/// `Opaque` holds a string id verbatim; `Json` holds the canonical JSON text
/// of a number, bool, or object id. The two never compare equal, so `17`
/// and `"17"` are different identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordId {
    Native(ObjectId),
    Opaque(String),
    Json(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Native(oid) => write!(f, "{}", oid),
            RecordId::Opaque(s) | RecordId::Json(s) => f.write_str(s),
        }
    }
}

/// Coerce a raw identifier value into a [`RecordId`].
///
/// | Raw value | Result |
/// |-----------|--------|
/// | `"5f1d7a..."` (24 hex digits) | `Native` |
/// | `{"$oid": "5f1d7a..."}` | `Native` |
/// | any other string | `Opaque` (verbatim) |
/// | other object, number, bool | `Json` (canonical JSON text) |
/// | `null` | `None`, the record is keyed by content |
/// | array | [`RecordError::InvalidIdentifier`] |
pub fn coerce_id(field: &str, raw: &Value) -> Result<Option<RecordId>, RecordError> {
    match raw {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(match ObjectId::parse_str(s) {
            Some(oid) => RecordId::Native(oid),
            None => RecordId::Opaque(s.clone()),
        })),
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("$oid") {
                if let Some(oid) = ObjectId::parse_str(s) {
                    return Ok(Some(RecordId::Native(oid)));
                }
            }
            Ok(Some(RecordId::Json(canonical_json(raw))))
        }
        Value::Array(_) => Err(RecordError::InvalidIdentifier {
            field: field.to_string(),
        }),
        Value::Number(_) | Value::Bool(_) => Ok(Some(RecordId::Json(canonical_json(raw)))),
    }
}

/// How a stored identifier was derived.
///
/// Stores deduplicate on `(kind, value)`: a supplied string that happens to
/// equal some record's fingerprint is still a different document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// A coerced [`ObjectId`].
    ObjectId,
    /// A supplied identifier kept as an opaque string.
    String,
    /// A supplied number, bool, or object identifier, as canonical JSON.
    Json,
    /// A content fingerprint.
    Hash,
}

impl IdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdKind::ObjectId => "oid",
            IdKind::String => "string",
            IdKind::Json => "json",
            IdKind::Hash => "hash",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "oid" => Some(IdKind::ObjectId),
            "string" => Some(IdKind::String),
            "json" => Some(IdKind::Json),
            "hash" => Some(IdKind::Hash),
            _ => None,
        }
    }
}

/// The key a record is deduplicated on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKey {
    Supplied(RecordId),
    Content(Fingerprint),
}

impl StoreKey {
    /// Derive the key for `record`: its identifier field when present and
    /// non-null, otherwise `content` (the fingerprint of the record body).
    pub fn for_record(
        record: &Record,
        id_field: &str,
        content: &Fingerprint,
    ) -> Result<StoreKey, RecordError> {
        let supplied = match record.get(id_field) {
            Some(raw) => coerce_id(id_field, raw)?,
            None => None,
        };
        Ok(match supplied {
            Some(id) => StoreKey::Supplied(id),
            None => StoreKey::Content(content.clone()),
        })
    }

    pub fn kind(&self) -> IdKind {
        match self {
            StoreKey::Supplied(RecordId::Native(_)) => IdKind::ObjectId,
            StoreKey::Supplied(RecordId::Opaque(_)) => IdKind::String,
            StoreKey::Supplied(RecordId::Json(_)) => IdKind::Json,
            StoreKey::Content(_) => IdKind::Hash,
        }
    }

    pub fn to_document_id(&self) -> DocumentId {
        DocumentId {
            value: self.to_string(),
            kind: self.kind(),
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKey::Supplied(id) => write!(f, "{}", id),
            StoreKey::Content(fp) => write!(f, "{}", fp),
        }
    }
}

/// Identifier of a persisted document as read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentId {
    pub value: String,
    pub kind: IdKind,
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// A persisted document: its identifier plus the record body, which never
/// contains the identifier field.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub body: Record,
    pub content_hash: String,
    /// Unix seconds of the insert.
    pub inserted_at: i64,
}

/// Copy of `record` without the identifier field, preserving field order.
pub fn strip_id(record: &Record, id_field: &str) -> Record {
    record
        .iter()
        .filter(|(k, _)| k.as_str() != id_field)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
