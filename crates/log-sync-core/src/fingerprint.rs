//! Canonical encoding and content fingerprints.
//!
//! A fingerprint is the SHA-256 of a record's canonical JSON encoding with
//! the identifier field left out. The canonical encoding sorts object keys
//! at every level and drops all insignificant whitespace, so two records
//! with the same content always hash the same regardless of field order.
//!
//! Numbers keep the exact text they were parsed from (serde_json's
//! `arbitrary_precision`), so integers of any size stay distinct. Integer
//! text is written verbatim; anything with a fraction or exponent is
//! rewritten as the shortest text that round-trips the same `f64`.

use std::fmt;

use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

use crate::models::Record;

/// Lowercase hex SHA-256 digest of a record's canonical content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already computed hex digest (e.g. read back from a store).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint `record`, ignoring its top-level `id_field`.
pub fn fingerprint(record: &Record, id_field: &str) -> Fingerprint {
    let mut out = String::new();
    write_object(
        record.iter().filter(|(k, _)| k.as_str() != id_field),
        &mut out,
    );

    let mut hasher = Sha256::new();
    hasher.update(out.as_bytes());
    Fingerprint(format!("{:x}", hasher.finalize()))
}

/// Canonical JSON text of `value`: sorted keys, no whitespace.
///
/// `1` and `1.0` stay distinct; `1.50` and `1.5` do not.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_object(map.iter(), out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Number(n) => out.push_str(&canonical_number(n)),
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn canonical_number(n: &Number) -> String {
    if n.is_f64() {
        if let Some(shortest) = n.as_f64().and_then(Number::from_f64) {
            return shortest.to_string();
        }
    }
    n.to_string()
}

fn write_object<'a>(entries: impl Iterator<Item = (&'a String, &'a Value)>, out: &mut String) {
    let mut entries: Vec<(&String, &Value)> = entries.collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        // Value's Display escapes the key exactly like a JSON string.
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        write_value(value, out);
    }
    out.push('}');
}
