//! Source file loader.
//!
//! Reads the JSON log file into a list of [`Record`]s. A missing or blank
//! file is an empty batch (first run); a bare object is a batch of one.

use std::io;
use std::path::{Path, PathBuf};

use log_sync_core::Record;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("malformed input in {path}: {reason}")]
    MalformedInput { path: PathBuf, reason: String },

    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

const SHAPE_REASON: &str = "top-level content must be a JSON object or an array of JSON objects";

pub fn load(path: &Path) -> Result<Vec<Record>, LoadError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse(&raw).map_err(|reason| LoadError::MalformedInput {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse file content. The error is a human-readable reason.
pub fn parse(raw: &str) -> Result<Vec<Record>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let payload: Value = serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {}", e))?;

    match payload {
        Value::Object(record) => Ok(vec![record]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(format!(
                    "{} (element {} is {})",
                    SHAPE_REASON,
                    i,
                    type_name(&other)
                )),
            })
            .collect(),
        other => Err(format!("{} (found {})", SHAPE_REASON, type_name(&other))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
