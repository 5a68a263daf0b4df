//! Rows behind the CSV exports.
//!
//! [`tabular`] flattens documents into a header plus string cells;
//! [`group_counts`] builds the grouped count over a categorical field.
//! Writing these rows to disk is the application's job.

use std::collections::HashMap;

use serde_json::Value;

use crate::fingerprint::canonical_json;
use crate::models::StoredDocument;

/// Full export: identifier column first, then every body field in
/// first-seen order across documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularExport {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One `(value, count)` row of the aggregate export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCount {
    pub value: String,
    pub count: u64,
}

/// Aggregate export over `field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateExport {
    pub field: String,
    pub rows: Vec<GroupCount>,
}

impl AggregateExport {
    pub fn header(&self) -> [&str; 2] {
        [self.field.as_str(), "count"]
    }
}

pub fn tabular(docs: &[StoredDocument], id_column: &str) -> TabularExport {
    let mut header = vec![id_column.to_string()];
    for doc in docs {
        for key in doc.body.keys() {
            if !header.iter().any(|h| h == key) {
                header.push(key.clone());
            }
        }
    }

    let rows = docs
        .iter()
        .map(|doc| {
            let mut row = Vec::with_capacity(header.len());
            row.push(doc.id.value.clone());
            row.extend(header[1..].iter().map(|col| cell(doc.body.get(col))));
            row
        })
        .collect();

    TabularExport { header, rows }
}

/// Render one value as a CSV cell.
///
/// Null and absent become empty; objects and arrays become canonical JSON;
/// strings pass through; numbers and booleans use their canonical JSON text.
pub fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => canonical_json(v),
    }
}

/// Grouping key for a categorical value. Only scalars form groups.
pub fn group_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) => Some(canonical_json(value)),
        Value::Null | Value::Object(_) | Value::Array(_) => None,
    }
}

/// Count documents by the scalar value of `field`, sorted by count
/// descending; ties keep the order in which each group was first seen.
pub fn group_counts(docs: &[StoredDocument], field: &str) -> Vec<GroupCount> {
    let mut groups: Vec<GroupCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for doc in docs {
        let Some(value) = doc.body.get(field).and_then(group_key) else {
            continue;
        };
        match index.get(&value) {
            Some(&i) => groups[i].count += 1,
            None => {
                index.insert(value.clone(), groups.len());
                groups.push(GroupCount { value, count: 1 });
            }
        }
    }

    // sort_by is stable, which is what keeps ties in first-seen order.
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups
}

pub fn aggregate(docs: &[StoredDocument], field: &str) -> AggregateExport {
    AggregateExport {
        field: field.to_string(),
        rows: group_counts(docs, field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentId, IdKind};
    use serde_json::json;

    fn doc(id: &str, body: Value) -> StoredDocument {
        StoredDocument {
            id: DocumentId {
                value: id.to_string(),
                kind: IdKind::String,
            },
            body: body.as_object().unwrap().clone(),
            content_hash: String::new(),
            inserted_at: 0,
        }
    }

    fn actions(seq: &[&str]) -> Vec<StoredDocument> {
        seq.iter()
            .enumerate()
            .map(|(i, a)| doc(&i.to_string(), json!({ "action": a })))
            .collect()
    }

    #[test]
    fn columns_are_first_seen_union() {
        let docs = vec![
            doc("1", json!({"user": "amel", "action": "login"})),
            doc("2", json!({"action": "post", "details": {"b": 2, "a": [1, null]}})),
            doc("3", json!({"ok": true, "n": 1.5, "gone": null})),
        ];
        let out = tabular(&docs, "_id");
        assert_eq!(
            out.header,
            vec!["_id", "user", "action", "details", "ok", "n", "gone"]
        );
        assert_eq!(out.rows[0], vec!["1", "amel", "login", "", "", "", ""]);
        assert_eq!(
            out.rows[1],
            vec!["2", "", "post", r#"{"a":[1,null],"b":2}"#, "", "", ""]
        );
        assert_eq!(out.rows[2], vec!["3", "", "", "", "true", "1.5", ""]);
    }

    #[test]
    fn empty_export_is_header_only() {
        let out = tabular(&[], "_id");
        assert_eq!(out.header, vec!["_id"]);
        assert!(out.rows.is_empty());
        let agg = aggregate(&[], "action");
        assert_eq!(agg.header(), ["action", "count"]);
        assert!(agg.rows.is_empty());
    }

    #[test]
    fn aggregate_orders_by_count_then_first_seen() {
        let docs = actions(&[
            "login", "logout", "click", "logout", "login", "click", "logout", "click", "logout",
            "login", "click", "logout", "click",
        ]);
        let rows = group_counts(&docs, "action");
        let got: Vec<(&str, u64)> = rows.iter().map(|g| (g.value.as_str(), g.count)).collect();
        assert_eq!(got, vec![("logout", 5), ("click", 5), ("login", 3)]);
    }

    #[test]
    fn aggregate_tie_goes_to_group_seen_first() {
        let docs = actions(&[
            "click", "login", "logout", "click", "logout", "click", "logout", "click", "logout",
            "click", "logout", "login", "login",
        ]);
        let rows = group_counts(&docs, "action");
        let got: Vec<&str> = rows.iter().map(|g| g.value.as_str()).collect();
        assert_eq!(got, vec!["click", "logout", "login"]);
    }

    #[test]
    fn aggregate_skips_missing_and_nested() {
        let docs = vec![
            doc("1", json!({"action": "login"})),
            doc("2", json!({"user": "x"})),
            doc("3", json!({"action": null})),
            doc("4", json!({"action": {"k": 1}})),
            doc("5", json!({"action": 7})),
        ];
        let rows = group_counts(&docs, "action");
        assert_eq!(
            rows,
            vec![
                GroupCount { value: "login".into(), count: 1 },
                GroupCount { value: "7".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn numbers_render_canonically() {
        let body: Value =
            serde_json::from_str(r#"{"big":123456789012345678901234567890,"p":2.50,"e":1E2}"#)
                .unwrap();
        let docs = vec![doc("1", body)];
        let out = tabular(&docs, "_id");
        assert_eq!(
            out.rows[0],
            vec!["1", "123456789012345678901234567890", "2.5", "100.0"]
        );
        assert_eq!(
            group_counts(&docs, "big")[0].value,
            "123456789012345678901234567890"
        );
    }
}
