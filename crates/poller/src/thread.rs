//! Alert thread resolution.
//!
//! Successive corrections and updates to one hazard event arrive as separate
//! feed records, each with a fresh `id`. All of them carry the original
//! alert's identifier at the head of their CAP `references` chain, so the
//! first reference identifier names the logical thread. Records without a
//! usable reference or id fall back to an order-independent content hash.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::feed::AlertRecord;

/// One CAP reference triplet: `sender,identifier,timestamp`. The capture is
/// the identifier token of the first triplet in the string.
static FIRST_REF_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^,\s]+,([^,\s]+),[^,\s]+").expect("valid reference regex"));

/// Stable identifier for a logical hazard-alert thread.
///
/// Derived fresh each cycle from an [`AlertRecord`]; never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Resolve the thread a record belongs to.
///
/// Preference order: identifier of the first reference triplet (scanning
/// reference entries in order, taking the first that yields one), then the
/// record's own `id`, then a SHA-1 over the record's full property set with
/// recursively sorted keys so identical payloads always collapse to the same
/// thread.
pub fn resolve(record: &AlertRecord) -> ThreadId {
    for refs in &record.references {
        if let Some(id) = first_ref_id(refs) {
            return ThreadId(id);
        }
    }

    if let Some(id) = record.id.as_deref() {
        if !id.is_empty() {
            return ThreadId(id.to_string());
        }
    }

    ThreadId(content_hash(record.raw()))
}

/// Extract the identifier token of the first `sender,identifier,timestamp`
/// triplet in a reference string.
fn first_ref_id(refs: &str) -> Option<String> {
    FIRST_REF_ID
        .captures(refs)
        .map(|caps| caps[1].to_string())
}

/// SHA-1 hex digest of a value serialized with recursively sorted object keys.
fn content_hash(value: &Value) -> String {
    let mut hasher = Sha1::new();
    hasher.update(canonical_json(value).as_bytes());
    hex::encode(hasher.finalize())
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).unwrap_or_default(),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let elems: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", elems.join(","))
        }
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
