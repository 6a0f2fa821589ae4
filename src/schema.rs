//! Canonical field schema shared by the comparator, snapshot store and
//! tabular exporter. Field order is positional and load-bearing: stored
//! snapshots and exported rows are read back by index, so the order must
//! never change without a migration of the persisted data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Countable fields in canonical order: non-empty headings per level,
/// total headings per level, then the title and description counts.
pub const FIELDS: [&str; 14] = [
    "h1_non_empty",
    "h2_non_empty",
    "h3_non_empty",
    "h4_non_empty",
    "h5_non_empty",
    "h6_non_empty",
    "h1_total",
    "h2_total",
    "h3_total",
    "h4_total",
    "h5_total",
    "h6_total",
    "title_count",
    "description_count",
];

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
}

pub fn fields() -> impl Iterator<Item = &'static str> {
    FIELDS.iter().copied()
}

pub fn index_of(name: &str) -> Result<usize, SchemaError> {
    FIELDS
        .iter()
        .position(|field| *field == name)
        .ok_or_else(|| SchemaError::UnknownField(name.to_string()))
}

/// A stored count. Fetchers always produce numbers, but persisted data
/// may carry arbitrary text (hand-edited snapshots, older writers), so
/// deserialization keeps malformed values instead of failing the whole
/// load; the comparator surfaces them as per-field parse errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountValue {
    Count(i64),
    Raw(String),
}

impl CountValue {
    pub fn as_count(&self) -> Option<i64> {
        match self {
            CountValue::Count(n) => Some(*n),
            CountValue::Raw(s) => s.trim().parse().ok(),
        }
    }
}

impl From<i64> for CountValue {
    fn from(n: i64) -> Self {
        CountValue::Count(n)
    }
}

/// Per-URL counts for one run, keyed by field name.
pub type PageCounts = BTreeMap<String, CountValue>;

/// Reads one field out of a counts mapping. A missing field counts as
/// zero; only a malformed value yields `None`.
pub fn count_of(counts: &PageCounts, field: &str) -> Option<i64> {
    match counts.get(field) {
        None => Some(0),
        Some(value) => value.as_count(),
    }
}
