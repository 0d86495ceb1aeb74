//! Payload filters understood by every vector store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Equality on one payload field.
///
/// `field` is a dotted path into the point payload, e.g. `metadata.chat_id`.
/// A missing field never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub value: serde_json::Value,
}

impl FilterCondition {
    pub fn matches(&self, payload: &serde_json::Value) -> bool {
        lookup(payload, &self.field) == Some(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    Condition(FilterCondition),
    /// Every inner filter matches.
    And(Vec<Filter>),
    /// The inner filter does not match.
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Filter::Condition(FilterCondition {
            field: field.into(),
            value: value.into(),
        })
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    /// Equality filter on a metadata field (`metadata.<key>`).
    pub fn metadata_eq(key: &str, value: impl Into<serde_json::Value>) -> Self {
        Filter::eq(format!("metadata.{}", key), value)
    }

    pub fn matches(&self, payload: &serde_json::Value) -> bool {
        match self {
            Filter::Condition(cond) => cond.matches(payload),
            Filter::And(filters) => filters.iter().all(|f| f.matches(payload)),
            Filter::Not(inner) => !inner.matches(payload),
        }
    }
}

/// AND of `metadata.<key> == value` for every non-null entry.
pub fn from_metadata_filters(filters: &HashMap<String, serde_json::Value>) -> Option<Filter> {
    let mut conditions: Vec<Filter> = filters
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| Filter::metadata_eq(k, v.clone()))
        .collect();

    match conditions.len() {
        0 => None,
        1 => conditions.pop(),
        _ => Some(Filter::And(conditions)),
    }
}

fn lookup<'a>(payload: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.')
        .try_fold(payload, |value, segment| value.get(segment))
}
