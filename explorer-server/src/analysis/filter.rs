//! Workload filter and free-text search

use serde_json::Value;
use std::collections::HashSet;

use crate::models::{is_truthy, Record};

/// Sentinel accepted for "no field filter".
pub const ALL: &str = "all";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkloadQuery {
    /// `(field, value)`; `None` disables the field filter.
    pub field: Option<(String, Value)>,
    /// Lower-cased search text; empty disables the search.
    pub search: String,
}

impl WorkloadQuery {
    /// Build from UI-style parameters where "all" means no filter.
    pub fn new(field: Option<&str>, value: Option<&str>, search: Option<&str>) -> Self {
        let field = match (field, value) {
            (Some(f), Some(v)) if f != ALL && v != ALL => Some((f.to_string(), Value::String(v.to_string()))),
            _ => None,
        };
        Self {
            field,
            search: search.unwrap_or_default().to_lowercase(),
        }
    }

    pub fn matches(&self, workload: &Record) -> bool {
        if let Some((field, value)) = &self.field {
            if workload.get(field) != Some(value) {
                return false;
            }
        }
        self.search.is_empty() || workload.any_field_contains(&self.search)
    }
}

/// Workloads passing both filters, input order preserved.
pub fn filter_workloads<'a>(workloads: &'a [Record], query: &WorkloadQuery) -> Vec<&'a Record> {
    workloads.iter().filter(|w| query.matches(w)).collect()
}

/// Distinct truthy values of `field`, first-seen order. Feeds the filter dropdown.
pub fn filter_options(workloads: &[Record], field: &str) -> Vec<Value> {
    if field == ALL {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    workloads
        .iter()
        .filter_map(|w| w.get(field))
        .filter(|v| is_truthy(v))
        .filter(|v| seen.insert(v.to_string()))
        .cloned()
        .collect()
}
