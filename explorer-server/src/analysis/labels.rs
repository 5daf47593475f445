//! Label-to-workload association
//!
//! Exports do not carry reliable foreign keys between labels and workloads.
//! Association is a heuristic predicate, kept behind a trait so a stricter
//! join can replace it without touching the resolvers that use it.

use crate::models::Record;

/// Decides whether a label record applies to a workload record.
pub trait Association: Send + Sync {
    fn associates(&self, label: &Record, workload: &Record) -> bool;
}

/// Soft match: `label.workload_id == workload.id`, or the workload's href
/// appears somewhere inside the label's href. Either signal suffices.
///
/// Substring containment can produce spurious matches ("/w/1" is inside
/// "/w/12") and naming mismatches can miss real ones. Both are accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftMatch;

impl Association for SoftMatch {
    fn associates(&self, label: &Record, workload: &Record) -> bool {
        let by_id = match (label.get("workload_id"), workload.id()) {
            (Some(wid), Some(id)) => !wid.is_null() && wid == id,
            _ => false,
        };
        by_id || contains_href(label, workload)
    }
}

/// Only `workload_id == id`; no href heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictId;

impl Association for StrictId {
    fn associates(&self, label: &Record, workload: &Record) -> bool {
        matches!(
            (label.get("workload_id"), workload.id()),
            (Some(wid), Some(id)) if !wid.is_null() && wid == id
        )
    }
}

/// Association rule chosen at startup (`LABEL_MATCH=soft|strict`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMatch {
    #[default]
    Soft,
    Strict,
}

impl LabelMatch {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "soft" => Some(LabelMatch::Soft),
            "strict" => Some(LabelMatch::Strict),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelMatch::Soft => "soft",
            LabelMatch::Strict => "strict",
        }
    }
}

impl Association for LabelMatch {
    fn associates(&self, label: &Record, workload: &Record) -> bool {
        match self {
            LabelMatch::Soft => SoftMatch.associates(label, workload),
            LabelMatch::Strict => StrictId.associates(label, workload),
        }
    }
}

fn contains_href(label: &Record, workload: &Record) -> bool {
    match (label.str_field("href"), workload.href()) {
        (Some(label_href), Some(workload_href)) => label_href.contains(workload_href),
        _ => false,
    }
}

/// Every label the association accepts for the workload, in collection
/// order. No dedup, no ranking.
pub fn labels_for_workload<'a, A: Association + ?Sized>(
    association: &A,
    workload: &Record,
    labels: &'a [Record],
) -> Vec<&'a Record> {
    labels
        .iter()
        .filter(|label| association.associates(label, workload))
        .collect()
}
