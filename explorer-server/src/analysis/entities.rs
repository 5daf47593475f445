//! Consumer/provider entity resolution

use super::labels::Association;
use crate::models::{EntityRef, Record};

/// Expands entity references into the workloads they cover, using `A` to
/// decide which workloads a label applies to.
pub struct EntityResolver<'a, A: Association> {
    workloads: &'a [Record],
    labels: &'a [Record],
    association: A,
}

impl<'a, A: Association> EntityResolver<'a, A> {
    pub fn new(workloads: &'a [Record], labels: &'a [Record], association: A) -> Self {
        Self {
            workloads,
            labels,
            association,
        }
    }

    /// Resolve references in input order. Unmatched references contribute
    /// nothing; duplicates are kept.
    pub fn resolve<'r>(&self, refs: impl IntoIterator<Item = &'r EntityRef>) -> Vec<&'a Record> {
        refs.into_iter().flat_map(|r| self.resolve_one(r)).collect()
    }

    pub fn resolve_one(&self, entity: &EntityRef) -> Vec<&'a Record> {
        match entity {
            EntityRef::Workload { href } => self
                .workloads
                .iter()
                .find(|w| w.href() == Some(href.as_str()))
                .into_iter()
                .collect(),
            EntityRef::Label { href, key } => self.resolve_label(href.as_deref(), key.as_deref()),
            EntityRef::Other => Vec::new(),
        }
    }

    /// Workloads associated with any label whose href or key equals the
    /// reference's, in workload collection order.
    fn resolve_label(&self, href: Option<&str>, key: Option<&str>) -> Vec<&'a Record> {
        let targets: Vec<&Record> = self
            .labels
            .iter()
            .filter(|l| {
                let href_hit = href.is_some() && l.str_field("href") == href;
                let key_hit = key.is_some() && l.str_field("key") == key;
                href_hit || key_hit
            })
            .collect();

        if targets.is_empty() {
            return Vec::new();
        }

        self.workloads
            .iter()
            .filter(|w| targets.iter().any(|l| self.association.associates(l, w)))
            .collect()
    }
}

/// Drop repeated workloads, keyed by href, else by id. Records with neither
/// are always kept.
pub fn distinct_by_identity<'a>(workloads: &[&'a Record]) -> Vec<&'a Record> {
    let mut seen = std::collections::HashSet::new();
    workloads
        .iter()
        .copied()
        .filter(|w| {
            let key = w
                .href()
                .map(|h| format!("href:{h}"))
                .or_else(|| w.id().map(|id| format!("id:{id}")));
            key.map_or(true, |k| seen.insert(k))
        })
        .collect()
}
