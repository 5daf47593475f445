//! Collection identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The six fixed export categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    Workloads,
    Labels,
    Services,
    IpLists,
    Rulesets,
    LabelGroups,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown collection: {0}")]
pub struct UnknownCollection(pub String);

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Workloads,
        Collection::Labels,
        Collection::Services,
        Collection::IpLists,
        Collection::Rulesets,
        Collection::LabelGroups,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Workloads => "workloads",
            Collection::Labels => "labels",
            Collection::Services => "services",
            Collection::IpLists => "ip-lists",
            Collection::Rulesets => "rulesets",
            Collection::LabelGroups => "label-groups",
        }
    }

    /// Guess the collection from an export file name.
    ///
    /// Checks run in order; "label" only means labels when "group" is absent.
    pub fn detect_from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_lowercase();
        if lower.contains("workload") {
            Some(Collection::Workloads)
        } else if lower.contains("label") && !lower.contains("group") {
            Some(Collection::Labels)
        } else if lower.contains("service") {
            Some(Collection::Services)
        } else if lower.contains("ip") {
            Some(Collection::IpLists)
        } else if lower.contains("ruleset") {
            Some(Collection::Rulesets)
        } else if lower.contains("label") && lower.contains("group") {
            Some(Collection::LabelGroups)
        } else {
            None
        }
    }
}

impl FromStr for Collection {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCollection(s.to_string()))
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
