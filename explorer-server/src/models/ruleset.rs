//! Ruleset, rule and entity reference views over raw records

use serde::Serialize;
use serde_json::Value;

use super::Record;

/// A rule-level pointer to the workloads it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRef {
    /// `{workload: {href}}`
    Workload { href: String },
    /// `{label: {href, key}}`, resolved through the labels collection.
    Label {
        href: Option<String>,
        key: Option<String>,
    },
    /// Neither form present (IP lists, "all workloads" actors, garbage).
    Other,
}

impl EntityRef {
    /// The workload form wins when both forms are present.
    pub fn from_value(value: &Value) -> Self {
        if let Some(workload) = value.get("workload").filter(|w| w.is_object()) {
            return match workload.get("href").and_then(Value::as_str) {
                Some(href) => EntityRef::Workload { href: href.to_string() },
                None => EntityRef::Other,
            };
        }
        if let Some(label) = value.get("label").filter(|l| l.is_object()) {
            let text = |field: &str| label.get(field).and_then(Value::as_str).map(str::to_string);
            return EntityRef::Label {
                href: text("href"),
                key: text("key"),
            };
        }
        EntityRef::Other
    }

    pub fn workload_href(&self) -> Option<&str> {
        match self {
            EntityRef::Workload { href } => Some(href),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub enabled: bool,
    pub consumers: Vec<EntityRef>,
    pub providers: Vec<EntityRef>,
}

impl Rule {
    pub fn from_value(value: &Value) -> Self {
        let refs = |field: &str| {
            value
                .get(field)
                .and_then(Value::as_array)
                .map(|items| items.iter().map(EntityRef::from_value).collect())
                .unwrap_or_default()
        };
        Self {
            enabled: value.get("enabled").and_then(Value::as_bool).unwrap_or(false),
            consumers: refs("consumers"),
            providers: refs("providers"),
        }
    }

    /// Whether the rule names this workload href directly on either side.
    pub fn references_workload(&self, href: &str) -> bool {
        self.consumers
            .iter()
            .chain(&self.providers)
            .any(|e| e.workload_href() == Some(href))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ruleset {
    pub href: Option<String>,
    pub name: String,
    pub enabled: bool,
    pub rules: Vec<Rule>,
}

impl Ruleset {
    pub fn from_record(record: &Record) -> Self {
        Self {
            href: record.href().map(str::to_string),
            name: record.display_name(),
            enabled: record.bool_field("enabled").unwrap_or(false),
            rules: record.array_field("rules").iter().map(Rule::from_value).collect(),
        }
    }
}
