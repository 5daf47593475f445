//! Aggregations behind the dashboard charts

use serde::{Deserialize, Serialize};

use crate::models::{text_of, Record};

const TOP_SERVICES: usize = 10;

/// One chart slice / bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: u64,
}

/// Workload counts per `environment` (falling back to `env`, then "Unknown"),
/// first-seen order.
pub fn environment_breakdown(workloads: &[Record]) -> Vec<NamedValue> {
    tally(workloads.iter().map(|w| first_text(w, &["environment", "env"])))
}

/// How often each service appears across rulesets' `services` lists, most
/// used first, top ten.
pub fn service_usage(rulesets: &[Record]) -> Vec<NamedValue> {
    let names = rulesets.iter().flat_map(|r| {
        r.array_field("services").iter().map(|s| match Record::from_value(s.clone()) {
            Some(service) => first_text(&service, &["name", "service"]),
            None => "Unknown".to_string(),
        })
    });
    let mut counts = tally(names);
    // Stable: ties keep first-seen order.
    counts.sort_by(|a, b| b.value.cmp(&a.value));
    counts.truncate(TOP_SERVICES);
    counts
}

fn first_text(record: &Record, fields: &[&str]) -> String {
    fields
        .iter()
        .find_map(|f| record.truthy(f))
        .map(text_of)
        .unwrap_or_else(|| "Unknown".to_string())
}

fn tally(names: impl Iterator<Item = String>) -> Vec<NamedValue> {
    let mut counts: Vec<NamedValue> = Vec::new();
    for name in names {
        match counts.iter_mut().find(|c| c.name == name) {
            Some(entry) => entry.value += 1,
            None => counts.push(NamedValue { name, value: 1 }),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn recs(values: Vec<Value>) -> Vec<Record> {
        values.into_iter().map(|v| Record::from_value(v).unwrap()).collect()
    }

    fn nv(name: &str, value: u64) -> NamedValue {
        NamedValue { name: name.to_string(), value }
    }

    #[test]
    fn test_environment_breakdown() {
        let workloads = recs(vec![
            json!({"environment": "prod"}),
            json!({"env": "dev"}),
            json!({"environment": "prod"}),
            json!({"name": "x"}),
            json!({"environment": "", "env": "dev"}),
        ]);
        assert_eq!(
            environment_breakdown(&workloads),
            vec![nv("prod", 2), nv("dev", 2), nv("Unknown", 1)]
        );
    }

    #[test]
    fn test_service_usage_sorted_and_capped() {
        let mut rulesets = recs(vec![
            json!({"services": [{"name": "https"}, {"service": "ssh"}, "bogus"]}),
            json!({"services": [{"name": "https"}, {}]}),
            json!({"rules": []}),
        ]);
        assert_eq!(
            service_usage(&rulesets),
            vec![nv("https", 2), nv("Unknown", 2), nv("ssh", 1)]
        );

        let many: Vec<Value> = (0..15).map(|i| json!({"name": format!("svc-{i}")})).collect();
        rulesets.push(Record::from_value(json!({ "services": many })).unwrap());
        assert_eq!(service_usage(&rulesets).len(), 10);
    }
}
