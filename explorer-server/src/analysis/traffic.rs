//! Ruleset traffic graph
//!
//! Collects every rule's consumer and provider references first, then
//! resolves the two concatenated sequences once. Per-rule counts are read
//! off the same resolution by span, never resolved a second time.

use serde::Serialize;
use std::ops::Range;

use super::entities::EntityResolver;
use super::labels::Association;
use crate::models::{EntityRef, Record, Ruleset};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSummary {
    pub enabled: bool,
    /// Workloads the rule's consumers resolve to (duplicates counted).
    pub consumer_count: usize,
    pub provider_count: usize,
    /// Raw reference counts as written in the rule.
    pub consumer_refs: usize,
    pub provider_refs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrafficView<'a> {
    pub consumers: Vec<&'a Record>,
    pub providers: Vec<&'a Record>,
    pub per_rule: Vec<RuleSummary>,
}

/// Concatenated references plus the slice each rule contributed.
#[derive(Default)]
struct Side<'r> {
    refs: Vec<&'r EntityRef>,
    spans: Vec<Range<usize>>,
}

impl<'r> Side<'r> {
    fn push_rule(&mut self, refs: &'r [EntityRef]) {
        let start = self.refs.len();
        self.refs.extend(refs);
        self.spans.push(start..self.refs.len());
    }

    /// Resolve the concatenated references span by span, each reference
    /// exactly once; returns the flattened workloads and the resolved count
    /// per rule.
    fn resolve<'a, A: Association>(
        &self,
        resolver: &EntityResolver<'a, A>,
    ) -> (Vec<&'a Record>, Vec<usize>) {
        let mut workloads = Vec::new();
        let mut counts = Vec::with_capacity(self.spans.len());
        for span in &self.spans {
            let resolved = resolver.resolve(self.refs[span.clone()].iter().copied());
            counts.push(resolved.len());
            workloads.extend(resolved);
        }
        (workloads, counts)
    }
}

pub fn build_traffic_view<'a, A: Association>(
    ruleset: &Ruleset,
    resolver: &EntityResolver<'a, A>,
) -> TrafficView<'a> {
    let mut consumers = Side::default();
    let mut providers = Side::default();

    for rule in &ruleset.rules {
        consumers.push_rule(&rule.consumers);
        providers.push_rule(&rule.providers);
    }

    let (consumer_workloads, consumer_counts) = consumers.resolve(resolver);
    let (provider_workloads, provider_counts) = providers.resolve(resolver);

    let per_rule = ruleset
        .rules
        .iter()
        .enumerate()
        .map(|(i, rule)| RuleSummary {
            enabled: rule.enabled,
            consumer_count: consumer_counts[i],
            provider_count: provider_counts[i],
            consumer_refs: rule.consumers.len(),
            provider_refs: rule.providers.len(),
        })
        .collect();

    TrafficView {
        consumers: consumer_workloads,
        providers: provider_workloads,
        per_rule,
    }
}

/// Rulesets with a rule that names the workload's href directly as a
/// consumer or provider. Label references are not followed.
pub fn related_rulesets<'a>(workload: &Record, rulesets: &'a [Record]) -> Vec<&'a Record> {
    let Some(href) = workload.href() else {
        return Vec::new();
    };
    rulesets
        .iter()
        .filter(|r| {
            Ruleset::from_record(r)
                .rules
                .iter()
                .any(|rule| rule.references_workload(href))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::labels::SoftMatch;
    use serde_json::{json, Value};

    fn rec(v: Value) -> Record {
        Record::from_value(v).unwrap()
    }

    fn ruleset(v: Value) -> Ruleset {
        Ruleset::from_record(&rec(v))
    }

    #[test]
    fn test_single_rule_workload_to_label() {
        let rs = ruleset(json!({
            "enabled": true,
            "rules": [{
                "enabled": true,
                "consumers": [{"workload": {"href": "/w/1"}}],
                "providers": [{"label": {"key": "role", "href": "/lbl/a"}}]
            }]
        }));
        let workloads = vec![rec(json!({"id": "a1", "href": "/w/1"})), rec(json!({"id": "a2", "href": "/w/2"}))];
        let labels = vec![rec(json!({"href": "/lbl/a", "workload_id": "a2"}))];
        let resolver = EntityResolver::new(&workloads, &labels, SoftMatch);

        let view = build_traffic_view(&rs, &resolver);
        assert_eq!(view.consumers, vec![&workloads[0]]);
        assert_eq!(view.providers, vec![&workloads[1]]);
        assert_eq!(
            view.per_rule,
            vec![RuleSummary {
                enabled: true,
                consumer_count: 1,
                provider_count: 1,
                consumer_refs: 1,
                provider_refs: 1,
            }]
        );
    }

    #[test]
    fn test_zero_rules_is_empty_not_error() {
        let rs = ruleset(json!({"enabled": false, "rules": []}));
        let workloads = vec![rec(json!({"href": "/w/1"}))];
        let view = build_traffic_view(&rs, &EntityResolver::new(&workloads, &[], SoftMatch));
        assert!(view.consumers.is_empty());
        assert!(view.providers.is_empty());
        assert!(view.per_rule.is_empty());

        let no_rules_field = ruleset(json!({"name": "bare"}));
        assert!(build_traffic_view(&no_rules_field, &EntityResolver::new(&workloads, &[], SoftMatch)).per_rule.is_empty());
    }

    #[test]
    fn test_aggregate_matches_per_rule_counts() {
        let rs = ruleset(json!({
            "rules": [
                {"enabled": true,
                 "consumers": [{"workload": {"href": "/w/1"}}, {"workload": {"href": "/w/404"}}],
                 "providers": [{"workload": {"href": "/w/2"}}]},
                {"enabled": false,
                 "consumers": [{"label": {"key": "env"}}, {"ip_list": {"href": "/ip/1"}}],
                 "providers": []}
            ]
        }));
        let workloads = vec![
            rec(json!({"id": 1, "href": "/w/1"})),
            rec(json!({"id": 2, "href": "/w/2"})),
            rec(json!({"id": 3, "href": "/w/3"})),
        ];
        let labels = vec![
            rec(json!({"key": "env", "workload_id": 1})),
            rec(json!({"key": "env", "workload_id": 3})),
        ];
        let view = build_traffic_view(&rs, &EntityResolver::new(&workloads, &labels, SoftMatch));

        assert_eq!(view.consumers, vec![&workloads[0], &workloads[0], &workloads[2]]);
        assert_eq!(view.providers, vec![&workloads[1]]);

        assert_eq!(view.per_rule[0].consumer_count, 1);
        assert_eq!(view.per_rule[0].consumer_refs, 2);
        assert_eq!(view.per_rule[0].provider_count, 1);
        assert!(!view.per_rule[1].enabled);
        assert_eq!(view.per_rule[1].consumer_count, 2);
        assert_eq!(view.per_rule[1].consumer_refs, 2);
        assert_eq!(view.per_rule[1].provider_count, 0);

        let total: usize = view.per_rule.iter().map(|r| r.consumer_count).sum();
        assert_eq!(total, view.consumers.len());
    }

    #[test]
    fn test_related_rulesets_direct_references_only() {
        let rulesets = vec![
            rec(json!({"name": "a", "rules": [{"providers": [{"workload": {"href": "/w/1"}}]}]})),
            rec(json!({"name": "b", "rules": [{"consumers": [{"label": {"href": "/w/1"}}]}]})),
            rec(json!({"name": "c", "rules": [{"consumers": [{"workload": {"href": "/w/2"}}]}]})),
        ];
        let workload = rec(json!({"href": "/w/1"}));
        assert_eq!(related_rulesets(&workload, &rulesets), vec![&rulesets[0]]);
        assert!(related_rulesets(&rec(json!({"name": "nohref"})), &rulesets).is_empty());
    }
}
