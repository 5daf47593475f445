//! Analysis handlers
//!
//! All views read the latest version of each collection they need; the
//! collections are loaded concurrently per request.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::export::download;
use crate::analysis::{
    build_traffic_view, distinct_by_identity, environment_breakdown, filter_options,
    filter_workloads, labels_for_workload, related_rulesets, service_usage, EntityResolver,
    NamedValue, RuleSummary, WorkloadQuery,
};
use crate::export::ExportFormat;
use crate::models::{Collection, Record, Ruleset};
use crate::{AppError, AppResult, AppState};

const GRAPH_COLLECTIONS: [Collection; 3] =
    [Collection::Workloads, Collection::Labels, Collection::Rulesets];

#[derive(Debug, Deserialize, Default)]
pub struct WorkloadParams {
    pub field: Option<String>,
    pub value: Option<String>,
    pub search: Option<String>,
    pub format: Option<ExportFormat>,
}

impl WorkloadParams {
    fn query(&self) -> WorkloadQuery {
        WorkloadQuery::new(self.field.as_deref(), self.value.as_deref(), self.search.as_deref())
    }
}

#[derive(Debug, Serialize)]
pub struct WorkloadsResponse<'a> {
    pub total: usize,
    pub count: usize,
    pub workloads: Vec<&'a Record>,
}

#[derive(Debug, Deserialize)]
pub struct HrefParams {
    pub href: String,
}

#[derive(Debug, Serialize)]
pub struct WorkloadDetails<'a> {
    pub workload: &'a Record,
    pub name: String,
    pub labels: Vec<&'a Record>,
    pub related_rulesets: Vec<&'a Record>,
}

#[derive(Debug, Deserialize)]
pub struct RulesetParams {
    pub href: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrafficResponse<'a> {
    pub name: String,
    pub href: Option<String>,
    pub enabled: bool,
    pub rule_count: usize,
    /// Distinct workloads by href, else id.
    pub distinct_consumers: usize,
    pub distinct_providers: usize,
    pub consumers: Vec<&'a Record>,
    pub providers: Vec<&'a Record>,
    pub per_rule: Vec<RuleSummary>,
}

#[derive(Debug, Deserialize)]
pub struct FieldParams {
    pub field: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ChartParams {
    pub format: Option<ExportFormat>,
}

/// Filtered, searched workload list
pub async fn workloads(
    State(state): State<AppState>,
    Query(params): Query<WorkloadParams>,
) -> AppResult<Response> {
    let snapshot = state.loader.snapshot(&[Collection::Workloads]).await?;
    let all = snapshot.workloads();
    let matched = filter_workloads(all, &params.query());

    tracing::debug!("Workload filter matched {} of {}", matched.len(), all.len());

    Ok(Json(WorkloadsResponse {
        total: all.len(),
        count: matched.len(),
        workloads: matched,
    })
    .into_response())
}

/// Download the filtered workload list
pub async fn export_workloads(
    State(state): State<AppState>,
    Query(params): Query<WorkloadParams>,
) -> AppResult<Response> {
    let snapshot = state.loader.snapshot(&[Collection::Workloads]).await?;
    let matched = filter_workloads(snapshot.workloads(), &params.query());
    if matched.is_empty() {
        return Err(AppError::NotFound("No workloads match the filter".to_string()));
    }
    download(&matched, params.format.unwrap_or_default(), "filtered-workloads")
}

/// One workload with its labels and the rulesets that name it
pub async fn workload(
    State(state): State<AppState>,
    Query(params): Query<HrefParams>,
) -> AppResult<Response> {
    let snapshot = state.loader.snapshot(&GRAPH_COLLECTIONS).await?;
    let workload = snapshot
        .workloads()
        .iter()
        .find(|w| w.href() == Some(params.href.as_str()))
        .ok_or_else(|| AppError::NotFound("Workload not found".to_string()))?;

    Ok(Json(WorkloadDetails {
        workload,
        name: workload.display_name(),
        labels: labels_for_workload(&state.config.label_match, workload, snapshot.labels()),
        related_rulesets: related_rulesets(workload, snapshot.rulesets()),
    })
    .into_response())
}

/// Consumer -> provider traffic of one ruleset
pub async fn ruleset(
    State(state): State<AppState>,
    Query(params): Query<RulesetParams>,
) -> AppResult<Response> {
    if params.href.is_none() && params.name.is_none() {
        return Err(AppError::ValidationError("href or name is required".to_string()));
    }

    let snapshot = state.loader.snapshot(&GRAPH_COLLECTIONS).await?;
    let record = snapshot
        .rulesets()
        .iter()
        .find(|r| match (&params.href, &params.name) {
            (Some(href), _) => r.href() == Some(href.as_str()),
            (None, Some(name)) => r.str_field("name") == Some(name.as_str()),
            (None, None) => false,
        })
        .ok_or_else(|| AppError::NotFound("Ruleset not found".to_string()))?;

    let ruleset = Ruleset::from_record(record);
    let resolver = EntityResolver::new(
        snapshot.workloads(),
        snapshot.labels(),
        state.config.label_match,
    );
    let view = build_traffic_view(&ruleset, &resolver);

    tracing::debug!(
        "Ruleset {}: {} consumers, {} providers across {} rules",
        ruleset.name, view.consumers.len(), view.providers.len(), ruleset.rules.len()
    );

    Ok(Json(TrafficResponse {
        rule_count: ruleset.rules.len(),
        distinct_consumers: distinct_by_identity(&view.consumers).len(),
        distinct_providers: distinct_by_identity(&view.providers).len(),
        name: ruleset.name,
        href: ruleset.href,
        enabled: ruleset.enabled,
        consumers: view.consumers,
        providers: view.providers,
        per_rule: view.per_rule,
    })
    .into_response())
}

/// Distinct values of a workload field, for the filter dropdown
pub async fn options(
    State(state): State<AppState>,
    Query(params): Query<FieldParams>,
) -> AppResult<Json<Vec<Value>>> {
    let snapshot = state.loader.snapshot(&[Collection::Workloads]).await?;
    Ok(Json(filter_options(snapshot.workloads(), &params.field)))
}

/// Workloads per environment
pub async fn environments(
    State(state): State<AppState>,
    Query(params): Query<ChartParams>,
) -> AppResult<Response> {
    let snapshot = state.loader.snapshot(&[Collection::Workloads]).await?;
    chart(environment_breakdown(snapshot.workloads()), params.format, "environment-data")
}

/// Most used services across rulesets
pub async fn services(
    State(state): State<AppState>,
    Query(params): Query<ChartParams>,
) -> AppResult<Response> {
    let snapshot = state.loader.snapshot(&[Collection::Rulesets]).await?;
    chart(service_usage(snapshot.rulesets()), params.format, "services-data")
}

fn chart(data: Vec<NamedValue>, format: Option<ExportFormat>, stem: &str) -> AppResult<Response> {
    match format {
        Some(format) => download(&data, format, stem),
        None => Ok(Json(data).into_response()),
    }
}
