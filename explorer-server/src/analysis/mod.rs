//! Relationship resolution over loaded collections
//!
//! Everything here is synchronous and pure: inputs are borrowed slices of
//! already-loaded records, outputs borrow from them.

pub mod labels;
pub mod entities;
pub mod traffic;
pub mod filter;
pub mod charts;

pub use labels::{labels_for_workload, LabelMatch};
pub use entities::{distinct_by_identity, EntityResolver};
pub use traffic::{build_traffic_view, related_rulesets, RuleSummary};
pub use filter::{filter_options, filter_workloads, WorkloadQuery};
pub use charts::{environment_breakdown, service_usage, NamedValue};
