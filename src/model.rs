//! Core data types for metric collection.
//!
//! This module defines the structures exchanged with the central server and
//! produced by the collection engine:
//!
//! - [`MetricConfig`] / [`SourceConfig`]: metric and source definitions as
//!   returned by the metrics listing endpoint
//! - [`Entity`]: one structured supporting record attached to a measurement
//! - [`SourceMeasurement`]: the outcome of collecting a single source
//! - [`Measurement`]: the aggregated, per-cycle result for one metric

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use url::Url;
use uuid::Uuid;

/// Maximum number of entities kept per source measurement (default 100).
///
/// Longer entity lists are truncated, never sampled, so the kept prefix is
/// stable across repeated collections of unchanged source data.
pub const MAX_ENTITIES: usize = 100;

/// How per-source values combine into one metric-level value.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AggregationStrategy {
    /// Add the source values together.
    #[default]
    Sum,
    /// Keep the largest source value.
    Max,
    /// Keep the smallest source value.
    Min,
}

/// A user-supplied parameter value: a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Single string value (e.g., a URL or a username).
    Single(String),
    /// Multiple string values (e.g., a set of severities).
    Multiple(Vec<String>),
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl<const N: usize> From<[&str; N]> for ParameterValue {
    fn from(values: [&str; N]) -> Self {
        Self::Multiple(values.iter().map(|v| v.to_string()).collect())
    }
}

/// One configured source of a metric, as listed by the central server.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Source kind (vendor/report-type tag, e.g., "jenkins").
    #[serde(rename = "type")]
    pub source_type: String,
    /// User-supplied parameters (url, credentials, vendor-specific keys).
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
}

/// One configured metric, as listed by the central server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricConfig {
    /// Metric kind (e.g., "failed_jobs", "violations").
    #[serde(rename = "type")]
    pub metric_type: String,
    /// How source values combine (default: sum).
    #[serde(default)]
    pub addition: AggregationStrategy,
    /// Sources contributing to this metric, keyed by source uuid.
    #[serde(default)]
    pub sources: BTreeMap<Uuid, SourceConfig>,
    /// Report the metric belongs to.
    pub report_uuid: Uuid,
}

/// One structured supporting record (e.g., a failing job, a vulnerability).
///
/// The `key` must be unique within one source measurement; the dashboard uses
/// it to track entities across measurements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique key within one source measurement.
    pub key: String,
    /// Named attributes shown in the dashboard (name, severity, ...).
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

impl Entity {
    /// Create an entity with the given unique key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add a named attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Result of one source collection.
///
/// Exactly one of three shapes is produced: a successful measurement with
/// value/total/entities, a connection failure, or a parse failure. An error
/// shape never carries a value or entities; a source contributes all of its
/// data or none of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMeasurement {
    /// Source this measurement belongs to.
    pub source_uuid: Uuid,
    /// API address that was queried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<Url>,
    /// Human-facing address for the dashboard link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landing_url: Option<Url>,
    /// Measured value as a decimal string, if collection succeeded.
    pub value: Option<String>,
    /// Denominator for percentage-scale metrics (default "100").
    pub total: Option<String>,
    /// Supporting records, capped at [`MAX_ENTITIES`].
    pub entities: Vec<Entity>,
    /// Redacted description of a fetch-phase failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_error: Option<String>,
    /// Redacted description of a parse-phase failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl SourceMeasurement {
    /// A successful measurement. Entities are truncated to [`MAX_ENTITIES`].
    pub fn success(
        source_uuid: Uuid,
        api_url: Option<Url>,
        landing_url: Option<Url>,
        value: Option<String>,
        total: Option<String>,
        mut entities: Vec<Entity>,
    ) -> Self {
        entities.truncate(MAX_ENTITIES);
        Self {
            source_uuid,
            api_url,
            landing_url,
            value,
            total,
            entities,
            connection_error: None,
            parse_error: None,
        }
    }

    /// A fetch-phase failure: no value, no total, no entities.
    pub fn connection_failure(
        source_uuid: Uuid,
        api_url: Option<Url>,
        landing_url: Option<Url>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            source_uuid,
            api_url,
            landing_url,
            value: None,
            total: None,
            entities: Vec::new(),
            connection_error: Some(error.into()),
            parse_error: None,
        }
    }

    /// A parse-phase failure: everything parsed so far is discarded.
    pub fn parse_failure(
        source_uuid: Uuid,
        api_url: Option<Url>,
        landing_url: Option<Url>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            source_uuid,
            api_url,
            landing_url,
            value: None,
            total: None,
            entities: Vec::new(),
            connection_error: None,
            parse_error: Some(error.into()),
        }
    }

    /// Whether either error field is set.
    pub fn has_error(&self) -> bool {
        self.connection_error.is_some() || self.parse_error.is_some()
    }
}

/// The aggregated, per-cycle result for one metric.
///
/// Submitted to the measurement endpoint and then discarded; persistence is
/// the server's concern.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// Metric this measurement belongs to.
    pub metric_uuid: Uuid,
    /// Report the metric belongs to.
    pub report_uuid: Uuid,
    /// Aggregated value, or `None` when any source failed to produce one.
    pub value: Option<String>,
    /// Per-source breakdown, kept separate so the dashboard can show which
    /// source failed.
    pub sources: Vec<SourceMeasurement>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_aggregation_strategy_from_str() {
        assert_eq!(
            AggregationStrategy::from_str("sum").unwrap(),
            AggregationStrategy::Sum
        );
        assert_eq!(
            AggregationStrategy::from_str("MAX").unwrap(),
            AggregationStrategy::Max
        );
        assert_eq!(
            AggregationStrategy::from_str("min").unwrap(),
            AggregationStrategy::Min
        );
        assert!(AggregationStrategy::from_str("median").is_err());
    }

    #[test]
    fn test_aggregation_strategy_default() {
        assert_eq!(AggregationStrategy::default(), AggregationStrategy::Sum);
    }

    #[test]
    fn test_parameter_value_untagged() {
        let single: ParameterValue = serde_json::from_str(r#""https://ci.example.org""#).unwrap();
        assert_eq!(single, ParameterValue::from("https://ci.example.org"));

        let multiple: ParameterValue = serde_json::from_str(r#"["high", "critical"]"#).unwrap();
        assert_eq!(multiple, ParameterValue::from(["high", "critical"]));
    }

    #[test]
    fn test_metric_config_from_listing() {
        let json = r#"{
            "type": "failed_jobs",
            "addition": "sum",
            "reportUuid": "10000000-0000-0000-0000-000000000000",
            "sources": {
                "20000000-0000-0000-0000-000000000000": {
                    "type": "jenkins",
                    "parameters": {"url": "https://ci.example.org", "severities": ["high"]}
                }
            }
        }"#;
        let metric: MetricConfig = serde_json::from_str(json).unwrap();
        assert_eq!(metric.metric_type, "failed_jobs");
        assert_eq!(metric.addition, AggregationStrategy::Sum);
        assert_eq!(metric.sources.len(), 1);
        let source = metric.sources.values().next().unwrap();
        assert_eq!(source.source_type, "jenkins");
        assert_eq!(
            source.parameters.get("url"),
            Some(&ParameterValue::from("https://ci.example.org"))
        );
    }

    #[test]
    fn test_metric_config_defaults() {
        let json = r#"{"type": "violations", "reportUuid": "10000000-0000-0000-0000-000000000000"}"#;
        let metric: MetricConfig = serde_json::from_str(json).unwrap();
        assert_eq!(metric.addition, AggregationStrategy::Sum);
        assert!(metric.sources.is_empty());
    }

    #[test]
    fn test_entity_serializes_flat() {
        let entity = Entity::new("job-1")
            .with_attribute("name", "nightly-build")
            .with_attribute("build_status", "FAILURE");
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["key"], "job-1");
        assert_eq!(json["name"], "nightly-build");
        assert_eq!(json["build_status"], "FAILURE");
    }

    #[test]
    fn test_success_truncates_entities() {
        let entities: Vec<Entity> = (0..MAX_ENTITIES + 5)
            .map(|i| Entity::new(format!("entity-{i}")))
            .collect();
        let measurement = SourceMeasurement::success(
            Uuid::new_v4(),
            None,
            None,
            Some("105".to_string()),
            Some("100".to_string()),
            entities,
        );
        assert_eq!(measurement.entities.len(), MAX_ENTITIES);
        assert_eq!(measurement.entities[0].key, "entity-0");
    }

    #[test]
    fn test_error_shapes_carry_no_data() {
        let connection =
            SourceMeasurement::connection_failure(Uuid::new_v4(), None, None, "connection refused");
        assert_eq!(connection.value, None);
        assert_eq!(connection.total, None);
        assert!(connection.entities.is_empty());
        assert!(connection.has_error());

        let parse = SourceMeasurement::parse_failure(Uuid::new_v4(), None, None, "missing field");
        assert_eq!(parse.value, None);
        assert_eq!(parse.total, None);
        assert!(parse.entities.is_empty());
        assert!(parse.has_error());
    }

    #[test]
    fn test_measurement_serializes_camel_case() {
        let measurement = Measurement {
            metric_uuid: Uuid::nil(),
            report_uuid: Uuid::nil(),
            value: Some("7".to_string()),
            sources: vec![SourceMeasurement::connection_failure(
                Uuid::nil(),
                None,
                None,
                "timed out",
            )],
        };
        let json = serde_json::to_value(&measurement).unwrap();
        assert!(json.get("metricUuid").is_some());
        assert!(json.get("reportUuid").is_some());
        assert_eq!(json["sources"][0]["connectionError"], "timed out");
        assert!(json["sources"][0].get("parseError").is_none());
    }
}
