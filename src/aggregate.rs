//! Combining per-source results into one metric-level measurement.

use uuid::Uuid;

use crate::model::{AggregationStrategy, Measurement, MetricConfig, SourceMeasurement};

/// Combine source measurements into the metric's measurement.
///
/// The metric-level value exists only when every source produced one; a
/// metric is never silently computed from a subset of its sources. The
/// per-source breakdown is carried through untouched so the dashboard can
/// show exactly which source failed and why. This step has no failure mode
/// of its own.
pub fn aggregate(
    metric_uuid: Uuid,
    config: &MetricConfig,
    sources: Vec<SourceMeasurement>,
) -> Measurement {
    let value = aggregate_value(config.addition, &sources);
    Measurement {
        metric_uuid,
        report_uuid: config.report_uuid,
        value,
        sources,
    }
}

fn aggregate_value(
    strategy: AggregationStrategy,
    sources: &[SourceMeasurement],
) -> Option<String> {
    let mut values = Vec::with_capacity(sources.len());
    for source in sources {
        let text = source.value.as_deref()?;
        match text.parse::<i64>() {
            Ok(value) => values.push(value),
            Err(_) => {
                tracing::warn!(source = %source.source_uuid, value = %text, "Source value is not numeric");
                return None;
            }
        }
    }
    let combined = match strategy {
        AggregationStrategy::Sum => Some(values.iter().sum::<i64>()),
        AggregationStrategy::Max => values.iter().max().copied(),
        AggregationStrategy::Min => values.iter().min().copied(),
    }?;
    Some(combined.to_string())
}
