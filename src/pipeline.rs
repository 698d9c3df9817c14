//! Two-phase fetch/parse execution for a single source.
//!
//! Fetching and parsing fail independently so operators can tell "source
//! unreachable" apart from "source reachable but the report format changed".
//! Neither failure ever propagates: the pipeline is the one place where
//! collector errors become measurement data, so one broken source can never
//! abort collection of its peers.

use reqwest::Client;
use uuid::Uuid;

use crate::collector::{SourceCollector, SourceResponses};
use crate::model::{Entity, SourceMeasurement, MAX_ENTITIES};
use crate::params::ParameterView;
use crate::redact::redact;

/// Executes the safe fetch/parse sequence for one source.
#[derive(Debug, Clone)]
pub struct FetchPipeline {
    client: Client,
}

impl FetchPipeline {
    /// Create a pipeline using the given HTTP client.
    ///
    /// The client's request timeout bounds every fetch the pipeline makes.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Collect one source. Never fails; failures come back as data.
    ///
    /// Phase 1 computes the API address and fetches the raw payloads; any
    /// error becomes a `connection_error` and the parse hooks are never
    /// invoked. Phase 2 runs `parse_value`, `parse_total`, `parse_entities`
    /// in that order; any error becomes a `parse_error` and discards all of
    /// the source's data for this cycle. Entities are truncated to
    /// [`MAX_ENTITIES`] afterwards.
    pub async fn collect(
        &self,
        collector: &dyn SourceCollector,
        source_uuid: Uuid,
        params: &ParameterView,
    ) -> SourceMeasurement {
        let api_url = match collector.api_url(params) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(source = %source_uuid, error = %e, "Failed to build API address");
                let landing_url = collector.landing_url(&[], params).ok();
                return SourceMeasurement::connection_failure(
                    source_uuid,
                    None,
                    landing_url,
                    redact(&e.to_string()),
                );
            }
        };

        let responses = match collector.fetch(&self.client, &api_url, params).await {
            Ok(responses) => responses,
            Err(e) => {
                tracing::warn!(source = %source_uuid, error = %e, "Fetch failed");
                let landing_url = collector.landing_url(&[], params).ok();
                return SourceMeasurement::connection_failure(
                    source_uuid,
                    Some(api_url),
                    landing_url,
                    redact(&e.to_string()),
                );
            }
        };

        let landing_url = collector.landing_url(&responses.responses, params).ok();
        match parse(collector, &responses, params) {
            Ok((value, total, entities)) => {
                if entities.len() > MAX_ENTITIES {
                    tracing::debug!(
                        source = %source_uuid,
                        entities = entities.len(),
                        kept = MAX_ENTITIES,
                        "Truncating entity list"
                    );
                }
                tracing::debug!(source = %source_uuid, value = ?value, "Source collected");
                SourceMeasurement::success(
                    source_uuid,
                    Some(api_url),
                    landing_url,
                    value,
                    total,
                    entities,
                )
            }
            Err(e) => {
                tracing::warn!(source = %source_uuid, error = %e, "Parse failed");
                SourceMeasurement::parse_failure(
                    source_uuid,
                    Some(api_url),
                    landing_url,
                    redact(&e.to_string()),
                )
            }
        }
    }
}

type Parsed = (Option<String>, Option<String>, Vec<Entity>);

/// Run the parse hooks in order; all-or-nothing per source.
fn parse(
    collector: &dyn SourceCollector,
    responses: &SourceResponses,
    params: &ParameterView,
) -> Result<Parsed, crate::collector::CollectError> {
    let value = collector.parse_value(responses, params)?;
    let total = collector.parse_total(responses, params)?;
    let entities = collector.parse_entities(responses, params)?;
    Ok((value, total, entities))
}
