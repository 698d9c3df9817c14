//! The polling loop.
//!
//! Each cycle lists the configured metrics, collects every source of every
//! metric through the fetch/parse pipeline, aggregates, and submits one
//! measurement per metric. Per-metric and per-source work is independent, so
//! both fan out concurrently with a fixed bound; a slow source delays only
//! its own contribution. Nothing in a cycle can stop the loop: listing and
//! submission failures are logged and skip one unit of work, and the
//! pipeline converts every source failure into data.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use uuid::Uuid;

use crate::aggregate::aggregate;
use crate::config::{ConfigError, EngineConfig};
use crate::model::{Measurement, MetricConfig, SourceMeasurement};
use crate::params::{ParameterDefinitions, ParameterView};
use crate::pipeline::FetchPipeline;
use crate::registry::{CollectorRegistry, RegistryError};

/// Bound on concurrently collected sources within one metric.
const MAX_CONCURRENT_SOURCES: usize = 16;

/// Bound on concurrently collected metrics within one cycle.
const MAX_CONCURRENT_METRICS: usize = 4;

/// The collection engine's scheduling loop.
pub struct Scheduler {
    config: EngineConfig,
    client: Client,
    pipeline: FetchPipeline,
    registry: Arc<CollectorRegistry>,
    definitions: Arc<ParameterDefinitions>,
}

impl Scheduler {
    /// Create a scheduler.
    ///
    /// One HTTP client is shared by the server endpoints and every source
    /// fetch; the configured request timeout applies to all of them.
    pub fn new(
        config: EngineConfig,
        registry: Arc<CollectorRegistry>,
        definitions: Arc<ParameterDefinitions>,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::Validation(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            pipeline: FetchPipeline::new(client.clone()),
            client,
            registry,
            definitions,
        })
    }

    /// Run collection cycles until the surrounding task is cancelled.
    pub async fn run(&self) {
        tracing::info!(
            server = %self.config.server_url,
            interval = ?self.config.poll_interval,
            "Collection loop started"
        );
        loop {
            self.run_cycle().await;
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Execute one collection cycle over all currently listed metrics.
    pub async fn run_cycle(&self) {
        let metrics = match self.list_metrics().await {
            Ok(metrics) => metrics,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list metrics, skipping cycle");
                return;
            }
        };
        tracing::info!(metrics = metrics.len(), "Collection cycle started");

        stream::iter(metrics)
            .map(|(metric_uuid, metric)| async move {
                self.collect_and_submit(metric_uuid, metric).await;
            })
            .buffer_unordered(MAX_CONCURRENT_METRICS)
            .collect::<Vec<()>>()
            .await;
    }

    /// Collect one metric's sources and produce its measurement.
    ///
    /// Fails only on a dispatch error, which is a configuration problem
    /// rather than a transient fault; fetch and parse failures come back as
    /// data inside the measurement.
    pub async fn collect_metric(
        &self,
        metric_uuid: Uuid,
        metric: &MetricConfig,
    ) -> Result<Measurement, RegistryError> {
        // Resolve every collector up front so a configuration error is
        // reported before any network traffic happens.
        let mut collectors = Vec::with_capacity(metric.sources.len());
        for (source_uuid, source) in &metric.sources {
            let collector = self
                .registry
                .resolve(&source.source_type, &metric.metric_type)?;
            collectors.push((*source_uuid, source, collector));
        }

        let sources: Vec<SourceMeasurement> = stream::iter(collectors)
            .map(|(source_uuid, source, collector)| async move {
                let params =
                    ParameterView::new(source.parameters.clone(), Arc::clone(&self.definitions));
                let measurement = self
                    .pipeline
                    .collect(collector.as_ref(), source_uuid, &params)
                    .await;

                let now = Utc::now();
                let next = collector.next_collection(now);
                if next <= now {
                    tracing::info!(source = %source_uuid, "Source requested an immediate re-poll");
                } else {
                    tracing::debug!(source = %source_uuid, next = %next, "Next collection hint");
                }
                measurement
            })
            .buffered(MAX_CONCURRENT_SOURCES)
            .collect()
            .await;

        Ok(aggregate(metric_uuid, metric, sources))
    }

    async fn collect_and_submit(&self, metric_uuid: Uuid, metric: MetricConfig) {
        let measurement = match self.collect_metric(metric_uuid, &metric).await {
            Ok(measurement) => measurement,
            Err(e) => {
                tracing::error!(metric = %metric_uuid, error = %e, "Dispatch failed, skipping metric");
                return;
            }
        };
        if let Err(e) = self.submit(&measurement).await {
            tracing::error!(metric = %metric_uuid, error = %e, "Failed to submit measurement");
            return;
        }
        tracing::debug!(metric = %metric_uuid, value = ?measurement.value, "Measurement submitted");
    }

    async fn list_metrics(&self) -> Result<BTreeMap<Uuid, MetricConfig>, reqwest::Error> {
        self.client
            .get(self.config.metrics_url())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn submit(&self, measurement: &Measurement) -> Result<(), reqwest::Error> {
        self.client
            .post(self.config.measurements_url())
            .json(measurement)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
