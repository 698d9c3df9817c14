//! Surveyor - Quality Metric Collection Engine
//!
//! Surveyor polls heterogeneous external tools (CI servers, issue trackers,
//! security scanners), extracts one numeric measurement plus supporting
//! records per source, and reports aggregated results to a central server.
//! It can be used as a library by other Rust projects, or run as a
//! standalone binary with the `surveyor` executable.
//!
//! # Architecture
//!
//! - **Collector**: the [`SourceCollector`] hook contract vendor adapters
//!   implement, plus shared support (caching, tree flattening)
//! - **Registry**: static dispatch from (source kind, metric kind) to a
//!   collector factory
//! - **Pipeline**: two-phase safe fetch/parse; failures become measurement
//!   data, never exceptions
//! - **Aggregation**: sum/max/min across sources with null propagation
//! - **Scheduler**: the polling loop talking to the central server
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use surveyor::adapters;
//! use surveyor::config::EngineConfig;
//! use surveyor::registry::CollectorRegistry;
//! use surveyor::scheduler::Scheduler;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::new("http://localhost:5001/api")?;
//! let registry = Arc::new(CollectorRegistry::with_default_adapters());
//! let definitions = Arc::new(adapters::default_definitions());
//! Scheduler::new(config, registry, definitions)?.run().await;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod aggregate;
pub mod collector;
pub mod config;
pub mod model;
pub mod params;
pub mod pipeline;
pub mod redact;
pub mod registry;
pub mod scheduler;

pub use aggregate::aggregate;
pub use collector::{CollectError, RawResponse, ReportCache, SourceCollector, SourceResponses};
pub use config::EngineConfig;
pub use model::{
    AggregationStrategy, Entity, Measurement, MetricConfig, ParameterValue, SourceConfig,
    SourceMeasurement, MAX_ENTITIES,
};
pub use params::{ParameterDefinitions, ParameterView};
pub use pipeline::FetchPipeline;
pub use registry::{CollectorRegistry, RegistryError};
pub use scheduler::Scheduler;
