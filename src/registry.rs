//! Static mapping from (source kind, metric kind) to collector factories.
//!
//! The registry is built once at startup from the fixed list of known
//! adapters and is read-only afterwards, so it is shared freely across
//! concurrent collection tasks. Resolution is two-tier: a vendor usually
//! registers one collector per metric kind, while simple vendors register a
//! single catch-all collector under the bare source kind.

use std::collections::HashMap;

use thiserror::Error;

use crate::collector::SourceCollector;

/// Constructor for a collector instance. Invoked once per source per cycle.
pub type CollectorFactory = Box<dyn Fn() -> Box<dyn SourceCollector> + Send + Sync>;

/// Dispatch failure: a configuration error, not a transient fault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No collector registered for the source/metric combination.
    #[error("no collector registered for source '{source_kind}' and metric '{metric_kind}'")]
    NotFound {
        /// Source kind that failed to resolve.
        source_kind: String,
        /// Metric kind that failed to resolve.
        metric_kind: String,
    },
}

/// Registry of collector factories keyed by normalized name.
pub struct CollectorRegistry {
    factories: HashMap<String, CollectorFactory>,
}

impl CollectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in adapter.
    pub fn with_default_adapters() -> Self {
        let mut registry = Self::new();
        crate::adapters::register_all(&mut registry);
        registry
    }

    /// Register a factory under a name.
    ///
    /// The name is either `<source_kind>` for a catch-all collector or
    /// `<source_kind>_<metric_kind>` for a metric-specific one; case and
    /// separators are ignored.
    pub fn register(
        &mut self,
        name: &str,
        factory: impl Fn() -> Box<dyn SourceCollector> + Send + Sync + 'static,
    ) {
        self.factories.insert(normalize(name), Box::new(factory));
    }

    /// Construct the collector responsible for a source/metric combination.
    ///
    /// A metric-specific registration wins over the vendor's catch-all one.
    pub fn resolve(
        &self,
        source_kind: &str,
        metric_kind: &str,
    ) -> Result<Box<dyn SourceCollector>, RegistryError> {
        let specific = normalize(&format!("{source_kind}{metric_kind}"));
        if let Some(factory) = self.factories.get(&specific) {
            return Ok(factory());
        }
        if let Some(factory) = self.factories.get(&normalize(source_kind)) {
            return Ok(factory());
        }
        Err(RegistryError::NotFound {
            source_kind: source_kind.to_string(),
            metric_kind: metric_kind.to_string(),
        })
    }

    /// Number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no factories are registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("factories", &self.factories.len())
            .finish_non_exhaustive()
    }
}

/// Lowercase and strip separators, so `Jenkins` + `unused_jobs` matches a
/// registration named `jenkins_unused_jobs`.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
