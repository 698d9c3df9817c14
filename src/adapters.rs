//! Built-in vendor adapters.
//!
//! Each adapter implements [`SourceCollector`](crate::collector::SourceCollector)
//! for one vendor, either as a catch-all for the whole vendor or specialized
//! per metric kind. A full deployment registers one adapter per supported
//! vendor/metric combination; the set here covers the integration shapes
//! that occur in practice: plain authenticated GETs, nested listings,
//! vendor REST paths, and multi-step token logins.

mod checkmarx;
mod jenkins;
mod sonarqube;

pub use checkmarx::CheckmarxSecurityWarnings;
pub use jenkins::{JenkinsFailedJobs, JenkinsJobs, JenkinsUnusedJobs};
pub use sonarqube::SonarQubeViolations;

use std::sync::Arc;

use crate::collector::ReportCache;
use crate::params::ParameterDefinitions;
use crate::registry::CollectorRegistry;

/// Register every built-in adapter.
pub fn register_all(registry: &mut CollectorRegistry) {
    registry.register("jenkins", || Box::new(JenkinsJobs));
    registry.register("jenkins_failed_jobs", || Box::new(JenkinsFailedJobs));
    registry.register("jenkins_unused_jobs", || Box::new(JenkinsUnusedJobs));
    registry.register("sonarqube_violations", || Box::new(SonarQubeViolations));

    // All Checkmarx instances share one project-id cache; its bounds and
    // lifetime are fixed here, not inside the adapter.
    let project_ids = Arc::new(ReportCache::default());
    registry.register("checkmarx_security_warnings", move || {
        Box::new(CheckmarxSecurityWarnings::new(Arc::clone(&project_ids)))
    });
}

/// Parameter defaults and legal value sets for the built-in adapters.
pub fn default_definitions() -> ParameterDefinitions {
    ParameterDefinitions::new()
        .with_default("inactive_days", "90")
        .with_values(
            "severities",
            ["info", "minor", "major", "critical", "blocker"],
        )
}
