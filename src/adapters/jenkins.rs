//! Jenkins job collectors.
//!
//! Jenkins lists jobs as a tree: folders contain jobs which may contain more
//! jobs. All three collectors fetch the tree in one request and flatten it
//! iteratively; they differ only in which jobs count towards the value.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use url::Url;

use crate::collector::{flatten_tree, CollectError, SourceCollector, SourceResponses};
use crate::model::Entity;
use crate::params::ParameterView;

/// Nesting depth requested from the Jenkins API.
const JOB_TREE_DEPTH: usize = 5;

/// Build the `tree` query expression for nested job listings.
fn job_tree_query() -> String {
    let fields = "name,url,buildable,lastBuild[timestamp,result]";
    let mut tree = fields.to_string();
    for _ in 0..JOB_TREE_DEPTH {
        tree = format!("{fields},jobs[{tree}]");
    }
    format!("jobs[{tree}]")
}

fn jenkins_api_url(params: &ParameterView) -> Result<Url, CollectError> {
    let base = params.base_url()?;
    Ok(Url::parse(&format!(
        "{}/api/json?tree={}",
        base.as_str().trim_end_matches('/'),
        job_tree_query()
    ))?)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JenkinsJob {
    name: String,
    url: String,
    #[serde(default)]
    buildable: bool,
    #[serde(default)]
    last_build: Option<JenkinsBuild>,
    #[serde(default)]
    jobs: Vec<JenkinsJob>,
}

#[derive(Debug, Clone, Deserialize)]
struct JenkinsBuild {
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    result: Option<String>,
}

impl JenkinsJob {
    fn build_status(&self) -> &str {
        self.last_build
            .as_ref()
            .and_then(|build| build.result.as_deref())
            .unwrap_or("Not built")
    }

    fn build_date(&self) -> Option<DateTime<Utc>> {
        let timestamp = self.last_build.as_ref()?.timestamp?;
        Utc.timestamp_millis_opt(timestamp).single()
    }
}

/// Flatten the job tree into `(path, job)` pairs, folders excluded.
fn buildable_jobs(responses: &SourceResponses) -> Result<Vec<(String, JenkinsJob)>, CollectError> {
    #[derive(Deserialize)]
    struct JobListing {
        #[serde(default)]
        jobs: Vec<JenkinsJob>,
    }

    let listing: JobListing = responses.first()?.json()?;
    let roots: Vec<(String, JenkinsJob)> = listing
        .jobs
        .into_iter()
        .map(|job| (job.name.clone(), job))
        .collect();
    Ok(flatten_tree(roots, |job| {
        job.jobs
            .iter()
            .map(|child| (child.name.clone(), child.clone()))
            .collect()
    })
    .into_iter()
    .filter(|(_, job)| job.buildable)
    .collect())
}

fn job_entity(path: &str, job: &JenkinsJob) -> Entity {
    let mut entity = Entity::new(path)
        .with_attribute("name", path)
        .with_attribute("url", &job.url)
        .with_attribute("build_status", job.build_status());
    if let Some(date) = job.build_date() {
        entity = entity.with_attribute("build_date", date.format("%Y-%m-%d").to_string());
    }
    entity
}

/// Catch-all Jenkins collector: counts all buildable jobs.
pub struct JenkinsJobs;

impl SourceCollector for JenkinsJobs {
    fn api_url(&self, params: &ParameterView) -> Result<Url, CollectError> {
        jenkins_api_url(params)
    }

    fn parse_value(
        &self,
        responses: &SourceResponses,
        _params: &ParameterView,
    ) -> Result<Option<String>, CollectError> {
        Ok(Some(buildable_jobs(responses)?.len().to_string()))
    }

    fn parse_entities(
        &self,
        responses: &SourceResponses,
        _params: &ParameterView,
    ) -> Result<Vec<Entity>, CollectError> {
        Ok(buildable_jobs(responses)?
            .iter()
            .map(|(path, job)| job_entity(path, job))
            .collect())
    }
}

/// Jobs whose last build did not succeed.
pub struct JenkinsFailedJobs;

fn failed(job: &JenkinsJob) -> bool {
    job.last_build
        .as_ref()
        .and_then(|build| build.result.as_deref())
        .is_some_and(|result| result != "SUCCESS")
}

impl SourceCollector for JenkinsFailedJobs {
    fn api_url(&self, params: &ParameterView) -> Result<Url, CollectError> {
        jenkins_api_url(params)
    }

    fn parse_value(
        &self,
        responses: &SourceResponses,
        _params: &ParameterView,
    ) -> Result<Option<String>, CollectError> {
        let count = buildable_jobs(responses)?
            .iter()
            .filter(|(_, job)| failed(job))
            .count();
        Ok(Some(count.to_string()))
    }

    fn parse_total(
        &self,
        responses: &SourceResponses,
        _params: &ParameterView,
    ) -> Result<Option<String>, CollectError> {
        Ok(Some(buildable_jobs(responses)?.len().to_string()))
    }

    fn parse_entities(
        &self,
        responses: &SourceResponses,
        _params: &ParameterView,
    ) -> Result<Vec<Entity>, CollectError> {
        Ok(buildable_jobs(responses)?
            .iter()
            .filter(|(_, job)| failed(job))
            .map(|(path, job)| job_entity(path, job))
            .collect())
    }
}

/// Jobs that have not been built for a configurable number of days.
pub struct JenkinsUnusedJobs;

fn unused(job: &JenkinsJob, cutoff: DateTime<Utc>) -> bool {
    job.build_date().is_some_and(|date| date < cutoff)
}

impl SourceCollector for JenkinsUnusedJobs {
    fn api_url(&self, params: &ParameterView) -> Result<Url, CollectError> {
        jenkins_api_url(params)
    }

    fn parse_value(
        &self,
        responses: &SourceResponses,
        params: &ParameterView,
    ) -> Result<Option<String>, CollectError> {
        let cutoff = inactive_cutoff(params)?;
        let count = buildable_jobs(responses)?
            .iter()
            .filter(|(_, job)| unused(job, cutoff))
            .count();
        Ok(Some(count.to_string()))
    }

    fn parse_total(
        &self,
        responses: &SourceResponses,
        _params: &ParameterView,
    ) -> Result<Option<String>, CollectError> {
        Ok(Some(buildable_jobs(responses)?.len().to_string()))
    }

    fn parse_entities(
        &self,
        responses: &SourceResponses,
        params: &ParameterView,
    ) -> Result<Vec<Entity>, CollectError> {
        let cutoff = inactive_cutoff(params)?;
        Ok(buildable_jobs(responses)?
            .iter()
            .filter(|(_, job)| unused(job, cutoff))
            .map(|(path, job)| job_entity(path, job))
            .collect())
    }
}

fn inactive_cutoff(params: &ParameterView) -> Result<DateTime<Utc>, CollectError> {
    let days = params
        .get("inactive_days")
        .ok_or(CollectError::MissingParameter("inactive_days"))?;
    let days: i64 = days.parse().map_err(|_| {
        CollectError::UnexpectedResponse(format!("inactive_days is not a number: '{days}'"))
    })?;
    Ok(Utc::now() - Duration::days(days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::default_definitions;
    use crate::collector::RawResponse;
    use crate::model::ParameterValue;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn params(pairs: &[(&str, &str)]) -> ParameterView {
        let parameters: BTreeMap<String, ParameterValue> = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), ParameterValue::from(*value)))
            .collect();
        ParameterView::new(parameters, Arc::new(default_definitions()))
    }

    fn responses(body: &str) -> SourceResponses {
        let url = Url::parse("https://ci.example.org/api/json").unwrap();
        SourceResponses::new(
            url.clone(),
            vec![RawResponse {
                url,
                body: body.to_string(),
            }],
        )
    }

    const LISTING: &str = r#"{
        "jobs": [
            {"name": "app", "url": "https://ci.example.org/job/app/", "buildable": true,
             "lastBuild": {"timestamp": 946684800000, "result": "FAILURE"}},
            {"name": "folder", "url": "https://ci.example.org/job/folder/", "jobs": [
                {"name": "lib", "url": "https://ci.example.org/job/folder/job/lib/",
                 "buildable": true, "lastBuild": {"timestamp": 946684800000, "result": "SUCCESS"}}
            ]}
        ]
    }"#;

    #[test]
    fn test_api_url_includes_tree_query() {
        let url = JenkinsJobs
            .api_url(&params(&[("url", "https://ci.example.org/")]))
            .unwrap();
        assert!(url.as_str().starts_with("https://ci.example.org/api/json?tree=jobs["));
    }

    #[test]
    fn test_job_count_skips_folders() {
        let value = JenkinsJobs
            .parse_value(&responses(LISTING), &params(&[]))
            .unwrap();
        assert_eq!(value, Some("2".to_string()));
    }

    #[test]
    fn test_entities_use_composed_paths() {
        let entities = JenkinsJobs
            .parse_entities(&responses(LISTING), &params(&[]))
            .unwrap();
        let keys: Vec<&str> = entities.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["app", "folder/lib"]);
        assert_eq!(entities[0].attributes["build_status"], "FAILURE");
        assert_eq!(entities[0].attributes["build_date"], "2000-01-01");
    }

    #[test]
    fn test_failed_jobs() {
        let value = JenkinsFailedJobs
            .parse_value(&responses(LISTING), &params(&[]))
            .unwrap();
        assert_eq!(value, Some("1".to_string()));

        let total = JenkinsFailedJobs
            .parse_total(&responses(LISTING), &params(&[]))
            .unwrap();
        assert_eq!(total, Some("2".to_string()));

        let entities = JenkinsFailedJobs
            .parse_entities(&responses(LISTING), &params(&[]))
            .unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].key, "app");
    }

    #[test]
    fn test_unused_jobs_with_default_window() {
        // Both jobs were last built in 2000, far beyond the 90-day default.
        let value = JenkinsUnusedJobs
            .parse_value(&responses(LISTING), &params(&[]))
            .unwrap();
        assert_eq!(value, Some("2".to_string()));
    }

    #[test]
    fn test_unused_jobs_rejects_bad_parameter() {
        let result = JenkinsUnusedJobs.parse_value(
            &responses(LISTING),
            &params(&[("inactive_days", "soon")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_jobs_without_builds_are_not_unused() {
        let body = r#"{"jobs": [{"name": "new", "url": "u", "buildable": true}]}"#;
        let value = JenkinsUnusedJobs
            .parse_value(&responses(body), &params(&[]))
            .unwrap();
        assert_eq!(value, Some("0".to_string()));
    }
}
