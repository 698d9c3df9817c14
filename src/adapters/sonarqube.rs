//! SonarQube violations collector.

use serde::Deserialize;
use url::Url;

use crate::collector::{CollectError, RawResponse, SourceCollector, SourceResponses};
use crate::model::Entity;
use crate::params::ParameterView;

/// Page size requested from the issue search API.
const PAGE_SIZE: usize = 500;

/// Open issues reported by SonarQube for one component.
pub struct SonarQubeViolations;

fn component(params: &ParameterView) -> Result<String, CollectError> {
    params
        .get_url_encoded("component")
        .ok_or(CollectError::MissingParameter("component"))
}

fn severities(params: &ParameterView) -> String {
    params
        .get_all("severities")
        .iter()
        .map(|severity| severity.to_uppercase())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Deserialize)]
struct IssueSearchResponse {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    paging: Option<Paging>,
    #[serde(default)]
    issues: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    total: u64,
}

#[derive(Debug, Deserialize)]
struct Issue {
    key: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    component: String,
    #[serde(default)]
    rule: String,
}

impl IssueSearchResponse {
    fn total(&self) -> Result<u64, CollectError> {
        self.total
            .or_else(|| self.paging.as_ref().map(|paging| paging.total))
            .ok_or_else(|| {
                CollectError::UnexpectedResponse("issue search response has no total".to_string())
            })
    }
}

fn issue_search(responses: &SourceResponses) -> Result<IssueSearchResponse, CollectError> {
    responses.first()?.json()
}

impl SourceCollector for SonarQubeViolations {
    fn api_url(&self, params: &ParameterView) -> Result<Url, CollectError> {
        let base = params.base_url()?;
        let component = component(params)?;
        let severities = severities(params);
        Ok(Url::parse(&format!(
            "{}/api/issues/search?componentKeys={component}&resolved=false&severities={severities}&ps={PAGE_SIZE}",
            base.as_str().trim_end_matches('/'),
        ))?)
    }

    fn landing_url(
        &self,
        _responses: &[RawResponse],
        params: &ParameterView,
    ) -> Result<Url, CollectError> {
        if let Some(url) = params.landing_url() {
            return Ok(url);
        }
        let base = params.base_url()?;
        let component = component(params)?;
        Ok(Url::parse(&format!(
            "{}/project/issues?id={component}&resolved=false",
            base.as_str().trim_end_matches('/'),
        ))?)
    }

    fn parse_value(
        &self,
        responses: &SourceResponses,
        _params: &ParameterView,
    ) -> Result<Option<String>, CollectError> {
        Ok(Some(issue_search(responses)?.total()?.to_string()))
    }

    fn parse_entities(
        &self,
        responses: &SourceResponses,
        _params: &ParameterView,
    ) -> Result<Vec<Entity>, CollectError> {
        Ok(issue_search(responses)?
            .issues
            .into_iter()
            .map(|issue| {
                Entity::new(issue.key)
                    .with_attribute("message", issue.message)
                    .with_attribute("severity", issue.severity.to_lowercase())
                    .with_attribute("component", issue.component)
                    .with_attribute("rule", issue.rule)
            })
            .collect())
    }
}
