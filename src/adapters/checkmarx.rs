//! Checkmarx CxSAST security warnings collector.
//!
//! Checkmarx requires a token login before any data call, so this adapter
//! overrides the whole fetch sequence: token, project lookup, latest scan,
//! scan statistics. The project lookup is cached across collections; when a
//! scan is still running the adapter asks for an early re-poll instead of
//! reporting a stale value.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::collector::{CollectError, RawResponse, ReportCache, SourceCollector, SourceResponses};
use crate::params::ParameterView;

/// Fixed OAuth client used by the CxSAST REST API for password grants.
const CLIENT_ID: &str = "resource_owner_client";
const CLIENT_SECRET: &str = "014DF517-39D1-4453-B7B3-9930C563627C";

/// Security warnings found by the most recent CxSAST scan of a project.
pub struct CheckmarxSecurityWarnings {
    project_ids: Arc<ReportCache<String, u64>>,
    scan_in_progress: AtomicBool,
}

impl CheckmarxSecurityWarnings {
    /// Create a collector sharing the given project-id cache.
    pub fn new(project_ids: Arc<ReportCache<String, u64>>) -> Self {
        Self {
            project_ids,
            scan_in_progress: AtomicBool::new(false),
        }
    }

    async fn get_json(
        &self,
        client: &Client,
        url: Url,
        token: &str,
    ) -> Result<RawResponse, CollectError> {
        let response = client
            .get(url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        let url = response.url().clone();
        let body = response.text().await?;
        Ok(RawResponse { url, body })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Project {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct Scan {
    id: u64,
    status: ScanStatus,
}

#[derive(Debug, Deserialize)]
struct ScanStatus {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanStatistics {
    #[serde(default)]
    high_severity: u64,
    #[serde(default)]
    medium_severity: u64,
    #[serde(default)]
    low_severity: u64,
    #[serde(default)]
    info_severity: u64,
}

/// Whether a scan status means the scan has not finished yet.
fn scan_in_progress(status: &str) -> bool {
    !matches!(status, "Finished" | "Failed" | "Canceled")
}

#[async_trait::async_trait]
impl SourceCollector for CheckmarxSecurityWarnings {
    async fn fetch(
        &self,
        client: &Client,
        api_url: &Url,
        params: &ParameterView,
    ) -> Result<SourceResponses, CollectError> {
        let base = api_url.as_str().trim_end_matches('/').to_string();
        let project = params
            .get("project")
            .ok_or(CollectError::MissingParameter("project"))?
            .to_string();
        let username = params
            .username()
            .ok_or(CollectError::MissingParameter("username"))?;
        let password = params
            .password()
            .ok_or(CollectError::MissingParameter("password"))?;

        let mut responses = Vec::new();

        let token_url = Url::parse(&format!("{base}/cxrestapi/auth/identity/connect/token"))?;
        let token_response = client
            .post(token_url)
            .form(&[
                ("username", username),
                ("password", password),
                ("grant_type", "password"),
                ("scope", "sast_rest_api"),
                ("client_id", CLIENT_ID),
                ("client_secret", CLIENT_SECRET),
            ])
            .send()
            .await?
            .error_for_status()?;
        let token_url = token_response.url().clone();
        let token_body = token_response.text().await?;
        let token: TokenResponse = serde_json::from_str(&token_body)?;
        responses.push(RawResponse {
            url: token_url,
            // The raw token is a credential; it must not end up in the
            // response sequence the parse hooks see.
            body: "{}".to_string(),
        });

        let project_id = match self.project_ids.get(&project) {
            Some(project_id) => project_id,
            None => {
                let encoded: String =
                    url::form_urlencoded::byte_serialize(project.as_bytes()).collect();
                let projects_url =
                    Url::parse(&format!("{base}/cxrestapi/projects?projectName={encoded}"))?;
                let response = self
                    .get_json(client, projects_url, &token.access_token)
                    .await?;
                let projects: Vec<Project> = response.json()?;
                responses.push(response);
                let project_id = projects
                    .first()
                    .ok_or_else(|| {
                        CollectError::UnexpectedResponse(format!("project '{project}' not found"))
                    })?
                    .id;
                self.project_ids.insert(project.clone(), project_id);
                project_id
            }
        };

        let scans_url = Url::parse(&format!(
            "{base}/cxrestapi/sast/scans?projectId={project_id}&last=1"
        ))?;
        let response = self.get_json(client, scans_url, &token.access_token).await?;
        let scans: Vec<Scan> = response.json()?;
        responses.push(response);
        let scan = scans.first().ok_or_else(|| {
            CollectError::UnexpectedResponse(format!("project '{project}' has no scans"))
        })?;

        if scan_in_progress(&scan.status.name) {
            self.scan_in_progress.store(true, Ordering::Relaxed);
            return Ok(SourceResponses::new(api_url.clone(), responses));
        }

        let statistics_url = Url::parse(&format!(
            "{base}/cxrestapi/sast/scans/{}/resultsStatistics",
            scan.id
        ))?;
        let response = self
            .get_json(client, statistics_url, &token.access_token)
            .await?;
        responses.push(response);

        Ok(SourceResponses::new(api_url.clone(), responses))
    }

    fn parse_value(
        &self,
        responses: &SourceResponses,
        _params: &ParameterView,
    ) -> Result<Option<String>, CollectError> {
        if self.scan_in_progress.load(Ordering::Relaxed) {
            return Ok(None);
        }
        let statistics: ScanStatistics = responses.last()?.json()?;
        let warnings = statistics.high_severity
            + statistics.medium_severity
            + statistics.low_severity
            + statistics.info_severity;
        Ok(Some(warnings.to_string()))
    }

    /// Ask for an immediate re-poll while the scan is still running.
    fn next_collection(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if self.scan_in_progress.load(Ordering::Relaxed) {
            now
        } else {
            now + chrono::Duration::minutes(15)
        }
    }
}
