//! Core collector trait and types.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::model::Entity;
use crate::params::ParameterView;

/// Errors that can occur inside a collector hook.
///
/// The fetch/parse pipeline converts every variant into an error string on
/// the source measurement; no variant ever crosses the pipeline boundary.
#[derive(Debug, Error)]
pub enum CollectError {
    /// HTTP request failed (DNS, TLS, timeout, non-2xx status).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A parameter did not parse as a URL.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Response body did not parse as JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required parameter is missing and has no default.
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    /// The response payload had an unexpected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// One raw payload fetched from a source: the URL that produced it plus the
/// response body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Final URL of the request (after redirects).
    pub url: Url,
    /// Response body text.
    pub body: String,
}

impl RawResponse {
    /// Deserialize the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, CollectError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// The ordered sequence of payloads returned by one collector invocation.
///
/// A collector may issue several requests (a login call followed by data
/// calls, paginated listings); all of them are returned together. State
/// shared between those requests lives on the collector instance and does
/// not survive the invocation.
#[derive(Debug, Clone)]
pub struct SourceResponses {
    /// API address the invocation started from.
    pub api_url: Url,
    /// Fetched payloads, in request order.
    pub responses: Vec<RawResponse>,
}

impl SourceResponses {
    /// Create a response sequence for the given API address.
    pub fn new(api_url: Url, responses: Vec<RawResponse>) -> Self {
        Self { api_url, responses }
    }

    /// The first payload, or an error when the sequence is empty.
    pub fn first(&self) -> Result<&RawResponse, CollectError> {
        self.responses
            .first()
            .ok_or_else(|| CollectError::UnexpectedResponse("no response received".to_string()))
    }

    /// The last payload, or an error when the sequence is empty.
    pub fn last(&self) -> Result<&RawResponse, CollectError> {
        self.responses
            .last()
            .ok_or_else(|| CollectError::UnexpectedResponse("no response received".to_string()))
    }
}

/// The contract every vendor adapter implements.
///
/// One collector instance handles one source invocation: the engine resolves
/// a fresh instance per source per cycle, calls [`fetch`](Self::fetch) once,
/// then the parse hooks against the fetched responses. Every hook except
/// [`parse_value`](Self::parse_value) has a default, so a minimal adapter is
/// a handful of lines.
///
/// Hooks return `Result`; the pipeline converts errors into measurement data
/// and guarantees a failing source never affects its peers.
#[async_trait::async_trait]
pub trait SourceCollector: Send + Sync {
    /// The API address to query.
    ///
    /// Default: the `url` parameter with trailing slashes stripped. Adapters
    /// override to build vendor-specific REST paths.
    fn api_url(&self, params: &ParameterView) -> Result<Url, CollectError> {
        params.base_url()
    }

    /// The human-facing address attached to the measurement.
    ///
    /// Default: the user-supplied `landing_url` parameter when present, else
    /// the base URL. Errors here never fail a collection; the pipeline treats
    /// the landing URL as best-effort.
    fn landing_url(
        &self,
        _responses: &[RawResponse],
        params: &ParameterView,
    ) -> Result<Url, CollectError> {
        match params.landing_url() {
            Some(url) => Ok(url),
            None => params.base_url(),
        }
    }

    /// Fetch the raw payloads for one invocation.
    ///
    /// Default: a single GET of `api_url`, authenticated with the
    /// `private_token` parameter as basic-auth user when set, else with
    /// `username`/`password`. Non-2xx statuses are errors. The shared
    /// client's request timeout applies to every call. Adapters override for
    /// POST-based logins, token exchanges, or pagination.
    async fn fetch(
        &self,
        client: &Client,
        api_url: &Url,
        params: &ParameterView,
    ) -> Result<SourceResponses, CollectError> {
        let mut request = client.get(api_url.clone());
        if let Some(token) = params.private_token() {
            request = request.basic_auth(token, None::<&str>);
        } else if let Some(username) = params.username() {
            request = request.basic_auth(username, params.password());
        }
        let response = request.send().await?.error_for_status()?;
        let url = response.url().clone();
        let body = response.text().await?;
        Ok(SourceResponses::new(
            api_url.clone(),
            vec![RawResponse { url, body }],
        ))
    }

    /// Extract the measured value. `Ok(None)` when not applicable.
    fn parse_value(
        &self,
        responses: &SourceResponses,
        params: &ParameterView,
    ) -> Result<Option<String>, CollectError>;

    /// Extract the denominator for percentage-scale metrics.
    ///
    /// Default: the constant "100", for sources that already return a ratio.
    fn parse_total(
        &self,
        _responses: &SourceResponses,
        _params: &ParameterView,
    ) -> Result<Option<String>, CollectError> {
        Ok(Some("100".to_string()))
    }

    /// Extract the supporting records. Default: none.
    fn parse_entities(
        &self,
        _responses: &SourceResponses,
        _params: &ParameterView,
    ) -> Result<Vec<Entity>, CollectError> {
        Ok(Vec::new())
    }

    /// When this source wants to be collected again.
    ///
    /// Default: 15 minutes from now. An adapter returns `now` when the remote
    /// report is still being generated, asking for an early re-poll without
    /// blocking other sources. The scheduler treats this as a hint.
    fn next_collection(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::minutes(15)
    }
}

impl std::fmt::Debug for dyn SourceCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SourceCollector")
    }
}
