//! Endpoint probe: one outbound HTTP request, outcome captured as data.
//!
//! A non-2xx status is a normal [`ProbeResult::Response`]. Connection,
//! DNS and body-read failures become [`ProbeResult::Failed`] with
//! [`FailureKind::Transport`]; exceeding the ceiling is
//! [`FailureKind::Timeout`]. A request reqwest cannot even build (bad URL,
//! bad header) is [`FailureKind::InvalidRequest`]. No retries.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ProbeConfig;
use crate::routes::HttpMethod;
use crate::PROBE_USER_AGENT;

/// Request payload.
///
/// In scenario files this is a map with exactly one of `json` or `text`:
///
/// ```yaml
/// body:
///   json:
///     candidateId: navas
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BodyRepr", into = "BodyRepr")]
pub enum ProbeBody {
    /// Serialized as JSON with `Content-Type: application/json`.
    Json(serde_json::Value),
    /// Sent verbatim.
    Text(String),
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BodyRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    json: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl TryFrom<BodyRepr> for ProbeBody {
    type Error = String;

    fn try_from(repr: BodyRepr) -> Result<Self, Self::Error> {
        match (repr.json, repr.text) {
            (Some(value), None) => Ok(Self::Json(value)),
            (None, Some(text)) => Ok(Self::Text(text)),
            (Some(_), Some(_)) => Err("body must set only one of json or text".to_string()),
            (None, None) => Err("body must set one of json or text".to_string()),
        }
    }
}

impl From<ProbeBody> for BodyRepr {
    fn from(body: ProbeBody) -> Self {
        match body {
            ProbeBody::Json(value) => Self {
                json: Some(value),
                text: None,
            },
            ProbeBody::Text(text) => Self {
                json: None,
                text: Some(text),
            },
        }
    }
}

/// A single request to issue.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<ProbeBody>,
}

impl ProbeRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Post, url).with_body(ProbeBody::Json(body))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: ProbeBody) -> Self {
        self.body = Some(body);
        self
    }
}

/// Why a probe produced no HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// DNS failure, refused or reset connection, unreadable body.
    Transport,
    /// The request exceeded the probe ceiling.
    Timeout,
    /// The request could not be built; nothing was sent.
    InvalidRequest,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => f.write_str("transport failure"),
            Self::Timeout => f.write_str("timeout"),
            Self::InvalidRequest => f.write_str("invalid request"),
        }
    }
}

/// Outcome of one probe. Either a response or a failure, never neither.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeResult {
    Response {
        status: u16,
        body: String,
        elapsed_ms: u64,
    },
    Failed {
        kind: FailureKind,
        message: String,
        elapsed_ms: u64,
    },
}

impl ProbeResult {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            Self::Failed { .. } => None,
        }
    }

    pub fn body_text(&self) -> Option<&str> {
        match self {
            Self::Response { body, .. } => Some(body),
            Self::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Response { .. } => None,
            Self::Failed { message, .. } => Some(message),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Response { .. } => None,
            Self::Failed { kind, .. } => Some(*kind),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        match self {
            Self::Response { elapsed_ms, .. } | Self::Failed { elapsed_ms, .. } => *elapsed_ms,
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Issues probes with a shared client and a fixed timeout ceiling.
#[derive(Debug, Clone)]
pub struct Prober {
    client: reqwest::Client,
    config: ProbeConfig,
}

impl Prober {
    pub fn new(config: ProbeConfig) -> Result<Self, reqwest::Error> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(PROBE_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Issue exactly one request. Never fails; see [`ProbeResult`].
    pub async fn probe(&self, request: &ProbeRequest) -> ProbeResult {
        let started = Instant::now();
        debug!(method = %request.method, url = %request.url, "probing");

        let mut builder = self
            .client
            .request(request.method.into(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            Some(ProbeBody::Json(value)) => builder.json(value),
            Some(ProbeBody::Text(text)) => builder.body(text.clone()),
            None => builder,
        };

        let result = match builder.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.text().await {
                    Ok(body) => ProbeResult::Response {
                        status,
                        body,
                        elapsed_ms: elapsed_ms(started),
                    },
                    Err(e) => ProbeResult::Failed {
                        kind: classify(&e),
                        message: format!(
                            "HTTP {status} but failed to read response body: {}",
                            error_chain(&e)
                        ),
                        elapsed_ms: elapsed_ms(started),
                    },
                }
            }
            Err(e) => ProbeResult::Failed {
                kind: classify(&e),
                message: error_chain(&e),
                elapsed_ms: elapsed_ms(started),
            },
        };

        match &result {
            ProbeResult::Response { status, .. } => {
                debug!(url = %request.url, status = status, elapsed_ms = result.elapsed_ms(), "probe answered");
            }
            ProbeResult::Failed { kind, message, .. } => {
                warn!(url = %request.url, kind = %kind, error = %message, "probe failed");
            }
        }
        result
    }
}

fn classify(err: &reqwest::Error) -> FailureKind {
    if err.is_builder() {
        FailureKind::InvalidRequest
    } else if err.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Transport
    }
}

/// reqwest's top-level message hides the cause ("error sending request"),
/// so walk the source chain.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_accessors_response() {
        let result = ProbeResult::Response {
            status: 405,
            body: String::new(),
            elapsed_ms: 3,
        };
        assert_eq!(result.status_code(), Some(405));
        assert_eq!(result.body_text(), Some(""));
        assert!(result.error_message().is_none());
        assert!(result.failure_kind().is_none());
    }

    #[test]
    fn test_result_accessors_failed() {
        let result = ProbeResult::Failed {
            kind: FailureKind::Timeout,
            message: "operation timed out".to_string(),
            elapsed_ms: 10_000,
        };
        assert!(result.status_code().is_none());
        assert!(result.body_text().is_none());
        assert_eq!(result.error_message(), Some("operation timed out"));
        assert_eq!(result.failure_kind(), Some(FailureKind::Timeout));
    }

    #[test]
    fn test_result_serializes_with_outcome_tag() {
        let result = ProbeResult::Failed {
            kind: FailureKind::Transport,
            message: "connection refused".to_string(),
            elapsed_ms: 1,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["outcome"], "failed");
        assert_eq!(value["kind"], "transport");
    }

    #[test]
    fn test_body_json_map_form() {
        let body: ProbeBody = serde_yaml::from_str("json:\n  candidateId: navas\n").unwrap();
        assert_eq!(body, ProbeBody::Json(serde_json::json!({ "candidateId": "navas" })));

        let body: ProbeBody = serde_yaml::from_str("text: hello").unwrap();
        assert_eq!(body, ProbeBody::Text("hello".to_string()));

        let value = serde_json::to_value(ProbeBody::Text("hi".to_string())).unwrap();
        assert_eq!(value, serde_json::json!({ "text": "hi" }));
    }

    #[test]
    fn test_body_needs_exactly_one_form() {
        assert!(serde_yaml::from_str::<ProbeBody>("{}").is_err());
        assert!(serde_yaml::from_str::<ProbeBody>("json: 1\ntext: x\n").is_err());
        assert!(serde_yaml::from_str::<ProbeBody>("form: x").is_err());
    }

    #[tokio::test]
    async fn test_unbuildable_request_is_not_transport() {
        let prober = Prober::new(ProbeConfig::default()).unwrap();

        let relative = prober.probe(&ProbeRequest::get("not a url")).await;
        assert_eq!(relative.failure_kind(), Some(FailureKind::InvalidRequest));

        let bad_header = prober
            .probe(&ProbeRequest::get("http://127.0.0.1:9/").with_header("bad header", "v"))
            .await;
        assert_eq!(bad_header.failure_kind(), Some(FailureKind::InvalidRequest));
    }

    #[test]
    fn test_request_builders() {
        let req = ProbeRequest::post_json("http://x/api", serde_json::json!({"candidateId": "navas"}))
            .with_header("Origin", "http://localhost:3000");
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.headers.get("Origin").map(String::as_str), Some("http://localhost:3000"));
        assert!(matches!(req.body, Some(ProbeBody::Json(_))));
    }
}
