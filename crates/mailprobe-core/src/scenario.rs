//! Scenarios: ordered, labelled probes and the runner that executes them.
//!
//! The runner awaits each probe before issuing the next one, so outcomes are
//! reported in declaration order and later steps may rely on the side
//! effects of earlier ones. A failing step never stops the run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use futures::{Stream, StreamExt};
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::base_url::join;
use crate::email::{SEND_CANDIDATE_SESSION_PATH, TEST_PATH};
use crate::error::ScenarioError;
use crate::probe::{FailureKind, ProbeBody, ProbeRequest, ProbeResult, Prober};
use crate::report::ScenarioReport;
use crate::routes::HttpMethod;

/// Which HTTP statuses count as a pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "StatusRepr", into = "StatusRepr")]
pub enum ExpectedStatus {
    /// Any HTTP response; only transport failures fail.
    Any,
    /// 200..=299.
    #[default]
    Success,
    /// One of the listed codes.
    Codes(Vec<u16>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StatusRepr {
    Code(u16),
    Codes(Vec<u16>),
    Keyword(String),
}

impl TryFrom<StatusRepr> for ExpectedStatus {
    type Error = String;

    fn try_from(repr: StatusRepr) -> Result<Self, Self::Error> {
        match repr {
            StatusRepr::Code(code) => Ok(Self::Codes(vec![code])),
            StatusRepr::Codes(codes) => Ok(Self::Codes(codes)),
            StatusRepr::Keyword(word) => match word.to_ascii_lowercase().as_str() {
                "any" => Ok(Self::Any),
                "success" | "2xx" => Ok(Self::Success),
                other => Err(format!(
                    "unknown status expectation {other:?} (use any, success, 2xx or status codes)"
                )),
            },
        }
    }
}

impl From<ExpectedStatus> for StatusRepr {
    fn from(status: ExpectedStatus) -> Self {
        match status {
            ExpectedStatus::Any => Self::Keyword("any".to_string()),
            ExpectedStatus::Success => Self::Keyword("success".to_string()),
            ExpectedStatus::Codes(codes) => Self::Codes(codes),
        }
    }
}

impl ExpectedStatus {
    pub fn matches(&self, status: u16) -> bool {
        match self {
            Self::Any => true,
            Self::Success => (200..300).contains(&status),
            Self::Codes(codes) => codes.contains(&status),
        }
    }
}

impl fmt::Display for ExpectedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Success => f.write_str("2xx"),
            Self::Codes(codes) => {
                let codes: Vec<String> = codes.iter().map(u16::to_string).collect();
                f.write_str(&codes.join("|"))
            }
        }
    }
}

/// Pass criteria for one step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    #[serde(default)]
    pub status: ExpectedStatus,

    /// Require the response body to parse as JSON.
    #[serde(default)]
    pub json: bool,
}

/// One labelled probe in a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioStep {
    pub label: String,

    #[serde(default = "default_method")]
    pub method: HttpMethod,

    /// Path joined onto the runner's base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Absolute URL, bypassing the base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ProbeBody>,

    #[serde(default)]
    pub expect: Expectation,
}

fn default_method() -> HttpMethod {
    HttpMethod::Get
}

impl ScenarioStep {
    pub fn new(label: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            method,
            path: Some(path.into()),
            url: None,
            headers: BTreeMap::new(),
            body: None,
            expect: Expectation::default(),
        }
    }

    /// A step aimed at an absolute URL instead of the base URL.
    pub fn absolute(label: impl Into<String>, method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            path: None,
            url: Some(url.into()),
            ..Self::new(label, method, "")
        }
    }

    pub fn expect_status(mut self, status: ExpectedStatus) -> Self {
        self.expect.status = status;
        self
    }

    pub fn expect_json(mut self) -> Self {
        self.expect.json = true;
        self
    }

    pub fn with_body(mut self, body: ProbeBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// URL this step targets when run against `base_url`.
    pub fn target(&self, base_url: &str) -> String {
        match (&self.url, &self.path) {
            (Some(url), _) => url.clone(),
            (None, Some(path)) => join(base_url, path),
            (None, None) => base_url.to_string(),
        }
    }

    pub fn to_request(&self, base_url: &str) -> ProbeRequest {
        ProbeRequest {
            method: self.method,
            url: self.target(base_url),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    fn validate(&self, index: usize) -> Result<(), ScenarioError> {
        if self.label.trim().is_empty() {
            return Err(ScenarioError::invalid(format!("step {index} has an empty label")));
        }
        match (&self.path, &self.url) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(ScenarioError::invalid(format!(
                    "step {index} ({}) must set exactly one of path or url",
                    self.label
                )));
            }
            (Some(path), None) if !path.starts_with('/') => {
                return Err(ScenarioError::invalid(format!(
                    "step {index} ({}) path must start with '/': {path:?}",
                    self.label
                )));
            }
            (None, Some(url)) => {
                if let Err(reason) = check_http_url(url) {
                    return Err(ScenarioError::invalid(format!(
                        "step {index} ({}) url {url:?} {reason}",
                        self.label
                    )));
                }
            }
            _ => {}
        }
        for (name, value) in &self.headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(ScenarioError::invalid(format!(
                    "step {index} ({}) has invalid header name {name:?}",
                    self.label
                )));
            }
            if HeaderValue::from_str(value).is_err() {
                return Err(ScenarioError::invalid(format!(
                    "step {index} ({}) header {name} has an invalid value",
                    self.label
                )));
            }
        }
        if let ExpectedStatus::Codes(codes) = &self.expect.status {
            if codes.is_empty() {
                return Err(ScenarioError::invalid(format!(
                    "step {index} ({}) expects an empty status list",
                    self.label
                )));
            }
            if let Some(code) = codes.iter().find(|c| !(100..=599).contains(*c)) {
                return Err(ScenarioError::invalid(format!(
                    "step {index} ({}) expects invalid status {code}",
                    self.label
                )));
            }
        }
        Ok(())
    }
}

/// Accept only absolute http(s) URLs.
fn check_http_url(raw: &str) -> Result<(), String> {
    let parsed = ::url::Url::parse(raw).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme {other}")),
    }
}

/// A named, ordered list of probes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, steps: Vec<ScenarioStep>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps,
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.name.trim().is_empty() {
            return Err(ScenarioError::invalid("scenario name is empty"));
        }
        if self.steps.is_empty() {
            return Err(ScenarioError::invalid(format!(
                "scenario {} has no steps",
                self.name
            )));
        }
        for (i, step) in self.steps.iter().enumerate() {
            step.validate(i + 1)?;
        }
        Ok(())
    }

    /// Smoke test of the email API mounted under `prefix`.
    ///
    /// Liveness first, then the method guard on the send route, then a real
    /// send. The send step accepts any HTTP status: a reachable service is
    /// the pass condition, and the body must be JSON.
    pub fn email_smoke(prefix: &str) -> Self {
        let prefix = crate::base_url::normalize(prefix);
        let test_path = format!("{prefix}{TEST_PATH}");
        let send_path = format!("{prefix}{SEND_CANDIDATE_SESSION_PATH}");

        Self {
            name: "email-smoke".to_string(),
            description: Some("liveness, method guard and send for the email API".to_string()),
            steps: vec![
                ScenarioStep::new("email routes are live", HttpMethod::Get, test_path)
                    .expect_status(ExpectedStatus::Codes(vec![200]))
                    .expect_json(),
                ScenarioStep::new(
                    "send-candidate-session rejects GET",
                    HttpMethod::Get,
                    send_path.clone(),
                )
                .expect_status(ExpectedStatus::Codes(vec![405])),
                ScenarioStep::new("send candidate session email", HttpMethod::Post, send_path)
                    .with_body(ProbeBody::Json(json!({ "candidateId": "navas" })))
                    .expect_status(ExpectedStatus::Any)
                    .expect_json(),
            ],
        }
    }
}

/// Classification of one step outcome against its expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    UnexpectedStatus { status: u16, expected: String },
    MalformedBody { status: u16, reason: String },
    TransportFailure { message: String },
    Timeout { message: String },
    InvalidRequest { message: String },
}

impl Verdict {
    pub fn evaluate(expect: &Expectation, result: &ProbeResult) -> Self {
        match result {
            ProbeResult::Failed {
                kind: FailureKind::Transport,
                message,
                ..
            } => Self::TransportFailure {
                message: message.clone(),
            },
            ProbeResult::Failed {
                kind: FailureKind::Timeout,
                message,
                ..
            } => Self::Timeout {
                message: message.clone(),
            },
            ProbeResult::Failed {
                kind: FailureKind::InvalidRequest,
                message,
                ..
            } => Self::InvalidRequest {
                message: message.clone(),
            },
            ProbeResult::Response { status, body, .. } => {
                if !expect.status.matches(*status) {
                    return Self::UnexpectedStatus {
                        status: *status,
                        expected: expect.status.to_string(),
                    };
                }
                if expect.json {
                    if let Err(e) = serde_json::from_str::<serde_json::Value>(body) {
                        return Self::MalformedBody {
                            status: *status,
                            reason: format!("expected JSON body: {e}"),
                        };
                    }
                }
                Self::Passed
            }
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    /// 1-based position in the scenario.
    pub index: usize,
    pub label: String,
    pub method: HttpMethod,
    pub url: String,
    pub result: ProbeResult,
    pub verdict: Verdict,
}

/// Runs scenarios against a base URL, one probe at a time.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    prober: Prober,
    base_url: String,
}

impl ScenarioRunner {
    /// `base_url` must be an absolute http(s) URL.
    pub fn new(prober: Prober, base_url: impl Into<String>) -> Result<Self, ScenarioError> {
        let base_url = base_url.into();
        if let Err(reason) = check_http_url(&base_url) {
            return Err(ScenarioError::InvalidBaseUrl {
                url: base_url,
                reason,
            });
        }
        Ok(Self { prober, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lazily run `scenario`; each step starts only when the previous
    /// outcome has been pulled.
    pub fn steps<'a>(&'a self, scenario: &'a Scenario) -> impl Stream<Item = StepOutcome> + 'a {
        futures::stream::iter(scenario.steps.iter().enumerate())
            .then(move |(i, step)| self.run_step(i + 1, step))
    }

    /// Run every step and collect the report.
    pub async fn run(&self, scenario: &Scenario) -> ScenarioReport {
        info!(
            scenario = %scenario.name,
            base_url = %self.base_url,
            steps = scenario.steps.len(),
            "running scenario"
        );
        let outcomes: Vec<StepOutcome> = self.steps(scenario).collect().await;
        ScenarioReport::new(&scenario.name, &self.base_url, outcomes)
    }

    async fn run_step(&self, index: usize, step: &ScenarioStep) -> StepOutcome {
        let request = step.to_request(&self.base_url);
        let result = self.prober.probe(&request).await;
        let verdict = Verdict::evaluate(&step.expect, &result);

        info!(
            step = index,
            label = %step.label,
            status = ?result.status_code(),
            passed = verdict.is_pass(),
            "step finished"
        );

        StepOutcome {
            index,
            label: step.label.clone(),
            method: request.method,
            url: request.url,
            result,
            verdict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> ProbeResult {
        ProbeResult::Response {
            status,
            body: body.to_string(),
            elapsed_ms: 1,
        }
    }

    #[test]
    fn test_expected_status_matching() {
        assert!(ExpectedStatus::Any.matches(503));
        assert!(ExpectedStatus::Success.matches(204));
        assert!(!ExpectedStatus::Success.matches(405));
        assert!(ExpectedStatus::Codes(vec![200, 405]).matches(405));
        assert_eq!(ExpectedStatus::Codes(vec![200, 404]).to_string(), "200|404");
    }

    #[test]
    fn test_verdict_unexpected_status() {
        let expect = Expectation {
            status: ExpectedStatus::Codes(vec![405]),
            json: false,
        };
        assert_eq!(
            Verdict::evaluate(&expect, &response(404, "")),
            Verdict::UnexpectedStatus {
                status: 404,
                expected: "405".to_string()
            }
        );
    }

    #[test]
    fn test_verdict_malformed_body() {
        let expect = Expectation {
            status: ExpectedStatus::Any,
            json: true,
        };
        let verdict = Verdict::evaluate(&expect, &response(500, "<html>oops</html>"));
        assert!(matches!(verdict, Verdict::MalformedBody { status: 500, .. }));
        assert!(Verdict::evaluate(&expect, &response(500, r#"{"success":false}"#)).is_pass());
    }

    #[test]
    fn test_verdict_failures_keep_kind() {
        let expect = Expectation::default();
        let timeout = ProbeResult::Failed {
            kind: FailureKind::Timeout,
            message: "timed out".to_string(),
            elapsed_ms: 10,
        };
        let refused = ProbeResult::Failed {
            kind: FailureKind::Transport,
            message: "connection refused".to_string(),
            elapsed_ms: 1,
        };
        assert!(matches!(Verdict::evaluate(&expect, &timeout), Verdict::Timeout { .. }));
        assert!(matches!(
            Verdict::evaluate(&expect, &refused),
            Verdict::TransportFailure { .. }
        ));
    }

    #[test]
    fn test_step_target_joins_normalized_base() {
        let step = ScenarioStep::new("live", HttpMethod::Get, "/api/email/test");
        assert_eq!(
            step.target("http://localhost:5000/"),
            "http://localhost:5000/api/email/test"
        );

        let abs = ScenarioStep::absolute("remote", HttpMethod::Get, "https://x.com/api/health");
        assert_eq!(abs.target("http://localhost:5000"), "https://x.com/api/health");
    }

    #[test]
    fn test_email_smoke_shape() {
        let scenario = Scenario::email_smoke("/api/email/");
        scenario.validate().unwrap();

        let paths: Vec<_> = scenario
            .steps
            .iter()
            .map(|s| (s.method, s.path.clone().unwrap()))
            .collect();
        assert_eq!(
            paths,
            vec![
                (HttpMethod::Get, "/api/email/test".to_string()),
                (HttpMethod::Get, "/api/email/send-candidate-session".to_string()),
                (HttpMethod::Post, "/api/email/send-candidate-session".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_yaml_str() {
        let yaml = r#"
name: deployed-smoke
steps:
  - label: health
    path: /api/email/test
    expect:
      status: 200
      json: true
  - label: wrong method
    method: get
    path: /api/email/send-candidate-session
    expect:
      status: [405]
  - label: send
    method: POST
    path: /api/email/send-candidate-session
    headers:
      Origin: http://localhost:3000
    body:
      json:
        candidateId: navas
    expect:
      status: any
"#;
        let scenario = Scenario::from_yaml_str(yaml).unwrap();
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.steps[0].method, HttpMethod::Get);
        assert_eq!(scenario.steps[0].expect.status, ExpectedStatus::Codes(vec![200]));
        assert_eq!(scenario.steps[2].expect.status, ExpectedStatus::Any);
        assert_eq!(
            scenario.steps[2].body,
            Some(ProbeBody::Json(json!({ "candidateId": "navas" })))
        );
    }

    #[test]
    fn test_from_yaml_rejects_path_and_url() {
        let yaml = r#"
name: broken
steps:
  - label: both
    path: /a
    url: http://x/a
"#;
        assert!(matches!(
            Scenario::from_yaml_str(yaml),
            Err(ScenarioError::Invalid { .. })
        ));
    }

    #[test]
    fn test_from_yaml_rejects_unknown_status_keyword() {
        let yaml = r#"
name: broken
steps:
  - label: bad
    path: /a
    expect:
      status: sometimes
"#;
        assert!(matches!(
            Scenario::from_yaml_str(yaml),
            Err(ScenarioError::Parse(_))
        ));
    }

    #[test]
    fn test_from_yaml_rejects_unusable_url_and_headers() {
        for step in [
            "  - label: relative\n    url: not a url\n",
            "  - label: ftp\n    url: ftp://example.com/file\n",
            "  - label: header\n    path: /a\n    headers:\n      bad header: v\n",
        ] {
            let yaml = format!("name: broken\nsteps:\n{step}");
            assert!(
                matches!(Scenario::from_yaml_str(&yaml), Err(ScenarioError::Invalid { .. })),
                "accepted {step:?}"
            );
        }
    }

    #[test]
    fn test_verdict_invalid_request_is_its_own_class() {
        let unbuildable = ProbeResult::Failed {
            kind: FailureKind::InvalidRequest,
            message: "builder error".to_string(),
            elapsed_ms: 0,
        };
        assert!(matches!(
            Verdict::evaluate(&Expectation::default(), &unbuildable),
            Verdict::InvalidRequest { .. }
        ));
    }

    #[test]
    fn test_empty_scenario_is_invalid() {
        let scenario = Scenario::new("empty", vec![]);
        assert!(scenario.validate().is_err());
    }
}
