//! Scenario reports and their text/JSON renderings.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::probe::ProbeResult;
use crate::scenario::{StepOutcome, Verdict};

const BODY_PREVIEW_CHARS: usize = 200;

/// Every outcome of one scenario run, in declaration order.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub base_url: String,
    pub generated_at: DateTime<Utc>,
    pub outcomes: Vec<StepOutcome>,
}

/// Outcome counts. HTTP-level and transport-level failures are kept apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub unexpected_status: usize,
    pub malformed_body: usize,
    pub transport_failures: usize,
    pub timeouts: usize,
    /// Steps whose request could not be built, so nothing was sent.
    pub invalid_requests: usize,
}

impl Summary {
    /// Steps that got an HTTP response but did not meet expectations.
    pub fn http_failures(&self) -> usize {
        self.unexpected_status + self.malformed_body
    }

    /// Steps that never got an HTTP response.
    pub fn unreachable(&self) -> usize {
        self.transport_failures + self.timeouts
    }
}

impl ScenarioReport {
    pub fn new(scenario: &str, base_url: &str, outcomes: Vec<StepOutcome>) -> Self {
        Self {
            scenario: scenario.to_string(),
            base_url: base_url.to_string(),
            generated_at: Utc::now(),
            outcomes,
        }
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.outcomes.len(),
            ..Summary::default()
        };
        for outcome in &self.outcomes {
            match outcome.verdict {
                Verdict::Passed => summary.passed += 1,
                Verdict::UnexpectedStatus { .. } => summary.unexpected_status += 1,
                Verdict::MalformedBody { .. } => summary.malformed_body += 1,
                Verdict::TransportFailure { .. } => summary.transport_failures += 1,
                Verdict::Timeout { .. } => summary.timeouts += 1,
                Verdict::InvalidRequest { .. } => summary.invalid_requests += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.summary().passed != self.outcomes.len()
    }
}

/// Human-readable report: one block per step, then the summary.
pub fn render_text(report: &ScenarioReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Scenario: {} ({})", report.scenario, report.base_url);

    for outcome in &report.outcomes {
        let _ = writeln!(out, "[{}] {}", outcome.index, outcome.label);
        let _ = writeln!(out, "    {} {}", outcome.method, outcome.url);
        let _ = writeln!(
            out,
            "    -> {} ({} ms)",
            describe(&outcome.verdict),
            outcome.result.elapsed_ms()
        );
        if let ProbeResult::Response { body, .. } = &outcome.result {
            if !body.trim().is_empty() {
                let _ = writeln!(out, "    body: {}", preview(body));
            }
        }
    }

    let s = report.summary();
    let _ = writeln!(out);
    let _ = writeln!(out, "Summary: {} probes, {} passed", s.total, s.passed);
    let _ = writeln!(
        out,
        "  HTTP status failures: {} (unexpected status {}, malformed body {})",
        s.http_failures(),
        s.unexpected_status,
        s.malformed_body
    );
    let _ = writeln!(
        out,
        "  transport failures:   {} (connection {}, timeout {})",
        s.unreachable(),
        s.transport_failures,
        s.timeouts
    );
    if s.invalid_requests > 0 {
        let _ = writeln!(out, "  invalid requests:     {}", s.invalid_requests);
    }
    out
}

/// Machine-readable report, summary included.
pub fn render_json(report: &ScenarioReport) -> serde_json::Value {
    json!({
        "scenario": report.scenario,
        "base_url": report.base_url,
        "generated_at": report.generated_at.to_rfc3339(),
        "outcomes": report.outcomes,
        "summary": report.summary(),
    })
}

fn describe(verdict: &Verdict) -> String {
    match verdict {
        Verdict::Passed => "PASS".to_string(),
        Verdict::UnexpectedStatus { status, expected } => {
            format!("FAIL unexpected status {status} (expected {expected})")
        }
        Verdict::MalformedBody { status, reason } => {
            format!("FAIL malformed body on HTTP {status}: {reason}")
        }
        Verdict::TransportFailure { message } => format!("FAIL transport failure: {message}"),
        Verdict::Timeout { message } => format!("FAIL timeout: {message}"),
        Verdict::InvalidRequest { message } => format!("FAIL invalid request: {message}"),
    }
}

fn preview(body: &str) -> String {
    let flat: String = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > BODY_PREVIEW_CHARS {
        let head: String = flat.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        flat
    }
}
