//! Error types for the verification harness.
//!
//! Probe failures are not errors: they are recorded in
//! [`ProbeResult`](crate::probe::ProbeResult) and never unwind past the
//! scenario runner. Only bootstrap and scenario-loading problems surface as
//! `Err`.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Verification service bootstrap errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The listening port is already bound by another process.
    #[error("port {port} is already in use")]
    PortInUse { port: u16 },

    /// Binding failed for a reason other than the port being taken.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The configuration was rejected before binding.
    #[error("invalid service configuration: {message}")]
    InvalidConfig { message: String },

    /// The server task stopped with an I/O error.
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    /// The server task panicked or was cancelled.
    #[error("server task failed: {message}")]
    Task { message: String },
}

/// Scenario loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// Scenario file could not be read.
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scenario document is not valid YAML for the scenario schema.
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Scenario parsed but is not runnable.
    #[error("invalid scenario: {message}")]
    Invalid { message: String },

    /// Base URL the scenario runs against is not an absolute http(s) URL.
    #[error("invalid base url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ScenarioError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Errors reported by a [`Mailer`](crate::email::Mailer).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailerError {
    /// The candidate is not known to the mailer.
    #[error("candidate not found: {candidate_id}")]
    CandidateNotFound { candidate_id: String },

    /// The request is structurally valid JSON but not acceptable.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// The downstream email provider refused or failed the delivery.
    #[error("delivery failed: {message}")]
    Delivery { message: String },
}

/// Result type for service bootstrap operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
