//! Endpoint verification harness for the candidate email API.
//!
//! This crate provides:
//!
//! - A route registry that records `(method, path)` descriptors at
//!   registration time and enumerates them lazily for diagnostics
//! - The email API route group and its mailer collaborator
//! - A verification service bootstrap (bind, cross-origin policy, mount)
//! - An endpoint probe that turns every outcome into data
//! - A sequential scenario runner with text and JSON reporting
//! - The base URL normalizer used when joining paths
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use mailprobe_core::{
//!     email_routes, start, LocalMailer, ProbeConfig, Prober, Scenario, ScenarioRunner,
//!     ServiceConfig,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServiceConfig::default().with_port(0);
//! let prefix = config.mount_prefix.clone();
//! let service = start(config, email_routes(Arc::new(LocalMailer::default()))).await?;
//!
//! let runner = ScenarioRunner::new(Prober::new(ProbeConfig::default())?, service.base_url())?;
//! let report = runner.run(&Scenario::email_smoke(&prefix)).await;
//! println!("{}", mailprobe_core::report::render_text(&report));
//!
//! service.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod base_url;
pub mod config;
pub mod email;
pub mod error;
pub mod probe;
pub mod report;
pub mod routes;
pub mod scenario;
pub mod server;

pub use base_url::normalize;
pub use config::{ProbeConfig, ServiceConfig};
pub use email::{
    email_routes, DeliveryReceipt, LocalMailer, Mailer, SendCandidateSession,
    SEND_CANDIDATE_SESSION_PATH, TEST_PATH,
};
pub use error::{MailerError, ScenarioError, ServiceError};
pub use probe::{FailureKind, ProbeBody, ProbeRequest, ProbeResult, Prober};
pub use report::{ScenarioReport, Summary};
pub use routes::{list_routes, HttpMethod, RouteDescriptor, RouteGroup, RouteRegistry, Routes};
pub use scenario::{
    Expectation, ExpectedStatus, Scenario, ScenarioRunner, ScenarioStep, StepOutcome, Verdict,
};
pub use server::{start, RunningService};

/// User-Agent sent with every probe.
pub const PROBE_USER_AGENT: &str = concat!("mailprobe/", env!("CARGO_PKG_VERSION"));
