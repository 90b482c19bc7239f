//! Service and probe configuration.
//!
//! Both structs are plain values passed into [`start`](crate::server::start)
//! and [`Prober::new`](crate::probe::Prober::new). Nothing here reads process
//! environment; the CLI maps flags and `MAILPROBE_*` variables onto them.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Verification service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// TCP port to listen on. `0` picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins that receive cross-origin response headers.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: BTreeSet<String>,

    /// Path prefix the email route group is mounted under.
    #[serde(default = "default_mount_prefix")]
    pub mount_prefix: String,
}

fn default_port() -> u16 {
    5000
}

fn default_allowed_origins() -> BTreeSet<String> {
    BTreeSet::from(["http://localhost:3000".to_string()])
}

fn default_mount_prefix() -> String {
    "/api/email".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            mount_prefix: default_mount_prefix(),
        }
    }
}

impl ServiceConfig {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_allowed_origins<I, O>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_mount_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.mount_prefix = prefix.into();
        self
    }

    /// Check the prefix and origins, returning the prefix as it will be mounted.
    ///
    /// A single trailing slash is dropped; `""` and `"/"` both mean the root.
    pub fn validate(&self) -> Result<String, ServiceError> {
        let prefix = self.mount_prefix.trim();
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(ServiceError::InvalidConfig {
                message: format!("mount prefix must start with '/': {:?}", self.mount_prefix),
            });
        }
        if prefix.contains(['{', '}', '*']) || prefix.contains("//") {
            return Err(ServiceError::InvalidConfig {
                message: format!(
                    "mount prefix must be a literal path: {:?}",
                    self.mount_prefix
                ),
            });
        }

        for origin in &self.allowed_origins {
            if origin.is_empty() || origin.ends_with('/') || !origin.contains("://") {
                return Err(ServiceError::InvalidConfig {
                    message: format!(
                        "allowed origin must look like scheme://host[:port]: {origin:?}"
                    ),
                });
            }
        }

        Ok(crate::base_url::normalize(prefix).to_string())
    }
}

/// Endpoint probe configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Ceiling for one request, connect through body read.
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl ProbeConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
