//! Cross-origin middleware driven by a fixed origin allow-list.
//!
//! Allow-listed origins get `Access-Control-Allow-Origin` echoed back with
//! credentials allowed. Everyone else gets no cross-origin headers at all and
//! is left for the browser to reject; the server still answers.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN,
    VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";
const MAX_AGE_SECS: &str = "600";

#[derive(Debug, Clone)]
pub(crate) struct CorsPolicy {
    allowed_origins: BTreeSet<String>,
}

impl CorsPolicy {
    pub(crate) fn new(allowed_origins: BTreeSet<String>) -> Self {
        Self { allowed_origins }
    }

    fn allows(&self, origin: &str) -> bool {
        self.allowed_origins.contains(origin)
    }

    fn apply(&self, headers: &mut HeaderMap, origin: &str) {
        let Ok(value) = HeaderValue::from_str(origin) else {
            return;
        };
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }

    fn apply_preflight(&self, headers: &mut HeaderMap) {
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECS));
    }
}

pub(crate) async fn cors(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let allowed = origin.as_deref().filter(|o| policy.allows(o));

    if let Some(origin) = origin.as_deref() {
        if allowed.is_none() {
            debug!(origin = %origin, path = %request.uri().path(), "origin not allow-listed");
        }
    }

    let preflight = request.method() == Method::OPTIONS
        && request.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD);
    if preflight {
        let mut response = StatusCode::NO_CONTENT.into_response();
        if let Some(origin) = allowed {
            policy.apply(response.headers_mut(), origin);
            policy.apply_preflight(response.headers_mut());
        }
        return response;
    }

    let mut response = next.run(request).await;
    if let Some(origin) = allowed {
        policy.apply(response.headers_mut(), origin);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CorsPolicy {
        CorsPolicy::new(BTreeSet::from(["http://localhost:3000".to_string()]))
    }

    #[test]
    fn test_allows_exact_origin_only() {
        let policy = policy();
        assert!(policy.allows("http://localhost:3000"));
        assert!(!policy.allows("http://localhost:3001"));
        assert!(!policy.allows("http://localhost:3000/"));
    }

    #[test]
    fn test_apply_sets_credentials_and_vary() {
        let mut headers = HeaderMap::new();
        policy().apply(&mut headers, "http://localhost:3000");

        assert_eq!(
            headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
        assert_eq!(headers.get(VARY).unwrap(), "Origin");
    }
}
