//! Route registry: explicit `(method, path)` bookkeeping for mounted routes.
//!
//! Route groups record their descriptors at registration time instead of
//! reverse-engineering them from the HTTP framework's router internals.
//! [`list_routes`] walks the registry depth-first in registration order and
//! yields the full externally reachable path of every route.

use std::fmt;

use axum::handler::Handler;
use axum::routing::{on, MethodFilter};
use axum::Router;
use serde::{Deserialize, Serialize};

/// HTTP verbs a route or probe may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "patch")]
    Patch,
    #[serde(alias = "delete")]
    Delete,
    #[serde(alias = "head")]
    Head,
    #[serde(alias = "options")]
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    fn filter(self) -> MethodFilter {
        match self {
            Self::Get => MethodFilter::GET,
            Self::Post => MethodFilter::POST,
            Self::Put => MethodFilter::PUT,
            Self::Patch => MethodFilter::PATCH,
            Self::Delete => MethodFilter::DELETE,
            Self::Head => MethodFilter::HEAD,
            Self::Options => MethodFilter::OPTIONS,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `(method, path)` identity of one reachable endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDescriptor {
    pub method: HttpMethod,
    pub path: String,
}

impl RouteDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl fmt::Display for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<7} {}", self.method.as_str(), self.path)
    }
}

#[derive(Debug, Clone)]
enum RouteEntry {
    Route { method: HttpMethod, path: String },
    Nested { prefix: String, registry: RouteRegistry },
}

/// Registration-ordered table of routes and nested registries.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    entries: Vec<RouteEntry>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, method: HttpMethod, path: impl Into<String>) {
        self.entries.push(RouteEntry::Route {
            method,
            path: path.into(),
        });
    }

    /// Mount `registry` under `prefix`. An empty prefix mounts at the root.
    pub fn nest(&mut self, prefix: impl Into<String>, registry: RouteRegistry) {
        self.entries.push(RouteEntry::Nested {
            prefix: prefix.into(),
            registry,
        });
    }

    pub fn iter(&self) -> Routes<'_> {
        Routes {
            stack: vec![(String::new(), self.entries.iter())],
        }
    }

    /// Number of routes, nested ones included.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<'a> IntoIterator for &'a RouteRegistry {
    type Item = RouteDescriptor;
    type IntoIter = Routes<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy depth-first walk over a [`RouteRegistry`].
#[derive(Debug)]
pub struct Routes<'a> {
    stack: Vec<(String, std::slice::Iter<'a, RouteEntry>)>,
}

impl Iterator for Routes<'_> {
    type Item = RouteDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (prefix, entries) = self.stack.last_mut()?;
            match entries.next() {
                Some(RouteEntry::Route { method, path }) => {
                    return Some(RouteDescriptor::new(*method, join_paths(prefix, path)));
                }
                Some(RouteEntry::Nested {
                    prefix: nested,
                    registry,
                }) => {
                    let full = join_paths(prefix, nested);
                    self.stack.push((full, registry.entries.iter()));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Enumerate every route in `registry`, nested registries included.
pub fn list_routes(registry: &RouteRegistry) -> Routes<'_> {
    registry.iter()
}

fn join_paths(prefix: &str, path: &str) -> String {
    match (prefix, path) {
        ("", p) => p.to_string(),
        (p, "") | (p, "/") => p.to_string(),
        (p, q) => format!("{p}{q}"),
    }
}

/// An axum router paired with the registry of everything registered on it.
#[derive(Debug)]
pub struct RouteGroup<S = ()> {
    router: Router<S>,
    registry: RouteRegistry,
}

impl<S> Default for RouteGroup<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RouteGroup<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            registry: RouteRegistry::new(),
        }
    }

    /// Register `handler` for `method` on `path` and record the descriptor.
    ///
    /// Registering several methods on one path is allowed; registering the
    /// same method twice on one path panics (axum overlap rule).
    pub fn route<H, T>(mut self, method: HttpMethod, path: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.router = self.router.route(path, on(method.filter(), handler));
        self.registry.add(method, path);
        self
    }

    /// Mount `group` under `prefix`. `""` and `"/"` merge at the root.
    pub fn nest(mut self, prefix: &str, group: RouteGroup<S>) -> Self {
        if prefix.is_empty() || prefix == "/" {
            self.router = self.router.merge(group.router);
            self.registry.nest("", group.registry);
        } else {
            self.router = self.router.nest(prefix, group.router);
            self.registry.nest(prefix, group.registry);
        }
        self
    }

    /// Provide the state the handlers need, producing a group with any state type.
    pub fn with_state<S2>(self, state: S) -> RouteGroup<S2>
    where
        S2: Clone + Send + Sync + 'static,
    {
        RouteGroup {
            router: self.router.with_state(state),
            registry: self.registry,
        }
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    pub fn into_parts(self) -> (Router<S>, RouteRegistry) {
        (self.router, self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop() -> &'static str {
        "ok"
    }

    fn email_group() -> RouteGroup {
        RouteGroup::new()
            .route(HttpMethod::Get, "/test", noop)
            .route(HttpMethod::Post, "/send-candidate-session", noop)
    }

    #[test]
    fn test_nested_group_yields_full_paths_in_order() {
        let app = RouteGroup::<()>::new().nest("/api/email", email_group());

        let routes: Vec<_> = list_routes(app.registry()).collect();
        assert_eq!(
            routes,
            vec![
                RouteDescriptor::new(HttpMethod::Get, "/api/email/test"),
                RouteDescriptor::new(HttpMethod::Post, "/api/email/send-candidate-session"),
            ]
        );
    }

    #[test]
    fn test_empty_registry_yields_nothing() {
        let registry = RouteRegistry::new();
        assert_eq!(list_routes(&registry).count(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_depth_first_registration_order() {
        let mut inner = RouteRegistry::new();
        inner.add(HttpMethod::Get, "/b1");
        inner.add(HttpMethod::Delete, "/b2");

        let mut deeper = RouteRegistry::new();
        deeper.add(HttpMethod::Put, "/c");
        inner.nest("/deep", deeper);

        let mut root = RouteRegistry::new();
        root.add(HttpMethod::Get, "/a");
        root.nest("/b", inner);
        root.nest("/empty", RouteRegistry::new());
        root.add(HttpMethod::Post, "/d");

        let paths: Vec<String> = root.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "GET     /a",
                "GET     /b/b1",
                "DELETE  /b/b2",
                "PUT     /b/deep/c",
                "POST    /d",
            ]
        );
        assert_eq!(root.len(), 5);
    }

    #[test]
    fn test_root_route_under_prefix_is_the_prefix() {
        let mut inner = RouteRegistry::new();
        inner.add(HttpMethod::Get, "/");
        let mut root = RouteRegistry::new();
        root.nest("/health", inner);

        let routes: Vec<_> = root.iter().collect();
        assert_eq!(routes, vec![RouteDescriptor::new(HttpMethod::Get, "/health")]);
    }

    #[test]
    fn test_merge_at_root_keeps_paths() {
        let app = RouteGroup::<()>::new().nest("/", email_group());
        let paths: Vec<_> = app.registry().iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/test", "/send-candidate-session"]);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let app = RouteGroup::<()>::new().nest("/api/email", email_group());
        let first: Vec<_> = app.registry().iter().collect();
        let second: Vec<_> = app.registry().iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_method_serde_accepts_both_cases() {
        let upper: HttpMethod = serde_yaml::from_str("POST").unwrap();
        let lower: HttpMethod = serde_yaml::from_str("post").unwrap();
        assert_eq!(upper, HttpMethod::Post);
        assert_eq!(lower, HttpMethod::Post);
        assert_eq!(serde_json::to_string(&HttpMethod::Get).unwrap(), "\"GET\"");
    }
}
