//! Verification service bootstrap.
//!
//! Binds the listener, installs the cross-origin middleware and mounts one
//! externally supplied route group under the configured prefix:
//!
//! ```text
//! /
//! └── <mount_prefix>/*   - mounted group (the email API)
//! ```

use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::routes::{RouteGroup, RouteRegistry};

mod cors;

use cors::CorsPolicy;

/// Start the verification service.
///
/// Fails with [`ServiceError::PortInUse`] when the port is taken; the caller
/// is expected to treat that as fatal.
pub async fn start(config: ServiceConfig, mounted: RouteGroup) -> ServiceResult<RunningService> {
    let prefix = config.validate()?;

    let (router, routes) = RouteGroup::new().nest(&prefix, mounted).into_parts();
    let policy = Arc::new(CorsPolicy::new(config.allowed_origins.clone()));
    let router = router.layer(axum::middleware::from_fn_with_state(policy, cors::cors));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await.map_err(|e| match e.kind() {
        ErrorKind::AddrInUse => ServiceError::PortInUse { port: config.port },
        _ => ServiceError::Bind { addr, source: e },
    })?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| ServiceError::Bind { addr, source: e })?;

    for route in &routes {
        info!(method = %route.method, path = %route.path, "route registered");
    }
    info!(
        addr = %local_addr,
        origins = config.allowed_origins.len(),
        "verification service listening"
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    Ok(RunningService {
        local_addr,
        routes,
        shutdown: Some(shutdown_tx),
        handle,
    })
}

/// Handle to a started verification service.
#[derive(Debug)]
pub struct RunningService {
    local_addr: SocketAddr,
    routes: RouteRegistry,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl RunningService {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Loopback URL for probing this instance.
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.local_addr.port())
    }

    /// Every route the service exposes, with the mount prefix applied.
    pub fn routes(&self) -> &RouteRegistry {
        &self.routes
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) -> ServiceResult<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        join(self.handle).await
    }

    /// Serve until `signal` resolves, then shut down gracefully.
    ///
    /// Returns early if the server task stops on its own.
    pub async fn serve_until<F>(mut self, signal: F) -> ServiceResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            res = &mut self.handle => {
                warn!("verification service stopped before shutdown was requested");
                return flatten(res);
            }
            _ = signal => {
                info!("shutdown requested");
            }
        }
        self.shutdown().await
    }
}

async fn join(handle: JoinHandle<std::io::Result<()>>) -> ServiceResult<()> {
    flatten(handle.await)
}

fn flatten(res: Result<std::io::Result<()>, tokio::task::JoinError>) -> ServiceResult<()> {
    match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ServiceError::Serve(e)),
        Err(e) => Err(ServiceError::Task {
            message: e.to_string(),
        }),
    }
}
