//! Built-in HTTP API plugin.
//!
//! Collects the web services plugins registered during initialization and
//! serves them as one router once the ready gate closes. Launched by the
//! supervisor under the name "HTTP server" when `http_on` is set.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::BoxError;
use crate::plugin::{Plugin, PluginHandle};
use crate::supervisor::PluginContext;

/// A named slice of the HTTP API contributed by a plugin.
pub struct WebService {
    /// Name used in logs when the service is mounted.
    pub name: String,
    /// Routes the service serves.
    pub router: Router,
}

impl WebService {
    /// Create a web service from a name and its routes.
    pub fn new(name: impl Into<String>, router: Router) -> Self {
        Self {
            name: name.into(),
            router,
        }
    }
}

/// Merge registered services into the router the API plugin serves.
///
/// A `/health` liveness route is always present.
pub(crate) fn build_router(services: Vec<WebService>) -> Router {
    services
        .into_iter()
        .fold(Router::new().route("/health", get(health)), |router, ws| {
            debug!(service = %ws.name, "mounting web service");
            router.merge(ws.router)
        })
}

async fn health() -> &'static str {
    "ok"
}

/// The HTTP API exposer.
///
/// Binding is deferred until the ready gate closes so that services
/// registered by plugins launched after this one are still picked up.
pub(crate) struct ApiPlugin {
    ready: CancellationToken,
    services: Arc<Mutex<Vec<WebService>>>,
    listen_addr: SocketAddr,
}

impl ApiPlugin {
    pub(crate) fn new(
        ready: CancellationToken,
        services: Arc<Mutex<Vec<WebService>>>,
        listen_addr: SocketAddr,
    ) -> Self {
        Self {
            ready,
            services,
            listen_addr,
        }
    }
}

#[async_trait]
impl Plugin for ApiPlugin {
    async fn start(
        &self,
        _ctx: PluginContext,
        shutdown: CancellationToken,
    ) -> Result<PluginHandle, BoxError> {
        let ready = self.ready.clone();
        let services = self.services.clone();
        let addr = self.listen_addr;

        let (err_tx, err_rx) = mpsc::channel::<BoxError>(1);
        let done = CancellationToken::new();
        let task_done = done.clone();

        tokio::spawn(async move {
            // Registration closes with the ready gate; only then is the
            // service list complete.
            ready.cancelled().await;

            let router = build_router(std::mem::take(&mut *services.lock()));

            let listener = match TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    let _ = err_tx.send(Box::new(e) as BoxError).await;
                    task_done.cancel();
                    return;
                }
            };
            info!(%addr, "HTTP API listening");

            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = serve.await {
                let _ = err_tx.send(Box::new(e) as BoxError).await;
            }

            task_done.cancel();
        });

        Ok(PluginHandle {
            errors: Some(err_rx),
            done,
        })
    }
}
