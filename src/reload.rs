//! Reload debouncing and the periodic reload worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::metrics;
use crate::resolver::Resolver;

/// Non-blocking handle enqueueing record-reload requests.
///
/// Requests coalesce: while one reload is already pending, further
/// requests are dropped. A pending reload pulls the latest authoritative
/// state regardless of how many requests accumulated, so a drop loses
/// nothing. Dropped requests are counted under
/// `dns_supervisor.reload.request.count{outcome="coalesced"}`.
#[derive(Clone)]
pub struct ReloadTrigger {
    tx: mpsc::Sender<()>,
}

impl ReloadTrigger {
    /// Request a reload; never blocks.
    pub fn request(&self) {
        match self.tx.try_send(()) {
            Ok(()) => metrics::record_reload_request(metrics::ReloadRequest::Queued),
            Err(mpsc::error::TrySendError::Full(())) => {
                metrics::record_reload_request(metrics::ReloadRequest::Coalesced);
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                debug!("reload worker gone; dropping reload request");
            }
        }
    }
}

/// Spawn the reload worker and return its trigger.
///
/// The worker services one request at a time, reloading against `resolver`
/// exclusively; it also reloads on its own every `interval` in the absence
/// of requests. The interval restarts after each reload completes,
/// whatever caused it. Reload failures are logged and never propagated.
pub fn spawn_reload_worker(
    resolver: Arc<dyn Resolver>,
    interval: Duration,
    shutdown: CancellationToken,
) -> ReloadTrigger {
    let (tx, mut rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        loop {
            let cause = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("reload worker shutting down");
                    return;
                }
                req = time::timeout(interval, rx.recv()) => match req {
                    Ok(Some(())) => metrics::ReloadCause::Requested,
                    Ok(None) => {
                        debug!("all reload triggers dropped; reload worker exiting");
                        return;
                    }
                    Err(_) => metrics::ReloadCause::Timer,
                },
            };

            if let Err(e) = resolver.reload().await {
                warn!(error = %e, "record reload failed");
            }
            metrics::record_reload(cause);
        }
    });

    ReloadTrigger { tx }
}
