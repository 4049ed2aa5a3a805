//! Contract between the supervisor and the resolution subsystem.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::BoxError;
use crate::filter::FilterChain;
use crate::records::RecordHook;

/// Streams produced by a launched leader watcher.
pub struct LeaderWatch {
    /// Emits one `()` per leadership acquisition. The first event is
    /// bounded by the detection timeout passed to
    /// [`Resolver::launch_leader_watch`]; later events signal
    /// re-acquisition after a failover.
    pub leader: mpsc::Receiver<()>,

    /// Watcher failures. Reported to the host's error handler, never
    /// retried by the supervisor.
    pub errors: mpsc::Receiver<BoxError>,
}

/// The resolution subsystem as the supervisor sees it.
///
/// Implementations own query resolution, record synthesis, and the
/// leader-election wire protocol; the supervisor only schedules them. All
/// mutation of the served records goes through [`reload`](Resolver::reload),
/// which the supervisor calls from a single worker task, one reload at a
/// time.
#[async_trait]
pub trait Resolver: Send + Sync + 'static {
    /// Install a hook that runs before reloaded records are installed.
    fn on_preload(&self, hook: Arc<dyn RecordHook>);

    /// Install a hook that runs after reloaded records are installed.
    fn on_postload(&self, hook: Arc<dyn RecordHook>);

    /// Start answering DNS queries, passing answers through `filters`.
    /// Returns the responder's error stream; the responder itself runs
    /// until `shutdown` is cancelled.
    async fn launch_dns(
        &self,
        filters: FilterChain,
        shutdown: CancellationToken,
    ) -> mpsc::Receiver<BoxError>;

    /// Start watching the leader-election backend, bounded by `timeout`
    /// for initial detection.
    async fn launch_leader_watch(
        &self,
        timeout: Duration,
        shutdown: CancellationToken,
    ) -> LeaderWatch;

    /// Pull authoritative state from the cluster masters and swap the
    /// served records. Returns once the reload completed or failed;
    /// failures are logged by the caller, not propagated.
    async fn reload(&self) -> Result<(), BoxError>;
}
