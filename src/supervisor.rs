//! Supervisor core: lifecycle gate, plugin launcher, leader watch, and the
//! run loop's error fan-in.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::api::{ApiPlugin, WebService};
use crate::config::Config;
use crate::error::{BoxError, ErrorHandler};
use crate::filter::{FilterChain, QueryFilter};
use crate::metrics;
use crate::plugin::{Plugin, PluginRegistry};
use crate::records::RecordHook;
use crate::reload::{spawn_reload_worker, ReloadTrigger};
use crate::resolver::Resolver;

/// Bound on initial leader detection in consensus mode.
const LEADER_DETECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Name the built-in HTTP API plugin launches under.
const HTTP_PLUGIN_NAME: &str = "HTTP server";

/// Tag for DNS responder errors routed to the host.
const DNS_SUBSYSTEM: &str = "DNS server";

/// Tag for leader-watcher errors routed to the host.
const LEADER_SUBSYSTEM: &str = "leader watcher";

/// Coarse-grained lifecycle state.
///
/// Transitions are monotonic; no phase is ever revisited. A constructed
/// supervisor is observed as `Ready` at the earliest, since construction
/// runs the whole `Initializing` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No supervisor exists yet.
    Uninitialized,
    /// Construction is running; plugins may register.
    Initializing,
    /// Initialization finished; `run` may be called.
    Ready,
    /// The run loop has exited.
    Done,
}

struct Inner {
    config: Config,
    resolver: Arc<dyn Resolver>,
    err_handler: ErrorHandler,
    phase: Mutex<Phase>,
    filters: Mutex<Vec<Arc<dyn QueryFilter>>>,
    web_services: Arc<Mutex<Vec<WebService>>>,
    trigger: Mutex<Option<ReloadTrigger>>,
    /// Closed exactly once, when initialization completes.
    ready: CancellationToken,
    /// Closed exactly once, when the run loop exits.
    done: CancellationToken,
    /// Cancelling this is the only way the run loop exits.
    shutdown: CancellationToken,
}

impl Inner {
    /// Registration is legal only while the ready gate is open. Violations
    /// are caller bugs, not runtime conditions.
    fn guard_initializing(&self, op: &str) {
        if self.ready.is_cancelled() {
            panic!("cannot {op} after initialization has completed");
        }
    }

    fn route_error(&self, subsystem: &str, err: BoxError) {
        metrics::record_subsystem_error(subsystem);
        (self.err_handler.as_ref())(subsystem, err);
    }
}

/// Narrow capability view of the supervisor handed to exactly one plugin.
///
/// Exposes only the registration surface and a sanitized view of the
/// configuration, never full supervisor state. Every registration method
/// panics once the ready gate has closed.
#[derive(Clone)]
pub struct PluginContext {
    inner: Arc<Inner>,
    plugin_name: String,
}

impl PluginContext {
    /// Name this context is scoped to, used for error attribution.
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Register a transform that runs before reloaded records are
    /// installed.
    pub fn on_preload(&self, hook: Arc<dyn RecordHook>) {
        self.inner.guard_initializing("register a preload hook");
        self.inner.resolver.on_preload(hook);
    }

    /// Register a transform that runs after reloaded records are
    /// installed.
    pub fn on_postload(&self, hook: Arc<dyn RecordHook>) {
        self.inner.guard_initializing("register a postload hook");
        self.inner.resolver.on_postload(hook);
    }

    /// Append a query filter. Filters apply in registration order.
    pub fn add_filter(&self, filter: Arc<dyn QueryFilter>) {
        self.inner.guard_initializing("add a filter");
        self.inner.filters.lock().push(filter);
    }

    /// Register a web service with the HTTP API.
    pub fn register_web_service(&self, ws: WebService) {
        self.inner.guard_initializing("register a web service");
        self.inner.web_services.lock().push(ws);
    }

    /// Sanitized snapshot of the configuration: plugin settings stripped,
    /// address lists copied. Mutating it never affects the supervisor.
    pub fn config(&self) -> Config {
        self.inner.config.sanitized()
    }
}

/// Supervises the service-discovery daemon's subsystems.
///
/// Construction runs the `Initializing` phase (plugin launch, hook and
/// filter registration) and closes the ready gate; [`run`](Supervisor::run)
/// launches the DNS responder, leader watcher, and reload worker, then
/// serializes their error reporting until [`shutdown`](Supervisor::shutdown)
/// is called. The supervisor never restarts a failed subsystem: errors are
/// routed to the host's handler, which owns all recovery policy.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    /// Construct and initialize a supervisor.
    ///
    /// Launches the built-in HTTP API plugin (when `http_on`) and then
    /// every plugin listed in `config.plugins`, in order. Plugins that
    /// fail to resolve or start are logged and skipped. Returns once the
    /// ready gate has closed; registration is illegal afterwards.
    pub async fn new(
        config: Config,
        resolver: Arc<dyn Resolver>,
        registry: PluginRegistry,
        err_handler: ErrorHandler,
    ) -> Supervisor {
        let inner = Arc::new(Inner {
            config,
            resolver,
            err_handler,
            phase: Mutex::new(Phase::Initializing),
            filters: Mutex::new(Vec::new()),
            web_services: Arc::new(Mutex::new(Vec::new())),
            trigger: Mutex::new(None),
            ready: CancellationToken::new(),
            done: CancellationToken::new(),
            shutdown: CancellationToken::new(),
        });

        let supervisor = Supervisor { inner };
        supervisor.initialize(registry).await;
        supervisor
    }

    async fn initialize(&self, registry: PluginRegistry) {
        // Built-in plugins first.
        if self.inner.config.http_on {
            let api = Arc::new(ApiPlugin::new(
                self.inner.ready.clone(),
                self.inner.web_services.clone(),
                self.inner.config.http_listen_addr,
            ));
            self.launch_plugin(HTTP_PLUGIN_NAME, api).await;
        }

        // Third-party plugins, in configured order. Setup failures are
        // non-fatal and must not block the plugins after them.
        for pconfig in self.inner.config.plugins.clone() {
            if pconfig.name.is_empty() {
                error!("refusing to start a plugin with an empty name");
                metrics::record_plugin_skipped("empty_name");
                continue;
            }

            let plugin = match registry.create(&pconfig.name, &pconfig.settings) {
                Ok(p) => p,
                Err(e) => {
                    error!(plugin = %pconfig.name, error = %e, "failed to create plugin");
                    metrics::record_plugin_skipped("create_failed");
                    continue;
                }
            };

            self.launch_plugin(&pconfig.name, plugin).await;
        }

        *self.inner.phase.lock() = Phase::Ready;
        self.inner.ready.cancel();
        info!("supervisor initialization complete");
    }

    /// Start one plugin and wire its error stream and completion signal
    /// into the supervisor.
    async fn launch_plugin(&self, name: &str, plugin: Arc<dyn Plugin>) {
        debug!(plugin = name, "starting plugin");

        let ctx = PluginContext {
            inner: self.inner.clone(),
            plugin_name: name.to_string(),
        };

        let handle = match plugin.start(ctx, self.inner.shutdown.child_token()).await {
            Ok(h) => h,
            Err(e) => {
                error!(plugin = name, error = %e, "failed to start plugin");
                metrics::record_plugin_skipped("start_failed");
                return;
            }
        };
        metrics::record_plugin_started();

        if let Some(mut errors) = handle.errors {
            let inner = self.inner.clone();
            let tag = name.to_string();
            tokio::spawn(async move {
                while let Some(err) = errors.recv().await {
                    inner.route_error(&tag, err);
                }
            });
        }

        let done = handle.done;
        let shutdown = self.inner.shutdown.clone();
        let tag = name.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = done.cancelled() => debug!(plugin = %tag, "plugin terminated"),
                _ = shutdown.cancelled() => {}
            }
        });
    }

    /// Start the leader watch in the mode the configuration selects.
    ///
    /// Static mode keeps the sender alive so the channel never reads as
    /// closed after the single buffered event is consumed.
    async fn begin_leader_watch(
        &self,
    ) -> (
        mpsc::Receiver<()>,
        Option<mpsc::Receiver<BoxError>>,
        Option<mpsc::Sender<()>>,
    ) {
        match &self.inner.config.leader_endpoint {
            Some(endpoint) => {
                info!(%endpoint, "watching cluster leader");
                let watch = self
                    .inner
                    .resolver
                    .launch_leader_watch(LEADER_DETECT_TIMEOUT, self.inner.shutdown.child_token())
                    .await;
                (watch.leader, Some(watch.errors), None)
            }
            None => {
                // Statically configured single-authority deployment:
                // leadership is axiomatic, exactly one event is pending
                // and no watcher errors ever arrive.
                info!("no leader endpoint configured; assuming leadership");
                let (tx, rx) = mpsc::channel(1);
                tx.try_send(()).expect("fresh capacity-1 channel");
                (rx, None, Some(tx))
            }
        }
    }

    /// Run the supervisor until [`shutdown`](Supervisor::shutdown).
    ///
    /// Launches the DNS responder (when `dns_on`), the leader watcher, and
    /// the reload worker, then handles one event at a time: a leadership
    /// acquisition requests a reload; subsystem errors are routed to the
    /// host's handler tagged "DNS server" or "leader watcher". Events are
    /// taken in arrival order with no priority between streams; a closed
    /// stream parks its branch without ending the loop.
    ///
    /// # Panics
    ///
    /// Panics when called before initialization completed or after the run
    /// loop already exited. Both indicate a broken caller contract.
    pub async fn run(&self) {
        if !self.inner.ready.is_cancelled() {
            panic!("cannot run: not yet initialized");
        }
        if self.inner.done.is_cancelled() {
            panic!("run already completed");
        }

        let filters = FilterChain::new(self.inner.filters.lock().clone());
        let mut dns_errors = if self.inner.config.dns_on {
            Some(
                self.inner
                    .resolver
                    .launch_dns(filters, self.inner.shutdown.child_token())
                    .await,
            )
        } else {
            None
        };

        let (mut new_leader, mut watch_errors, _static_leader_tx) =
            self.begin_leader_watch().await;

        let trigger = spawn_reload_worker(
            self.inner.resolver.clone(),
            self.inner.config.refresh_interval(),
            self.inner.shutdown.child_token(),
        );
        *self.inner.trigger.lock() = Some(trigger.clone());

        info!(
            dns_on = self.inner.config.dns_on,
            refresh_seconds = self.inner.config.refresh_seconds,
            "supervisor running"
        );

        loop {
            tokio::select! {
                _ = self.inner.shutdown.cancelled() => break,
                _ = recv_or_park(Some(&mut new_leader)) => {
                    debug!("leadership acquired; requesting record reload");
                    metrics::record_leadership_acquired();
                    trigger.request();
                }
                err = recv_or_park(dns_errors.as_mut()) => {
                    self.inner.route_error(DNS_SUBSYSTEM, err);
                }
                err = recv_or_park(watch_errors.as_mut()) => {
                    self.inner.route_error(LEADER_SUBSYSTEM, err);
                }
            }
        }

        *self.inner.phase.lock() = Phase::Done;
        self.inner.done.cancel();
        info!("supervisor run loop exited");
    }

    /// Signal every subsystem to stop. The run loop exits on the next
    /// iteration and closes the done gate.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    /// Wait until the run loop has exited.
    pub async fn done(&self) {
        self.inner.done.cancelled().await;
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        *self.inner.phase.lock()
    }

    /// Sanitized snapshot of the configuration.
    pub fn config(&self) -> Config {
        self.inner.config.sanitized()
    }

    /// Reload trigger for caller-supplied reload sources.
    ///
    /// Available once [`run`](Supervisor::run) has started its subsystems;
    /// `None` before that. Requests coalesce with every other trigger
    /// source.
    pub fn reload_trigger(&self) -> Option<ReloadTrigger> {
        self.inner.trigger.lock().clone()
    }
}

/// Await the next item, parking forever when the stream is absent or
/// closed. Keeps a finished branch from spinning the select loop.
async fn recv_or_park<T>(rx: Option<&mut mpsc::Receiver<T>>) -> T {
    match rx {
        Some(rx) => match rx.recv().await {
            Some(item) => item,
            None => future::pending().await,
        },
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recv_or_park_yields_items() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.send(7u32).await.unwrap();
        assert_eq!(recv_or_park(Some(&mut rx)).await, 7);
    }

    #[tokio::test]
    async fn test_recv_or_park_parks_on_closed_and_absent_streams() {
        let (tx, mut rx) = mpsc::channel::<u32>(1);
        drop(tx);

        let parked = tokio::time::timeout(
            Duration::from_millis(20),
            recv_or_park(Some(&mut rx)),
        )
        .await;
        assert!(parked.is_err(), "closed stream must park, not resolve");

        let absent = tokio::time::timeout(
            Duration::from_millis(20),
            recv_or_park(None::<&mut mpsc::Receiver<u32>>),
        )
        .await;
        assert!(absent.is_err(), "absent stream must park, not resolve");
    }
}
