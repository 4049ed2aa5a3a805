//! Shared test infrastructure for supervisor integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use dns_supervisor::{
    BoxError, Config, ErrorHandler, FilterChain, LeaderWatch, Plugin, PluginContext, PluginHandle,
    PluginRegistry, PluginSettings, Query, QueryFilter, Record, RecordHook, RecordSet, Resolver,
    WebService,
};

// --- Config builders ---

/// Config with every runtime subsystem off: nothing binds sockets and the
/// fallback reload timer stays out of the way.
pub fn test_config() -> Config {
    Config {
        masters: vec!["10.0.0.1:5050".into()],
        resolvers: vec!["8.8.8.8".into()],
        dns_on: false,
        http_on: false,
        refresh_seconds: 3600,
        leader_endpoint: None,
        ..Config::default()
    }
}

pub fn consensus_config() -> Config {
    Config {
        leader_endpoint: Some("zk://10.0.0.1:2181/dns".into()),
        ..test_config()
    }
}

pub fn plugin_entry(name: &str) -> PluginSettings {
    PluginSettings {
        name: name.into(),
        settings: serde_json::Value::Null,
    }
}

// --- MockResolver ---

/// Channel ends and registration counts captured from supervisor calls.
#[derive(Default)]
pub struct MockHandles {
    pub dns_errors: Option<mpsc::Sender<BoxError>>,
    pub leader: Option<mpsc::Sender<()>>,
    pub watch_errors: Option<mpsc::Sender<BoxError>>,
    pub filter_len: Option<usize>,
    pub preload_hooks: usize,
    pub postload_hooks: usize,
}

/// Resolution subsystem double: counts reloads and hands the test the
/// sending ends of every stream the supervisor consumes.
pub struct MockResolver {
    started: AtomicUsize,
    finished: AtomicUsize,
    gate: Option<Semaphore>,
    pub handles: Mutex<MockHandles>,
}

impl MockResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            gate: None,
            handles: Mutex::new(MockHandles::default()),
        })
    }

    /// Resolver whose reloads block until [`release_reloads`] hands out
    /// permits, for observing the debouncer mid-flight.
    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            gate: Some(Semaphore::new(0)),
            handles: Mutex::new(MockHandles::default()),
        })
    }

    pub fn release_reloads(&self, n: usize) {
        self.gate.as_ref().unwrap().add_permits(n);
    }

    pub fn reloads_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn reloads_finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn dns_error_sender(&self) -> Option<mpsc::Sender<BoxError>> {
        self.handles.lock().unwrap().dns_errors.clone()
    }

    pub fn leader_sender(&self) -> Option<mpsc::Sender<()>> {
        self.handles.lock().unwrap().leader.clone()
    }

    pub fn watch_error_sender(&self) -> Option<mpsc::Sender<BoxError>> {
        self.handles.lock().unwrap().watch_errors.clone()
    }

    pub fn filter_len(&self) -> Option<usize> {
        self.handles.lock().unwrap().filter_len
    }

    pub fn hook_counts(&self) -> (usize, usize) {
        let handles = self.handles.lock().unwrap();
        (handles.preload_hooks, handles.postload_hooks)
    }
}

#[async_trait]
impl Resolver for MockResolver {
    fn on_preload(&self, _hook: Arc<dyn RecordHook>) {
        self.handles.lock().unwrap().preload_hooks += 1;
    }

    fn on_postload(&self, _hook: Arc<dyn RecordHook>) {
        self.handles.lock().unwrap().postload_hooks += 1;
    }

    async fn launch_dns(
        &self,
        filters: FilterChain,
        _shutdown: CancellationToken,
    ) -> mpsc::Receiver<BoxError> {
        let (tx, rx) = mpsc::channel(8);
        let mut handles = self.handles.lock().unwrap();
        handles.dns_errors = Some(tx);
        handles.filter_len = Some(filters.len());
        rx
    }

    async fn launch_leader_watch(
        &self,
        _timeout: Duration,
        _shutdown: CancellationToken,
    ) -> LeaderWatch {
        let (leader_tx, leader_rx) = mpsc::channel(8);
        let (err_tx, err_rx) = mpsc::channel(8);
        let mut handles = self.handles.lock().unwrap();
        handles.leader = Some(leader_tx);
        handles.watch_errors = Some(err_tx);
        LeaderWatch {
            leader: leader_rx,
            errors: err_rx,
        }
    }

    async fn reload(&self) -> Result<(), BoxError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// --- Error handler ---

pub type RoutedErrors = Arc<Mutex<Vec<(String, String)>>>;

/// Error handler that records every (tag, message) pair it receives.
pub fn recording_handler() -> (ErrorHandler, RoutedErrors) {
    let routed: RoutedErrors = Arc::new(Mutex::new(Vec::new()));
    let sink = routed.clone();
    let handler: ErrorHandler = Arc::new(move |subsystem, err| {
        sink.lock()
            .unwrap()
            .push((subsystem.to_string(), err.to_string()));
    });
    (handler, routed)
}

// --- Test plugins ---

/// Stashes a clone of its context so tests can misuse it after Ready.
pub struct StashPlugin {
    pub slot: Arc<Mutex<Option<PluginContext>>>,
}

#[async_trait]
impl Plugin for StashPlugin {
    async fn start(
        &self,
        ctx: PluginContext,
        _shutdown: CancellationToken,
    ) -> Result<PluginHandle, BoxError> {
        *self.slot.lock().unwrap() = Some(ctx);
        Ok(PluginHandle::silent())
    }
}

/// Appends its label to a shared log when started.
pub struct OrderPlugin {
    pub label: String,
    pub log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Plugin for OrderPlugin {
    async fn start(
        &self,
        _ctx: PluginContext,
        _shutdown: CancellationToken,
    ) -> Result<PluginHandle, BoxError> {
        self.log.lock().unwrap().push(self.label.clone());
        Ok(PluginHandle::silent())
    }
}

/// Hands the test the sending end of its error stream.
pub struct ErrorStreamPlugin {
    pub sender_slot: Arc<Mutex<Option<mpsc::Sender<BoxError>>>>,
}

#[async_trait]
impl Plugin for ErrorStreamPlugin {
    async fn start(
        &self,
        _ctx: PluginContext,
        _shutdown: CancellationToken,
    ) -> Result<PluginHandle, BoxError> {
        let (tx, rx) = mpsc::channel(8);
        *self.sender_slot.lock().unwrap() = Some(tx);
        Ok(PluginHandle {
            errors: Some(rx),
            done: CancellationToken::new(),
        })
    }
}

/// Keeps AAAA answers only; exists to make filter registration observable.
struct KeepAaaa;

impl QueryFilter for KeepAaaa {
    fn apply(&self, _query: &Query, answers: Vec<Record>) -> Vec<Record> {
        answers
            .into_iter()
            .filter(|r| matches!(r.data, dns_supervisor::RecordData::Aaaa(_)))
            .collect()
    }
}

struct NoopHook;

impl RecordHook for NoopHook {
    fn on_records(&self, _records: &mut RecordSet) {}
}

/// Exercises the whole registration surface during start.
pub struct RegisteringPlugin {
    pub filters: usize,
}

#[async_trait]
impl Plugin for RegisteringPlugin {
    async fn start(
        &self,
        ctx: PluginContext,
        _shutdown: CancellationToken,
    ) -> Result<PluginHandle, BoxError> {
        for _ in 0..self.filters {
            ctx.add_filter(Arc::new(KeepAaaa));
        }
        ctx.on_preload(Arc::new(NoopHook));
        ctx.on_postload(Arc::new(NoopHook));
        ctx.register_web_service(WebService::new(
            ctx.plugin_name(),
            axum::Router::new(),
        ));
        Ok(PluginHandle::silent())
    }
}

/// Registry with one factory per (name, plugin) pair.
pub fn registry_of(entries: Vec<(&str, Arc<dyn Plugin>)>) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    for (name, plugin) in entries {
        let plugin = plugin.clone();
        registry.register(name, Arc::new(move |_| Ok(plugin.clone())));
    }
    registry
}

// --- Polling ---

/// Poll `cond` until it holds, asserting within `deadline`.
pub async fn wait_until(deadline: Duration, cond: impl Fn() -> bool) {
    let step = Duration::from_millis(5);
    let mut waited = Duration::ZERO;
    while !cond() {
        assert!(waited < deadline, "condition not met within {deadline:?}");
        tokio::time::sleep(step).await;
        waited += step;
    }
}

pub const SETTLE: Duration = Duration::from_millis(50);
pub const DEADLINE: Duration = Duration::from_secs(2);
