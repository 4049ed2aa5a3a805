//! Static-leadership demo: a toy resolver supervised end to end.
//!
//! Run with `cargo run --example static_leader`, then hit
//! `http://127.0.0.1:8123/health` and watch the reload log lines.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use dns_supervisor::{
    telemetry, BoxError, Config, FilterChain, LeaderWatch, PluginRegistry, RecordHook, Resolver,
    Supervisor,
};

#[derive(Parser, Debug)]
#[command(name = "static_leader")]
struct Args {
    /// HTTP API listen address.
    #[arg(long, default_value = "127.0.0.1:8123")]
    http_listen_addr: std::net::SocketAddr,

    /// Fallback reload interval in seconds.
    #[arg(long, default_value_t = 10)]
    refresh_seconds: u64,
}

/// Resolver that only logs what the supervisor asks of it.
struct LoggingResolver;

#[async_trait]
impl Resolver for LoggingResolver {
    fn on_preload(&self, _hook: Arc<dyn RecordHook>) {
        info!("preload hook registered");
    }

    fn on_postload(&self, _hook: Arc<dyn RecordHook>) {
        info!("postload hook registered");
    }

    async fn launch_dns(
        &self,
        filters: FilterChain,
        shutdown: CancellationToken,
    ) -> mpsc::Receiver<BoxError> {
        info!(filters = filters.len(), "DNS responder launched");
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            shutdown.cancelled().await;
            drop(tx);
        });
        rx
    }

    async fn launch_leader_watch(
        &self,
        _timeout: Duration,
        _shutdown: CancellationToken,
    ) -> LeaderWatch {
        unreachable!("static mode never launches a leader watch")
    }

    async fn reload(&self) -> Result<(), BoxError> {
        info!("reloading records from cluster state");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    let config = Config {
        dns_on: true,
        http_on: true,
        http_listen_addr: args.http_listen_addr,
        refresh_seconds: args.refresh_seconds,
        ..Config::default()
    };
    telemetry::init(&config.telemetry)?;

    let supervisor = Supervisor::new(
        config,
        Arc::new(LoggingResolver),
        PluginRegistry::new(),
        Arc::new(|subsystem, err| tracing::error!(%subsystem, error = %err, "subsystem error")),
    )
    .await;

    let runner = supervisor.clone();
    tokio::spawn(async move { runner.run().await });

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    supervisor.shutdown();
    supervisor.done().await;
    Ok(())
}
