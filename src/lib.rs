//! dns-supervisor - Lifecycle supervisor for a cluster service-discovery DNS daemon.
//!
//! This crate owns the daemon's lifecycle: one-time initialization,
//! concurrent startup of its independent subsystems (the DNS responder, a
//! cluster leader watcher, the record-reload pump, and an extensible
//! plugin framework), and a central run loop that serializes
//! cross-subsystem error reporting. Query resolution, record synthesis,
//! and the leader-election protocol stay behind the [`Resolver`] trait;
//! error policy stays with the host through the [`ErrorHandler`].
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                         dns-supervisor                         │
//! │                                                                │
//! │  Initializing:                      Running:                   │
//! │  ┌───────────────┐                  ┌──────────────┐  errors   │
//! │  │ Plugin        │  register hooks, │ DNS responder│────┐      │
//! │  │ launcher      │  filters, web    └──────────────┘    │      │
//! │  │ (built-in +   │  services via    ┌──────────────┐    ▼      │
//! │  │  third-party) │  PluginContext   │ Leader       │  fan-in   │
//! │  └───────────────┘                  │ watcher      │─► loop ──►│── errorHandler(tag, err)
//! │          │ ready gate closes        └──────┬───────┘           │
//! │          ▼                                 │ leadership        │
//! │       [Ready]                              ▼                   │
//! │                                     ┌──────────────┐           │
//! │                  timer / trigger ──►│ Reload worker│           │
//! │                  (1-deep, coalesced)└──────────────┘           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! [`Supervisor::new`] runs the whole `Initializing` phase: it launches
//! the built-in HTTP API plugin and every configured third-party plugin,
//! awaiting each `start` so registration calls are observed before the
//! next plugin launches, then closes the ready gate. Registration after
//! that point is a caller bug and panics. [`Supervisor::run`] starts the
//! runtime subsystems and blocks in the fan-in loop until
//! [`Supervisor::shutdown`] tears everything down.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dns_supervisor::{Config, PluginRegistry, Supervisor};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let resolver = Arc::new(MyResolver::connect(&config).await);
//!
//!     let supervisor = Supervisor::new(
//!         config,
//!         resolver,
//!         PluginRegistry::new(),
//!         Arc::new(|subsystem, err| eprintln!("{subsystem}: {err}")),
//!     )
//!     .await;
//!
//!     supervisor.run().await;
//! }
//! ```

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod plugin;
pub mod records;
pub mod reload;
pub mod resolver;
pub mod supervisor;
pub mod telemetry;

// Re-export main types
pub use api::WebService;
pub use config::{Config, PluginSettings, TelemetryConfig};
pub use error::{BoxError, ErrorHandler, SupervisorError};
pub use filter::{FilterChain, Query, QueryFilter};
pub use plugin::{Plugin, PluginFactory, PluginHandle, PluginRegistry};
pub use records::{Record, RecordData, RecordHook, RecordSet};
pub use reload::ReloadTrigger;
pub use resolver::{LeaderWatch, Resolver};
pub use supervisor::{Phase, PluginContext, Supervisor};
