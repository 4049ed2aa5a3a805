//! Error types for dns-supervisor.

use std::sync::Arc;

use thiserror::Error;

/// Opaque error carried on subsystem and plugin error streams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Caller-supplied error router.
///
/// Invoked with the reporting subsystem's tag ("DNS server",
/// "leader watcher", or a plugin name) and the error itself. The handler
/// owns all policy: whether an error is cosmetic or fatal is its call; the
/// supervisor never retries or restarts on its behalf.
pub type ErrorHandler = Arc<dyn Fn(&str, BoxError) + Send + Sync>;

/// Setup faults raised while assembling the supervisor.
///
/// These are non-fatal by design: the plugin launcher logs them and moves
/// on to the next plugin. Misuse of the lifecycle gate (registration after
/// ready, run before ready, double run) is a broken caller contract and
/// panics instead of surfacing here.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// No factory registered under the requested plugin name.
    #[error("no plugin registered under name {name:?}")]
    UnknownPlugin {
        /// The unresolved plugin name.
        name: String,
    },

    /// A plugin factory rejected its settings.
    #[error("failed to construct plugin {name:?}: {source}")]
    PluginConstruct {
        /// Name of the failing plugin.
        name: String,
        /// Factory error.
        #[source]
        source: BoxError,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}
