//! Plugin protocol and registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, SupervisorError};
use crate::supervisor::PluginContext;

/// What a started plugin hands back to the launcher.
pub struct PluginHandle {
    /// Operational errors; forwarded to the host's error handler tagged
    /// with the plugin name until the stream closes. `None` when the
    /// plugin never reports errors.
    pub errors: Option<mpsc::Receiver<BoxError>>,

    /// Cancelled by the plugin when it terminates. A plugin that runs for
    /// the process lifetime simply never cancels it.
    pub done: CancellationToken,
}

impl PluginHandle {
    /// Handle for a plugin with no error stream that never terminates.
    pub fn silent() -> Self {
        Self {
            errors: None,
            done: CancellationToken::new(),
        }
    }
}

/// An independently packaged unit of extension logic.
///
/// `start` runs during supervisor initialization and is awaited before the
/// next plugin launches, so every registration call made through `ctx` is
/// observed by the supervisor before `start` returns. `shutdown` is
/// cancelled when the supervisor is torn down; long-running plugin tasks
/// should exit on it.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Start the plugin. A returned error is logged and the plugin is
    /// skipped; other plugins are unaffected.
    async fn start(
        &self,
        ctx: PluginContext,
        shutdown: CancellationToken,
    ) -> Result<PluginHandle, BoxError>;
}

/// Factory producing a plugin from its JSON settings.
pub type PluginFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Arc<dyn Plugin>, BoxError> + Send + Sync>;

/// Name-to-factory map resolving the third-party plugins named in the
/// configuration.
///
/// The registry is passed explicitly to
/// [`Supervisor::new`](crate::Supervisor::new); there is no process-wide
/// plugin state.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, factory: PluginFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// True when a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Resolve `name` and build the plugin from `settings`.
    pub fn create(
        &self,
        name: &str,
        settings: &serde_json::Value,
    ) -> Result<Arc<dyn Plugin>, SupervisorError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| SupervisorError::UnknownPlugin {
                name: name.to_string(),
            })?;

        factory(settings).map_err(|source| SupervisorError::PluginConstruct {
            name: name.to_string(),
            source,
        })
    }
}
