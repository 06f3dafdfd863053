use crate::config::RuntimeConfig;
use relaycore::{ActionContext, ConfigStore, FileConfigStore, MemoryConfigStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Install the global `tracing` subscriber. `RUST_LOG` takes precedence
/// over `default_filter`. Returns false if a subscriber was already set.
pub fn init_tracing(default_filter: &str) -> bool {
    use tracing_subscriber::{fmt, EnvFilter};
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .try_init()
        .is_ok()
}

/// Process-wide execution environment.
///
/// Owns the root cancellation token every invocation context derives from
/// and the configuration store requirements load from. Create one at
/// startup and share it.
pub struct Environment {
    config: RuntimeConfig,
    root: CancellationToken,
    store: Arc<dyn ConfigStore>,
}

impl Environment {
    /// Build the environment and install logging.
    pub fn new(config: RuntimeConfig) -> Self {
        if init_tracing(&config.log_filter) {
            tracing::debug!("Installed tracing subscriber ({})", config.log_filter);
        }
        let store: Arc<dyn ConfigStore> = match &config.config_dir {
            Some(dir) => {
                tracing::info!("Loading provider configuration from {}", dir.display());
                Arc::new(FileConfigStore::new(dir.clone()))
            }
            None => Arc::new(MemoryConfigStore::new()),
        };
        Self::with_store(config, store)
    }

    /// Build the environment around an explicit store. Does not touch the
    /// global subscriber.
    pub fn with_store(config: RuntimeConfig, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            config,
            root: CancellationToken::new(),
            store,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn config_store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    /// A fresh invocation context, cancelled when the environment shuts
    /// down.
    pub fn context(&self) -> ActionContext {
        ActionContext::with_cancellation(self.root.child_token())
            .with_event_buffer(self.config.event_buffer_size)
    }

    /// Cancel every context handed out so far.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down execution environment");
        self.root.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}
