use relaycore::{ConfigError, DEFAULT_EVENT_BUFFER};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of each trigger's event buffer
    pub event_buffer_size: usize,

    /// Root of the file based requirement store; in-memory when unset
    pub config_dir: Option<PathBuf>,

    /// Filter used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: DEFAULT_EVENT_BUFFER,
            config_dir: None,
            log_filter: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Runtime(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw).map_err(|e| match e {
            ConfigError::Runtime(reason) => ConfigError::Runtime(format!("{}: {}", path.display(), reason)),
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(|e| ConfigError::Runtime(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_buffer_size == 0 {
            return Err(ConfigError::Runtime(
                "event_buffer_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
