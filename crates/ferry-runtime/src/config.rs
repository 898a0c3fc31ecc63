use crate::error::{Error, Result};
use ferry_core::session::PermissionMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_COMMAND_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Bound of each session actor's inbox.
    pub command_channel_capacity: usize,
    /// Permission mode given to sessions the router creates from scratch.
    pub default_permission_mode: PermissionMode,
    /// Save the session to the store whenever a turn ends.
    pub persist_on_turn_end: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_channel_capacity: DEFAULT_COMMAND_CHANNEL_CAPACITY,
            default_permission_mode: PermissionMode::default(),
            persist_on_turn_end: true,
        }
    }
}

impl RuntimeConfig {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            Error::Configuration("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("ferry").join("runtime.toml"))
    }

    /// Loads the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No runtime config found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse {}: {e}", path.display()))
        })?;
        if config.command_channel_capacity == 0 {
            return Err(Error::Configuration(
                "command_channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
