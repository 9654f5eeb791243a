//! Manager settings.
//!
//! Global switches of the override layer. Settings can be loaded from and
//! saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config_file::ConfigError;

/// Default settings file name.
pub const SETTINGS_FILE: &str = "itemforge.toml";

/// Default override file name.
const CONFIG_FILE: &str = "itemforge.cfg.toml";

/// Settings of an `ItemManager` session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    /// Create override bundles for configurable items
    pub configuration_enabled: bool,
    /// Save the override file after every change
    pub persist_on_change: bool,
    /// Override file location
    pub config_path: Option<PathBuf>,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            configuration_enabled: true,
            persist_on_change: true,
            config_path: Some(PathBuf::from(CONFIG_FILE)),
        }
    }
}

impl ManagerSettings {
    /// Settings that never touch the disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            persist_on_change: false,
            config_path: None,
            ..Self::default()
        }
    }

    /// Loads settings from the default file location.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from(SETTINGS_FILE)
    }

    /// Loads settings from a specific path, falling back to defaults when
    /// the file is missing or invalid.
    #[must_use]
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("Settings file not found, using defaults");
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(settings) => {
                info!("Loaded settings from {}", path.display());
                settings
            },
            Err(e) => {
                warn!("Ignoring settings file {}: {e}", path.display());
                Self::default()
            },
        }
    }

    /// Loads settings from a specific path.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&fs::read_to_string(path)?)?)
    }

    /// Saves settings to a specific path, creating missing parent
    /// directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Whether edits should be written through to disk.
    #[must_use]
    pub fn persists(&self) -> bool {
        self.persist_on_change && self.config_path.is_some()
    }
}
