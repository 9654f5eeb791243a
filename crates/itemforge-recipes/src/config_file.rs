//! Persisted override values.
//!
//! One TOML table per item section, one string value per editable field:
//!
//! ```toml
//! ["Bronze Sword"]
//! "Crafting Station" = "Forge"
//! "Crafting Costs" = "Bronze:8,Wood:2"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors from loading or saving the override file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("Config file I/O error: {0}")]
    Io(#[from] io::Error),
    /// File is not valid TOML
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// Values could not be serialized
    #[error("Failed to serialize config file: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Persisted override values by section and key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigFile {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl ConfigFile {
    /// Creates an empty file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persisted value of a key.
    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    /// Store a value. Returns whether anything changed.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let entries = self.sections.entry(section.to_string()).or_default();
        if entries.get(key) == Some(&value) {
            return false;
        }
        entries.insert(key.to_string(), value);
        true
    }

    /// Remove a value.
    pub fn remove(&mut self, section: &str, key: &str) -> Option<String> {
        let entries = self.sections.get_mut(section)?;
        let removed = entries.remove(key);
        if entries.is_empty() {
            self.sections.remove(section);
        }
        removed
    }

    /// Section names in order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Key/value pairs of a section.
    pub fn entries(&self, section: &str) -> impl Iterator<Item = (&str, &str)> {
        self.sections
            .get(section)
            .into_iter()
            .flat_map(|entries| entries.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Every `(section, key, value)` in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.sections.iter().flat_map(|(section, entries)| {
            entries
                .iter()
                .map(move |(k, v)| (section.as_str(), k.as_str(), v.as_str()))
        })
    }

    /// Copy every value of `other` over this file.
    pub fn merge(&mut self, other: &Self) {
        for (section, key, value) in other.iter() {
            self.set(section, key, value);
        }
    }

    /// Copy the values of `other` whose keys this file lacks.
    pub fn merge_missing(&mut self, other: &Self) {
        for (section, key, value) in other.iter() {
            if self.get(section, key).is_none() {
                self.set(section, key, value);
            }
        }
    }

    /// Total number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.values().map(BTreeMap::len).sum()
    }

    /// Check if no value is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Parse from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Render as TOML text.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load from a path. A missing file is an empty configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, starting empty", path.display());
            return Ok(Self::default());
        }

        let file = Self::from_toml_str(&fs::read_to_string(path)?)?;
        info!("Loaded {} config values from {}", file.len(), path.display());
        Ok(file)
    }

    /// Save to a path, creating parent directories if needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }
}
