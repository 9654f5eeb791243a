//! Crafting station selection.
//!
//! This module provides:
//! - The `CraftingTable` choice (named engine tables, custom, disabled, inventory)
//! - The static table → internal identifier mapping
//! - Ordered station lists for recipe variants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use itemforge_common::ForgeError;

// ============================================================================
// Crafting Tables
// ============================================================================

/// Station a recipe is crafted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CraftingTable {
    /// Recipe is switched off.
    Disabled,
    /// No station required, craftable from the inventory.
    Inventory,
    /// Workbench.
    #[default]
    Workbench,
    /// Cauldron.
    Cauldron,
    /// Forge.
    Forge,
    /// Artisan table.
    ArtisanTable,
    /// Stonecutter.
    StoneCutter,
    /// Galdr table.
    MageTable,
    /// Black forge.
    BlackForge,
    /// Food preparation table.
    FoodPreparationTable,
    /// Mead ketill.
    MeadKetill,
    /// Station looked up by a custom name.
    Custom,
}

impl CraftingTable {
    /// Internal catalog identifier of a named table.
    ///
    /// `None` for `Disabled`, `Inventory` and `Custom`, which have no fixed
    /// identifier.
    #[must_use]
    pub const fn internal_name(self) -> Option<&'static str> {
        match self {
            Self::Workbench => Some("piece_workbench"),
            Self::Cauldron => Some("piece_cauldron"),
            Self::Forge => Some("forge"),
            Self::ArtisanTable => Some("piece_artisanstation"),
            Self::StoneCutter => Some("piece_stonecutter"),
            Self::MageTable => Some("piece_magetable"),
            Self::BlackForge => Some("blackforge"),
            Self::FoodPreparationTable => Some("piece_preptable"),
            Self::MeadKetill => Some("piece_MeadCauldron"),
            Self::Disabled | Self::Inventory | Self::Custom => None,
        }
    }

    /// Variant name, used as the persisted value.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disabled => "Disabled",
            Self::Inventory => "Inventory",
            Self::Workbench => "Workbench",
            Self::Cauldron => "Cauldron",
            Self::Forge => "Forge",
            Self::ArtisanTable => "ArtisanTable",
            Self::StoneCutter => "StoneCutter",
            Self::MageTable => "MageTable",
            Self::BlackForge => "BlackForge",
            Self::FoodPreparationTable => "FoodPreparationTable",
            Self::MeadKetill => "MeadKetill",
            Self::Custom => "Custom",
        }
    }

    /// Get all tables in declaration order.
    #[must_use]
    pub fn all() -> &'static [CraftingTable] {
        &[
            Self::Disabled,
            Self::Inventory,
            Self::Workbench,
            Self::Cauldron,
            Self::Forge,
            Self::ArtisanTable,
            Self::StoneCutter,
            Self::MageTable,
            Self::BlackForge,
            Self::FoodPreparationTable,
            Self::MeadKetill,
            Self::Custom,
        ]
    }

    /// Whether recipes at this table need a station at all.
    #[must_use]
    pub const fn requires_station(self) -> bool {
        !matches!(self, Self::Disabled | Self::Inventory)
    }
}

impl fmt::Display for CraftingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CraftingTable {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "None" is the pre-rename spelling of Inventory in older config files
        if s == "None" {
            return Ok(Self::Inventory);
        }
        Self::all()
            .iter()
            .copied()
            .find(|table| table.name() == s)
            .ok_or_else(|| ForgeError::InvalidValue {
                field: "Crafting Station".to_string(),
                value: s.to_string(),
            })
    }
}

// ============================================================================
// Station Entries
// ============================================================================

/// One declared station a variant can be crafted at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftingStationEntry {
    /// Station choice.
    pub table: CraftingTable,
    /// Minimum station level.
    pub level: u32,
    /// Custom station name, only meaningful for `CraftingTable::Custom`.
    #[serde(default)]
    pub custom: Option<String>,
}

impl CraftingStationEntry {
    /// Entry at a named table.
    #[must_use]
    pub const fn new(table: CraftingTable, level: u32) -> Self {
        Self {
            table,
            level,
            custom: None,
        }
    }

    /// Entry at a custom station.
    #[must_use]
    pub fn custom(name: impl Into<String>, level: u32) -> Self {
        Self {
            table: CraftingTable::Custom,
            level,
            custom: Some(name.into()),
        }
    }

    /// Custom station name, empty when unset.
    #[must_use]
    pub fn custom_name(&self) -> &str {
        self.custom.as_deref().unwrap_or("")
    }
}

/// Ordered list of stations for a recipe variant.
///
/// Only the first entry is ever subject to runtime override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CraftingStationList {
    /// Declared stations in order.
    pub stations: Vec<CraftingStationEntry>,
}

impl CraftingStationList {
    /// Add a named table.
    pub fn add(&mut self, table: CraftingTable, level: u32) {
        self.stations.push(CraftingStationEntry::new(table, level));
    }

    /// Add a custom station by name.
    pub fn add_custom(&mut self, name: impl Into<String>, level: u32) {
        self.stations.push(CraftingStationEntry::custom(name, level));
    }

    /// The entry runtime overrides apply to.
    #[must_use]
    pub fn primary(&self) -> Option<&CraftingStationEntry> {
        self.stations.first()
    }

    /// Number of declared stations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Check if no station is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Iterate over the declared stations.
    pub fn iter(&self) -> impl Iterator<Item = &CraftingStationEntry> {
        self.stations.iter()
    }
}
