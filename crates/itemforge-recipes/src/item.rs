//! Declared item data: recipe variants, drops and trader listings.
//!
//! These are the compiled-in defaults. Runtime edits never touch them; they
//! live in the override registry and are layered on top at materialization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use itemforge_common::{ForgeError, ToggleId};

use crate::drops::DropList;
use crate::requirements::RequirementList;
use crate::station::{CraftingStationList, CraftingTable};

/// Key of the default (unnamed) recipe variant.
pub const DEFAULT_VARIANT: &str = "";

/// One way of crafting an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeVariant {
    /// Items produced per craft.
    pub craft_amount: u32,
    /// Any single listed resource is enough to craft.
    pub require_only_one_ingredient: bool,
    /// Multiplier on the result amount for higher quality crafts.
    pub quality_result_amount_multiplier: f32,
    /// External "recipe is active" toggle.
    #[serde(skip)]
    pub recipe_is_active: Option<ToggleId>,
    /// Stations the variant is crafted at.
    pub crafting: CraftingStationList,
    /// Resources needed to craft.
    pub required_items: RequirementList,
    /// Resources needed per upgrade level.
    pub required_upgrade_items: RequirementList,
}

impl Default for RecipeVariant {
    fn default() -> Self {
        Self {
            craft_amount: 1,
            require_only_one_ingredient: false,
            quality_result_amount_multiplier: 1.0,
            recipe_is_active: None,
            crafting: CraftingStationList::default(),
            required_items: RequirementList::default(),
            required_upgrade_items: RequirementList::default(),
        }
    }
}

impl RecipeVariant {
    /// Table of the first declared station, if any.
    #[must_use]
    pub fn primary_table(&self) -> Option<CraftingTable> {
        self.crafting.primary().map(|s| s.table)
    }
}

// ============================================================================
// Traders
// ============================================================================

/// Trader an item can be sold by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Trader {
    /// Not sold.
    #[default]
    None,
    /// Sold by Haldor.
    Haldor,
    /// Sold by Hildir.
    Hildir,
}

impl Trader {
    /// Persisted name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Haldor => "Haldor",
            Self::Hildir => "Hildir",
        }
    }
}

impl fmt::Display for Trader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Trader {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(Self::None),
            "Haldor" => Ok(Self::Haldor),
            "Hildir" => Ok(Self::Hildir),
            _ => Err(ForgeError::InvalidValue {
                field: "Trader Selling".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Declared trader listing for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraderDefinition {
    /// Who sells the item.
    pub trader: Trader,
    /// Price in coins.
    pub price: u32,
    /// Items per purchase.
    pub stack: u32,
    /// Global key that must be set before the item is offered.
    pub required_global_key: String,
}

impl Default for TraderDefinition {
    fn default() -> Self {
        Self {
            trader: Trader::None,
            price: 0,
            stack: 1,
            required_global_key: String::new(),
        }
    }
}

// ============================================================================
// Item Definition
// ============================================================================

/// A declared item with its recipe variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Catalog name of the item prefab.
    pub prefab: String,
    /// English display name, used as the configuration section.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Highest upgrade level.
    #[serde(default = "default_max_quality")]
    pub max_quality: u32,
    /// Whether the item gets runtime override bundles.
    #[serde(default = "default_configurable")]
    pub configurable: bool,
    /// Cap on the station level required to upgrade and repair.
    #[serde(default)]
    pub maximum_required_station_level: Option<u32>,
    /// Recipe variants by key, `""` is the default variant.
    #[serde(default)]
    pub recipes: BTreeMap<String, RecipeVariant>,
    /// Creatures dropping the item.
    #[serde(default)]
    pub drops: DropList,
    /// Trader listing.
    #[serde(default)]
    pub trade: Option<TraderDefinition>,
}

const fn default_max_quality() -> u32 {
    1
}

const fn default_configurable() -> bool {
    true
}

impl ItemDefinition {
    /// Declare an item by prefab name.
    #[must_use]
    pub fn new(prefab: impl Into<String>) -> Self {
        Self {
            prefab: prefab.into(),
            display_name: None,
            max_quality: 1,
            configurable: true,
            maximum_required_station_level: None,
            recipes: BTreeMap::new(),
            drops: DropList::default(),
            trade: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the highest upgrade level.
    #[must_use]
    pub const fn with_max_quality(mut self, max_quality: u32) -> Self {
        self.max_quality = max_quality;
        self
    }

    /// Opt the item out of runtime configuration.
    #[must_use]
    pub const fn not_configurable(mut self) -> Self {
        self.configurable = false;
        self
    }

    /// Recipe variant by key, created on first access.
    pub fn recipe(&mut self, key: &str) -> &mut RecipeVariant {
        self.recipes.entry(key.to_string()).or_default()
    }

    /// The default variant.
    pub fn default_recipe(&mut self) -> &mut RecipeVariant {
        self.recipe(DEFAULT_VARIANT)
    }

    /// Name used as the configuration section.
    ///
    /// Quotes and brackets are stripped so the section stays a plain key.
    #[must_use]
    pub fn section_name(&self) -> String {
        self.display_name
            .as_deref()
            .unwrap_or(&self.prefab)
            .chars()
            .filter(|c| !matches!(c, '\'' | '"' | '[' | ']'))
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Whether the item has upgrade levels beyond the first.
    #[must_use]
    pub const fn is_upgradable(&self) -> bool {
        self.max_quality > 1
    }

    /// Declared station level cap, `u32::MAX` when unbounded.
    #[must_use]
    pub fn declared_maximum_station_level(&self) -> u32 {
        self.maximum_required_station_level.unwrap_or(u32::MAX)
    }
}
