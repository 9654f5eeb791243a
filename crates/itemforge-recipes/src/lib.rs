//! # Itemforge Recipes
//!
//! Runtime-configurable crafting recipes.
//!
//! This crate provides:
//! - Text codecs for requirement lists and drop tables
//! - Declared items, recipe variants and crafting stations
//! - The catalog contract and an in-memory catalog
//! - Materialization of live recipes, drops and trade offers
//! - Override bundles with change notification and TOML persistence
//! - In-place reconciliation of live recipes when overrides change
//! - Scoped suppression of hidden recipes during enumeration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod catalog;
pub mod config_cell;
pub mod config_file;
pub mod definitions;
pub mod drops;
pub mod item;
pub mod live;
pub mod manager;
pub mod materializer;
pub mod overrides;
pub mod requirements;
pub mod settings;
pub mod station;
pub mod visibility;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::catalog::{Catalog, MemoryCatalog};
    pub use crate::config_cell::{ConfigCell, SubscriptionId};
    pub use crate::config_file::{ConfigError, ConfigFile};
    pub use crate::definitions::{load_definitions, DefinitionLoadError};
    pub use crate::drops::{DropList, DropTarget, LiveDrop};
    pub use crate::item::{ItemDefinition, RecipeVariant, Trader, TraderDefinition, DEFAULT_VARIANT};
    pub use crate::live::{LiveRecipe, LiveRecipeRegistry, RecipeKey, ResolvedResource, TradeOffer};
    pub use crate::manager::ItemManager;
    pub use crate::materializer::MaterializeReport;
    pub use crate::overrides::{AmountRegistry, FieldVisibility, OverrideBundle, OverrideCells, OverrideField};
    pub use crate::requirements::{Requirement, RequirementList};
    pub use crate::settings::ManagerSettings;
    pub use crate::station::{CraftingStationEntry, CraftingStationList, CraftingTable};
    pub use crate::visibility::VisibilityGuard;
    pub use itemforge_common::prelude::*;
}

pub use prelude::*;
