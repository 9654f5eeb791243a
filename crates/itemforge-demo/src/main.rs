//! # Itemforge Demo
//!
//! Headless session runner. Loads item declarations from RON, materializes
//! them against an in-memory catalog, applies a few runtime overrides and
//! prints what the engine would offer.
//!
//! Usage: `itemforge-demo [items.ron]`
//!
//! Settings come from `itemforge.toml` in the working directory when it
//! exists. Without it the session runs in memory and writes nothing to disk.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use itemforge_recipes::prelude::*;
use itemforge_recipes::settings::SETTINGS_FILE;

/// Declarations shipped with the demo.
const DEFAULT_ITEMS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/items.ron");

/// Catalog knowing every name the declarations mention.
fn catalog_for(items: &[ItemDefinition]) -> MemoryCatalog {
    let mut catalog = MemoryCatalog::with_engine_stations();
    for item in items {
        catalog.add_item(&item.prefab);
        for variant in item.recipes.values() {
            let requirements = variant
                .required_items
                .requirements
                .iter()
                .chain(&variant.required_upgrade_items.requirements);
            for req in requirements {
                catalog.add_item(&req.item_name);
            }
        }
        for drop in &item.drops.drops {
            catalog.add_creature(&drop.creature);
        }
    }
    catalog
}

/// Settings from `path`, or an in-memory session when it does not exist.
fn session_settings(path: &Path) -> ManagerSettings {
    if path.exists() {
        ManagerSettings::load_from(path)
    } else {
        info!("No {} found, keeping overrides in memory", path.display());
        ManagerSettings::in_memory()
    }
}

fn describe(manager: &ItemManager<MemoryCatalog>, id: LiveRecipeId) {
    let Some(recipe) = manager.live().get(id) else {
        return;
    };
    info!(
        "  {} at {} (level {}), costs {:?}",
        recipe.name,
        recipe.table,
        recipe.min_station_level,
        recipe.cost_at(1)
    );
}

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("itemforge=info".parse()?))
        .init();

    info!("Itemforge demo starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let items_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_ITEMS), PathBuf::from);
    let items = load_definitions(&items_path)?;
    let settings = session_settings(Path::new(SETTINGS_FILE));

    let mut manager = ItemManager::new(catalog_for(&items), settings);
    let ids: Vec<(String, ItemId)> = items
        .into_iter()
        .map(|item| (item.prefab.clone(), manager.register_item(item)))
        .collect();
    let mead_toggle = manager.register_toggle("Mead Base Active", false);
    if let Some((_, mead)) = ids.iter().find(|(prefab, _)| prefab == "MeadBase") {
        manager.bind_toggle(*mead, DEFAULT_VARIANT, mead_toggle)?;
    }

    manager.enable_configuration();
    let report = manager.reload();
    for warning in &report.warnings {
        warn!("Materialization: {}", warning);
    }

    info!("Offered after load:");
    for id in manager.available_recipes() {
        describe(&manager, id);
    }

    if let Some((_, sword)) = ids.iter().find(|(prefab, _)| prefab == "SwordBronze") {
        manager.set_table_level(*sword, DEFAULT_VARIANT, 2)?;
        manager.set_craft_costs(*sword, DEFAULT_VARIANT, "Bronze:10,Wood:4")?;
        manager.set_table(*sword, "Cheap", CraftingTable::Disabled)?;
        if let Some(&id) = manager.recipes_for(*sword, DEFAULT_VARIANT).first() {
            info!(
                "Bronze Sword needs station level {} for quality 4",
                manager.required_station_level(id, 4).unwrap_or_default()
            );
        }
    }
    if let Some((_, trophy)) = ids.iter().find(|(prefab, _)| prefab == "TrophyTroll") {
        manager.set_trader_price(*trophy, 90)?;
    }
    manager.set_toggle(mead_toggle, true)?;

    let offered = manager.enumerate_available(|live| {
        info!("{} hidden recipes suppressed while enumerating", live.suppressed());
        live.enabled()
    });
    info!("Offered after edits:");
    for id in offered {
        describe(&manager, id);
    }

    info!("Itemforge demo complete");
    Ok(())
}
