//! Turns declared variants and their overrides into live recipes.
//!
//! Materialization never fails. Names the catalog cannot resolve are logged
//! with `warn!`, recorded in the `MaterializeReport` and left out of the
//! result.

use std::collections::HashMap;

use tracing::warn;

use itemforge_common::{ForgeError, ItemId, ItemRef, StationRef};

use crate::catalog::Catalog;
use crate::drops::{DropTarget, LiveDrop};
use crate::item::{RecipeVariant, TraderDefinition};
use crate::live::{LiveRecipe, RecipeKey, ResolvedResource, TradeOffer};
use crate::overrides::{AmountRegistry, OverrideBundle};
use crate::requirements::{self, Requirement};
use crate::station::CraftingTable;

// ============================================================================
// Report
// ============================================================================

/// Outcome of a materialization pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterializeReport {
    /// Soft failures in the order they were hit.
    pub warnings: Vec<ForgeError>,
    /// Live recipes created.
    pub recipes: usize,
    /// Recipes created hidden.
    pub hidden: usize,
    /// Live drops created.
    pub drops: usize,
}

impl MaterializeReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record a soft failure.
    pub fn warn(&mut self, error: ForgeError) {
        warn!("{}", error);
        self.warnings.push(error);
    }

    /// Whether nothing went wrong.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the station of a table choice.
///
/// `Disabled` and `Inventory` need no station. A miss is reported and leaves
/// the station unset.
pub fn resolve_station<C: Catalog + ?Sized>(
    catalog: &C,
    table: CraftingTable,
    custom: &str,
    report: &mut MaterializeReport,
) -> Option<StationRef> {
    let name = match table {
        CraftingTable::Disabled | CraftingTable::Inventory => return None,
        CraftingTable::Custom => custom,
        named => named.internal_name()?,
    };

    let station = catalog.resolve_station(name);
    if station.is_none() {
        report.warn(ForgeError::UnresolvedStation(name.to_string()));
    }
    station
}

struct PendingResource<'a> {
    name: &'a str,
    amount: u32,
    amount_per_level: u32,
    quality: Option<u32>,
}

/// Resolve craft and upgrade requirements into one resource list.
///
/// Level-independent entries with the same name merge into one resource:
/// the craft amount becomes `amount`, the upgrade amount `amount_per_level`.
/// Level-restricted entries always stay separate and cost their amount at
/// exactly their level.
pub fn resolve_resources<C: Catalog + ?Sized>(
    catalog: &C,
    craft: &[Requirement],
    upgrade: &[Requirement],
    report: &mut MaterializeReport,
) -> Vec<ResolvedResource> {
    let mut pending: Vec<PendingResource<'_>> = Vec::new();
    let mut merged: HashMap<&str, usize> = HashMap::new();

    let entries = craft
        .iter()
        .map(|r| (r, false))
        .chain(upgrade.iter().map(|r| (r, true)));

    for (req, is_upgrade) in entries {
        if req.is_placeholder() {
            continue;
        }

        if req.is_quality_specific() {
            pending.push(PendingResource {
                name: &req.item_name,
                amount: req.amount,
                amount_per_level: req.amount,
                quality: Some(req.quality),
            });
            continue;
        }

        let slot = *merged.entry(req.item_name.as_str()).or_insert_with(|| {
            pending.push(PendingResource {
                name: &req.item_name,
                amount: 0,
                amount_per_level: 0,
                quality: None,
            });
            pending.len() - 1
        });
        if is_upgrade {
            pending[slot].amount_per_level = req.amount;
        } else {
            pending[slot].amount = req.amount;
        }
    }

    pending
        .into_iter()
        .filter_map(|p| {
            let Some(item) = catalog.resolve_item(p.name) else {
                report.warn(ForgeError::UnresolvedItem(p.name.to_string()));
                return None;
            };
            Some(ResolvedResource {
                item,
                amount: p.amount,
                amount_per_level: p.amount_per_level,
                quality: p.quality,
            })
        })
        .collect()
}

/// Decode craft and upgrade cost strings, reporting every fallback taken.
pub fn decode_costs(
    craft: &str,
    upgrade: &str,
    report: &mut MaterializeReport,
) -> (Vec<Requirement>, Vec<Requirement>) {
    let (craft, craft_diagnostics) = requirements::decode_reporting(craft);
    let (upgrade, upgrade_diagnostics) = requirements::decode_reporting(upgrade);
    for diagnostic in craft_diagnostics.into_iter().chain(upgrade_diagnostics) {
        report.warn(diagnostic);
    }
    (craft, upgrade)
}

/// Resolve encoded craft and upgrade cost strings.
pub fn resolve_encoded<C: Catalog + ?Sized>(
    catalog: &C,
    craft: &str,
    upgrade: &str,
    report: &mut MaterializeReport,
) -> Vec<ResolvedResource> {
    let (craft, upgrade) = decode_costs(craft, upgrade, report);
    resolve_resources(catalog, &craft, &upgrade, report)
}

/// A recipe is hidden when its craft list resolves to nothing without being
/// declared free.
///
/// Only the craft list counts: upgrade costs never make the first craft
/// visible.
#[must_use]
pub fn is_hidden<C: Catalog + ?Sized>(catalog: &C, craft: &[Requirement], free: bool) -> bool {
    !free
        && !craft
            .iter()
            .any(|req| !req.is_placeholder() && catalog.resolve_item(&req.item_name).is_some())
}

/// Whether a recipe is offered.
///
/// A hidden recipe only shows up when its external toggle switches it on.
/// Otherwise the recipe is enabled unless its station is `Disabled` or its
/// toggle is off.
#[must_use]
pub const fn resolve_enabled(hidden: bool, table: CraftingTable, toggle: Option<bool>) -> bool {
    if hidden {
        return matches!(toggle, Some(true));
    }
    !matches!(table, CraftingTable::Disabled) && !matches!(toggle, Some(false))
}

// ============================================================================
// Variants
// ============================================================================

/// Everything needed to materialize one recipe variant.
#[derive(Debug, Clone, Copy)]
pub struct VariantSource<'a> {
    /// Declared item.
    pub item: ItemId,
    /// Catalog handle of the produced item.
    pub item_ref: ItemRef,
    /// Prefab name, used for recipe names.
    pub prefab: &'a str,
    /// Variant key.
    pub variant_key: &'a str,
    /// Declared variant.
    pub variant: &'a RecipeVariant,
    /// Override bundle, when the variant is configurable.
    pub overrides: Option<&'a OverrideBundle>,
    /// External per-requirement amounts.
    pub amounts: &'a AmountRegistry,
    /// Current value of the variant's external toggle.
    pub toggle: Option<bool>,
}

/// Live recipes of one variant.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedVariant {
    /// One recipe per declared station entry.
    pub recipes: Vec<LiveRecipe>,
    /// Whether the variant's costs left it hidden.
    pub hidden: bool,
}

/// Resolved costs of a variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantCosts {
    /// Merged craft and upgrade resources.
    pub resources: Vec<ResolvedResource>,
    /// Whether the craft list left the variant hidden.
    pub hidden: bool,
}

/// Costs of a variant from its override strings or its declared lists.
///
/// Declared lists read bound amounts from `amounts`. Override strings
/// already carry their amounts.
pub fn variant_costs<C: Catalog + ?Sized>(
    catalog: &C,
    variant: &RecipeVariant,
    overrides: Option<&OverrideBundle>,
    amounts: &AmountRegistry,
    report: &mut MaterializeReport,
) -> VariantCosts {
    let (craft, upgrade) = match overrides {
        Some(bundle) => decode_costs(bundle.craft.get(), bundle.upgrade_costs(), report),
        None => (
            amounts.apply(&variant.required_items.requirements),
            amounts.apply(&variant.required_upgrade_items.requirements),
        ),
    };
    VariantCosts {
        resources: resolve_resources(catalog, &craft, &upgrade, report),
        hidden: is_hidden(catalog, &craft, variant.required_items.free),
    }
}

/// Build one live recipe per declared station entry.
///
/// Costs are resolved once and shared by every entry. Only the first entry
/// takes its station and level from the override bundle.
pub fn materialize_variant<C: Catalog + ?Sized>(
    catalog: &C,
    source: &VariantSource<'_>,
    report: &mut MaterializeReport,
) -> MaterializedVariant {
    let variant = source.variant;
    let VariantCosts { resources, hidden } =
        variant_costs(catalog, variant, source.overrides, source.amounts, report);
    let key = RecipeKey::new(source.item, source.variant_key);

    let recipes: Vec<LiveRecipe> = variant
        .crafting
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let (table, custom, level) = match (index, source.overrides) {
                (0, Some(bundle)) => (
                    *bundle.table.get(),
                    bundle.custom_table.get().as_str(),
                    *bundle.table_level.get(),
                ),
                _ => (entry.table, entry.custom_name(), entry.level),
            };

            LiveRecipe {
                name: format!("{}_Recipe_{}", source.prefab, entry.table),
                key: key.clone(),
                station_index: index,
                amount: variant.craft_amount,
                enabled: resolve_enabled(hidden, table, source.toggle),
                item: source.item_ref,
                resources: resources.clone(),
                table,
                crafting_station: resolve_station(catalog, table, custom, report),
                min_station_level: level,
                require_only_one_ingredient: source
                    .overrides
                    .map_or(variant.require_only_one_ingredient, |b| *b.require_only_one.get()),
                quality_result_amount_multiplier: source
                    .overrides
                    .map_or(variant.quality_result_amount_multiplier, |b| {
                        *b.quality_multiplier.get()
                    }),
            }
        })
        .collect();

    report.recipes += recipes.len();
    if hidden {
        report.hidden += recipes.len();
    }

    MaterializedVariant { recipes, hidden }
}

// ============================================================================
// Drops and Trade
// ============================================================================

/// Attach drops to their creatures. Unknown creatures are skipped.
pub fn materialize_drops<C: Catalog + ?Sized>(
    catalog: &C,
    item: ItemRef,
    drops: &[DropTarget],
    report: &mut MaterializeReport,
) -> Vec<LiveDrop> {
    let live: Vec<LiveDrop> = drops
        .iter()
        .filter_map(|drop| {
            let Some(creature) = catalog.resolve_creature(&drop.creature) else {
                report.warn(ForgeError::UnresolvedCreature(drop.creature.clone()));
                return None;
            };
            Some(LiveDrop {
                creature,
                item,
                chance: drop.chance,
                min: drop.min,
                max: drop.max,
                level_multiplier: drop.level_multiplier,
            })
        })
        .collect();

    report.drops += live.len();
    live
}

/// Decode an encoded drop string and attach the drops to their creatures.
pub fn materialize_encoded_drops<C: Catalog + ?Sized>(
    catalog: &C,
    item: ItemRef,
    encoded: &str,
    report: &mut MaterializeReport,
) -> Vec<LiveDrop> {
    let (drops, diagnostics) = crate::drops::decode_reporting(encoded);
    for diagnostic in diagnostics {
        report.warn(diagnostic);
    }
    materialize_drops(catalog, item, &drops, report)
}

/// Live trader listing for an item.
#[must_use]
pub fn materialize_trade(item: ItemRef, trade: &TraderDefinition) -> TradeOffer {
    TradeOffer {
        item,
        trader: trade.trader,
        price: trade.price,
        stack: trade.stack,
        required_global_key: trade.required_global_key.clone(),
    }
}
