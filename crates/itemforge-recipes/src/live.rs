//! Live (materialized) recipes and their registry.
//!
//! This module provides:
//! - `ResolvedResource`, a requirement resolved against the catalog
//! - `LiveRecipe`, the object handed to the external engine
//! - `LiveRecipeRegistry`, the arena + `(item, variant)` index consulted by
//!   override handlers, plus live drops and trade offers per item

use std::collections::{BTreeMap, BTreeSet, HashMap};

use itemforge_common::{CreatureRef, ItemId, ItemRef, LiveRecipeId, StationRef};

use crate::drops::LiveDrop;
use crate::item::Trader;
use crate::station::CraftingTable;

// ============================================================================
// Resolved Resources
// ============================================================================

/// A requirement resolved to a catalog item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    /// Required item.
    pub item: ItemRef,
    /// Amount for the initial craft.
    pub amount: u32,
    /// Amount per upgrade level.
    pub amount_per_level: u32,
    /// Upgrade level this resource is restricted to.
    pub quality: Option<u32>,
}

impl ResolvedResource {
    /// Amount required when crafting or upgrading to `level`.
    ///
    /// Level-restricted resources only count at their own level. Others cost
    /// `amount` for the base craft and `(level - 1) * amount_per_level` for
    /// upgrades.
    #[must_use]
    pub fn amount_at(&self, level: u32) -> u32 {
        match self.quality {
            Some(quality) if quality != level => 0,
            Some(_) if level <= 1 => self.amount,
            Some(_) => self.amount_per_level,
            None if level <= 1 => self.amount,
            None => (level - 1).saturating_mul(self.amount_per_level),
        }
    }
}

// ============================================================================
// Live Recipes
// ============================================================================

/// Identifies a recipe variant of a declared item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipeKey {
    /// Declared item.
    pub item: ItemId,
    /// Variant key, empty for the default variant.
    pub variant: String,
}

impl RecipeKey {
    /// Key for an item variant.
    #[must_use]
    pub fn new(item: ItemId, variant: impl Into<String>) -> Self {
        Self {
            item,
            variant: variant.into(),
        }
    }
}

/// A materialized recipe owned by the external engine's recipe list.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveRecipe {
    /// Recipe object name.
    pub name: String,
    /// Variant the recipe was built from.
    pub key: RecipeKey,
    /// Position in the variant's station list.
    pub station_index: usize,
    /// Items produced per craft.
    pub amount: u32,
    /// Whether the engine offers the recipe.
    pub enabled: bool,
    /// Produced item.
    pub item: ItemRef,
    /// Resolved costs, shared by every station entry of the variant.
    pub resources: Vec<ResolvedResource>,
    /// Table the station was chosen from.
    pub table: CraftingTable,
    /// Resolved station, `None` for inventory crafting or a missing station.
    pub crafting_station: Option<StationRef>,
    /// Minimum station level.
    pub min_station_level: u32,
    /// Any single resource is enough.
    pub require_only_one_ingredient: bool,
    /// Result amount multiplier for higher quality crafts.
    pub quality_result_amount_multiplier: f32,
}

impl LiveRecipe {
    /// Whether this recipe comes from the variant's first station entry.
    #[must_use]
    pub const fn is_primary(&self) -> bool {
        self.station_index == 0
    }

    /// Non-zero costs when crafting or upgrading to `level`.
    #[must_use]
    pub fn cost_at(&self, level: u32) -> Vec<(ItemRef, u32)> {
        self.resources
            .iter()
            .map(|r| (r.item, r.amount_at(level)))
            .filter(|(_, amount)| *amount > 0)
            .collect()
    }
}

/// A live trader listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeOffer {
    /// Item being sold.
    pub item: ItemRef,
    /// Trader selling it, `Trader::None` when delisted.
    pub trader: Trader,
    /// Price in coins.
    pub price: u32,
    /// Items per purchase.
    pub stack: u32,
    /// Global key gating the offer.
    pub required_global_key: String,
}

// ============================================================================
// Registry
// ============================================================================

/// Registry of everything materialized for the current catalog session.
#[derive(Debug, Default)]
pub struct LiveRecipeRegistry {
    /// Arena of live recipes.
    recipes: Vec<LiveRecipe>,
    /// Recipes by item, then by variant key, in station order.
    by_item: HashMap<ItemId, BTreeMap<String, Vec<LiveRecipeId>>>,
    /// Recipes built from an empty, non-free cost list.
    hidden: BTreeSet<LiveRecipeId>,
    /// Live drops by dropped item.
    drops: HashMap<ItemId, Vec<LiveDrop>>,
    /// Live trader listings by item.
    trade_offers: HashMap<ItemId, TradeOffer>,
}

impl LiveRecipeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything, as a full catalog reload does.
    pub fn clear(&mut self) {
        self.recipes.clear();
        self.by_item.clear();
        self.hidden.clear();
        self.drops.clear();
        self.trade_offers.clear();
    }

    /// Store the recipes of one variant, replacing any prior list for the key.
    pub fn insert_variant(&mut self, recipes: Vec<LiveRecipe>, hidden: bool) -> Vec<LiveRecipeId> {
        let Some(key) = recipes.first().map(|r| r.key.clone()) else {
            return Vec::new();
        };

        let mut ids = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            let id = LiveRecipeId::new(self.recipes.len() as u32);
            self.recipes.push(recipe);
            if hidden {
                self.hidden.insert(id);
            }
            ids.push(id);
        }

        if let Some(previous) = self
            .by_item
            .entry(key.item)
            .or_default()
            .insert(key.variant, ids.clone())
        {
            for id in previous {
                self.hidden.remove(&id);
            }
        }
        ids
    }

    /// Get a recipe by ID.
    #[must_use]
    pub fn get(&self, id: LiveRecipeId) -> Option<&LiveRecipe> {
        self.recipes.get(id.index())
    }

    /// Get a recipe mutably by ID.
    pub fn get_mut(&mut self, id: LiveRecipeId) -> Option<&mut LiveRecipe> {
        self.recipes.get_mut(id.index())
    }

    /// Recipes of one variant, in station order.
    #[must_use]
    pub fn recipes_for(&self, item: ItemId, variant: &str) -> &[LiveRecipeId] {
        self.by_item
            .get(&item)
            .and_then(|variants| variants.get(variant))
            .map_or(&[], Vec::as_slice)
    }

    /// The recipe built from the variant's first station entry.
    #[must_use]
    pub fn first_for(&self, item: ItemId, variant: &str) -> Option<LiveRecipeId> {
        self.recipes_for(item, variant).first().copied()
    }

    /// Variant keys materialized for an item.
    pub fn variants_of(&self, item: ItemId) -> impl Iterator<Item = &str> {
        self.by_item
            .get(&item)
            .into_iter()
            .flat_map(|variants| variants.keys().map(String::as_str))
    }

    /// Iterate over all live recipes.
    pub fn iter(&self) -> impl Iterator<Item = (LiveRecipeId, &LiveRecipe)> {
        self.recipes
            .iter()
            .enumerate()
            .map(|(i, r)| (LiveRecipeId::new(i as u32), r))
    }

    /// Enabled recipes, as the engine's crafting list sees them.
    #[must_use]
    pub fn enabled(&self) -> Vec<LiveRecipeId> {
        self.iter()
            .filter(|(_, r)| r.enabled)
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of live recipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Check if nothing is materialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    // === Hidden recipes ===

    /// Whether the recipe was built from an empty, non-free cost list.
    #[must_use]
    pub fn is_hidden(&self, id: LiveRecipeId) -> bool {
        self.hidden.contains(&id)
    }

    /// Mark or unmark a recipe as hidden.
    pub fn set_hidden(&mut self, id: LiveRecipeId, hidden: bool) {
        if hidden {
            self.hidden.insert(id);
        } else {
            self.hidden.remove(&id);
        }
    }

    /// All hidden recipes.
    pub fn hidden(&self) -> impl Iterator<Item = LiveRecipeId> + '_ {
        self.hidden.iter().copied()
    }

    // === Drops ===

    /// Replace the live drops of an item.
    pub fn set_drops(&mut self, item: ItemId, drops: Vec<LiveDrop>) {
        self.drops.insert(item, drops);
    }

    /// Live drops of an item.
    #[must_use]
    pub fn drops_for(&self, item: ItemId) -> &[LiveDrop] {
        self.drops.get(&item).map_or(&[], Vec::as_slice)
    }

    /// Everything a creature drops.
    #[must_use]
    pub fn drops_for_creature(&self, creature: CreatureRef) -> Vec<&LiveDrop> {
        let mut drops: Vec<&LiveDrop> = self
            .drops
            .values()
            .flatten()
            .filter(|d| d.creature == creature)
            .collect();
        drops.sort_by_key(|d| d.item.raw());
        drops
    }

    // === Trade offers ===

    /// Store the live trader listing of an item.
    pub fn set_trade_offer(&mut self, item: ItemId, offer: TradeOffer) {
        self.trade_offers.insert(item, offer);
    }

    /// Live trader listing of an item.
    #[must_use]
    pub fn trade_offer(&self, item: ItemId) -> Option<&TradeOffer> {
        self.trade_offers.get(&item)
    }

    /// Live trader listing of an item, mutably.
    pub fn trade_offer_mut(&mut self, item: ItemId) -> Option<&mut TradeOffer> {
        self.trade_offers.get_mut(&item)
    }
}
