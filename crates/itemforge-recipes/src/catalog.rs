//! Contract with the external item/station catalog.
//!
//! The engine only ever asks the catalog to resolve names and to accept the
//! recipes it materialized. `MemoryCatalog` is a plain in-memory catalog for
//! headless sessions and tests.

use std::collections::HashMap;

use itemforge_common::{CreatureRef, ItemRef, LiveRecipeId, StationRef};

/// Lookup and registration surface of the external catalog.
pub trait Catalog {
    /// Resolve an item prefab by name.
    fn resolve_item(&self, name: &str) -> Option<ItemRef>;

    /// Resolve a crafting station by internal name.
    fn resolve_station(&self, name: &str) -> Option<StationRef>;

    /// Resolve a creature by name.
    fn resolve_creature(&self, name: &str) -> Option<CreatureRef>;

    /// Accept freshly materialized recipes.
    fn register_recipes(&mut self, recipes: &[LiveRecipeId]);
}

/// In-memory catalog.
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalog {
    items: HashMap<String, ItemRef>,
    stations: HashMap<String, StationRef>,
    creatures: HashMap<String, CreatureRef>,
    registered: Vec<LiveRecipeId>,
    next_handle: u32,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every named engine table already registered.
    #[must_use]
    pub fn with_engine_stations() -> Self {
        let mut catalog = Self::new();
        for table in crate::station::CraftingTable::all() {
            if let Some(name) = table.internal_name() {
                catalog.add_station(name);
            }
        }
        catalog
    }

    fn next(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Register an item prefab, returning its handle.
    pub fn add_item(&mut self, name: &str) -> ItemRef {
        if let Some(existing) = self.items.get(name) {
            return *existing;
        }
        let handle = ItemRef::new(self.next());
        self.items.insert(name.to_string(), handle);
        handle
    }

    /// Register a crafting station, returning its handle.
    pub fn add_station(&mut self, name: &str) -> StationRef {
        if let Some(existing) = self.stations.get(name) {
            return *existing;
        }
        let handle = StationRef::new(self.next());
        self.stations.insert(name.to_string(), handle);
        handle
    }

    /// Register a creature, returning its handle.
    pub fn add_creature(&mut self, name: &str) -> CreatureRef {
        if let Some(existing) = self.creatures.get(name) {
            return *existing;
        }
        let handle = CreatureRef::new(self.next());
        self.creatures.insert(name.to_string(), handle);
        handle
    }

    /// Recipes registered since the last `clear_registered`.
    #[must_use]
    pub fn registered_recipes(&self) -> &[LiveRecipeId] {
        &self.registered
    }

    /// Forget registered recipes, as a catalog teardown would.
    pub fn clear_registered(&mut self) {
        self.registered.clear();
    }
}

impl Catalog for MemoryCatalog {
    fn resolve_item(&self, name: &str) -> Option<ItemRef> {
        self.items.get(name).copied()
    }

    fn resolve_station(&self, name: &str) -> Option<StationRef> {
        self.stations.get(name).copied()
    }

    fn resolve_creature(&self, name: &str) -> Option<CreatureRef> {
        self.creatures.get(name).copied()
    }

    fn register_recipes(&mut self, recipes: &[LiveRecipeId]) {
        self.registered.extend_from_slice(recipes);
    }
}
