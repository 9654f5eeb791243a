//! The item manager session.
//!
//! `ItemManager` owns the declared items, the override layer, the persisted
//! configuration and the live recipes of one catalog session. Every edit
//! flows through the same path:
//!
//! 1. the cell is updated (nothing happens if the value is unchanged)
//! 2. the cell's observers run
//! 3. the value is written to the config file
//! 4. `reconcile` patches the live recipes in place
//! 5. the display refresh hook runs

use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use itemforge_common::{AmountId, ForgeError, ForgeResult, ItemId, LiveRecipeId, ToggleId};

use crate::catalog::Catalog;
use crate::config_file::{ConfigError, ConfigFile};
use crate::item::{ItemDefinition, Trader, DEFAULT_VARIANT};
use crate::live::LiveRecipeRegistry;
use crate::materializer::{
    materialize_drops, materialize_encoded_drops, materialize_trade, materialize_variant,
    resolve_enabled, resolve_station, variant_costs, MaterializeReport, VariantCosts, VariantSource,
};
use crate::overrides::{
    AmountRegistry, FieldVisibility, ItemOverrides, OverrideBundle, OverrideCells, OverrideField,
    OverrideRegistry, ToggleRegistry, TraderOverrides,
};
use crate::settings::ManagerSettings;
use crate::station::CraftingTable;
use crate::visibility::VisibilityGuard;

/// Hook asking the configuration display to redraw.
pub type RefreshHook = Box<dyn FnMut()>;

/// Owner of all recipe state for one session.
pub struct ItemManager<C: Catalog> {
    /// External item and station catalog.
    catalog: C,
    /// Declared items, indexed by `ItemId`.
    items: Vec<ItemDefinition>,
    /// Session settings.
    settings: ManagerSettings,
    /// Persisted override values.
    config: ConfigFile,
    /// Override cells.
    overrides: OverrideRegistry,
    /// External "recipe is active" toggles.
    toggles: ToggleRegistry,
    /// External per-requirement amounts.
    amounts: AmountRegistry,
    /// Materialized recipes, drops and trade offers.
    live: LiveRecipeRegistry,
    /// Whether override bundles have been seeded.
    configuration_seeded: bool,
    /// Display refresh hook.
    refresh: Option<RefreshHook>,
    /// Warnings of the last reload and every reconcile since.
    report: MaterializeReport,
}

impl<C: Catalog + fmt::Debug> fmt::Debug for ItemManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemManager")
            .field("catalog", &self.catalog)
            .field("items", &self.items.len())
            .field("settings", &self.settings)
            .field("overrides", &self.overrides.bundle_count())
            .field("toggles", &self.toggles.len())
            .field("amounts", &self.amounts.len())
            .field("live", &self.live.len())
            .field("configuration_seeded", &self.configuration_seeded)
            .finish_non_exhaustive()
    }
}

fn unknown_variant(item: ItemId, variant: &str) -> ForgeError {
    ForgeError::UnknownVariant {
        item,
        variant: variant.to_string(),
    }
}

/// Seed cells from persisted values, writing defaults for missing keys.
/// Returns whether the config file changed.
fn seed_cells<T: OverrideCells>(
    config: &mut ConfigFile,
    section: &str,
    variant: &str,
    fields: &[OverrideField],
    cells: &mut T,
) -> bool {
    let mut dirty = false;
    for &field in fields {
        let (Some(key), Some(current)) = (field.config_key(variant), cells.value_string(field))
        else {
            continue;
        };

        let Some(persisted) = config.get(section, &key).map(str::to_string) else {
            dirty |= config.set(section, &key, current);
            continue;
        };
        if let Err(e) = cells.apply_str(field, &persisted) {
            warn!("[{}] {}, keeping {}", section, e, current);
            dirty |= config.set(section, &key, current);
        }
    }
    dirty
}

/// Persisted values that differ from the current cells.
fn changed_values<T: OverrideCells>(
    file: &ConfigFile,
    section: &str,
    variant: &str,
    fields: &[OverrideField],
    cells: &T,
) -> Vec<(OverrideField, String)> {
    fields
        .iter()
        .filter_map(|&field| {
            let persisted = file.get(section, &field.config_key(variant)?)?;
            (cells.value_string(field)?.as_str() != persisted)
                .then(|| (field, persisted.to_string()))
        })
        .collect()
}

impl<C: Catalog> ItemManager<C> {
    /// Creates a session over a catalog.
    #[must_use]
    pub fn new(catalog: C, settings: ManagerSettings) -> Self {
        Self {
            catalog,
            items: Vec::new(),
            settings,
            config: ConfigFile::new(),
            overrides: OverrideRegistry::new(),
            toggles: ToggleRegistry::new(),
            amounts: AmountRegistry::new(),
            live: LiveRecipeRegistry::new(),
            configuration_seeded: false,
            refresh: None,
            report: MaterializeReport::new(),
        }
    }

    /// Start from already persisted values.
    #[must_use]
    pub fn with_config(mut self, config: ConfigFile) -> Self {
        self.config = config;
        self
    }

    // === Accessors ===

    /// The catalog.
    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// The catalog, mutably.
    pub fn catalog_mut(&mut self) -> &mut C {
        &mut self.catalog
    }

    /// Session settings.
    #[must_use]
    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    /// Persisted override values.
    #[must_use]
    pub fn config_file(&self) -> &ConfigFile {
        &self.config
    }

    /// Override cells.
    #[must_use]
    pub fn overrides(&self) -> &OverrideRegistry {
        &self.overrides
    }

    /// Override cells, for subscribing to changes.
    ///
    /// Values set directly on a cell bypass reconciliation; edits belong in
    /// the `set_*` methods.
    pub fn overrides_mut(&mut self) -> &mut OverrideRegistry {
        &mut self.overrides
    }

    /// Live recipes, drops and trade offers.
    #[must_use]
    pub fn live(&self) -> &LiveRecipeRegistry {
        &self.live
    }

    /// Live recipes of a variant, in station order.
    #[must_use]
    pub fn recipes_for(&self, item: ItemId, variant: &str) -> &[LiveRecipeId] {
        self.live.recipes_for(item, variant)
    }

    /// Warnings collected since the last reload.
    #[must_use]
    pub fn report(&self) -> &MaterializeReport {
        &self.report
    }

    /// Install the display refresh hook.
    pub fn set_display_refresh(&mut self, hook: impl FnMut() + 'static) {
        self.refresh = Some(Box::new(hook));
    }

    // === Declarations ===

    /// Declare an item.
    pub fn register_item(&mut self, definition: ItemDefinition) -> ItemId {
        let id = ItemId::new(self.items.len() as u32);
        debug!("Registered item {} as {}", definition.prefab, id);
        self.items.push(definition);

        if self.configuration_seeded && self.configure_item(id) && self.settings.persists() {
            self.persist();
        }
        id
    }

    /// Declared item.
    pub fn definition(&self, item: ItemId) -> ForgeResult<&ItemDefinition> {
        self.items
            .get(item.index())
            .ok_or(ForgeError::UnknownItem(item))
    }

    /// All declared items.
    pub fn definitions(&self) -> impl Iterator<Item = (ItemId, &ItemDefinition)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, d)| (ItemId::new(i as u32), d))
    }

    /// Register an external "recipe is active" toggle.
    pub fn register_toggle(&mut self, name: impl Into<String>, default: bool) -> ToggleId {
        self.toggles.register(name, default)
    }

    /// Current value of a toggle.
    #[must_use]
    pub fn toggle(&self, toggle: ToggleId) -> Option<bool> {
        self.toggles.value(toggle)
    }

    /// Gate a variant on a toggle.
    pub fn bind_toggle(&mut self, item: ItemId, variant: &str, toggle: ToggleId) -> ForgeResult<()> {
        let recipe = self
            .items
            .get_mut(item.index())
            .ok_or(ForgeError::UnknownItem(item))?
            .recipes
            .get_mut(variant)
            .ok_or_else(|| unknown_variant(item, variant))?;
        recipe.recipe_is_active = Some(toggle);
        self.reconcile(item, variant, OverrideField::Toggle);
        Ok(())
    }

    /// Register an external per-requirement amount.
    ///
    /// Requirements declared with `RequirementList::add_configured` read
    /// their amount from it.
    pub fn register_amount(&mut self, name: impl Into<String>, default: u32) -> AmountId {
        self.amounts.register(name, default)
    }

    /// Current value of an amount setting.
    #[must_use]
    pub fn amount(&self, amount: AmountId) -> Option<u32> {
        self.amounts.value(amount)
    }

    fn toggle_value(&self, item: ItemId, variant: &str) -> Option<bool> {
        let toggle = self.items.get(item.index())?.recipes.get(variant)?.recipe_is_active?;
        self.toggles.value(toggle)
    }

    // === Configuration ===

    /// Create override bundles for every configurable item.
    ///
    /// Bundles are seeded from persisted values where present; defaults are
    /// written for the rest. Runs once per session and returns the number of
    /// variant bundles.
    pub fn enable_configuration(&mut self) -> usize {
        if self.configuration_seeded {
            return self.overrides.bundle_count();
        }
        self.configuration_seeded = true;

        if let Some(path) = self.settings.config_path.clone() {
            match ConfigFile::load(&path) {
                Ok(file) => self.config.merge(&file),
                Err(e) => warn!("Failed to load config file {}: {}", path.display(), e),
            }
        }

        let mut dirty = false;
        for index in 0..self.items.len() {
            dirty |= self.configure_item(ItemId::new(index as u32));
        }
        if dirty && self.settings.persists() {
            self.persist();
        }

        info!(
            "Configuration enabled: {} recipe overrides for {} items",
            self.overrides.bundle_count(),
            self.items.len()
        );
        self.overrides.bundle_count()
    }

    /// Build the overrides of one item. Returns whether the config changed.
    fn configure_item(&mut self, item: ItemId) -> bool {
        if !self.settings.configuration_enabled {
            return false;
        }
        let Some(definition) = self.items.get(item.index()) else {
            return false;
        };
        if !definition.configurable {
            return false;
        }

        let section = definition.section_name();
        let mut dirty = false;
        for (key, variant) in &definition.recipes {
            let Some(mut bundle) = OverrideBundle::from_declared(definition, variant) else {
                continue;
            };
            dirty |= seed_cells(
                &mut self.config,
                &section,
                key,
                &OverrideField::VARIANT_FIELDS,
                &mut bundle,
            );
            self.overrides.insert_bundle(item, key.clone(), bundle);
        }

        let mut item_overrides = ItemOverrides::from_declared(definition);
        if !item_overrides.is_empty() {
            dirty |= seed_cells(
                &mut self.config,
                &section,
                DEFAULT_VARIANT,
                &OverrideField::ITEM_FIELDS,
                &mut item_overrides,
            );
            self.overrides.insert_item(item, item_overrides);
        }
        dirty
    }

    /// Dependent-field visibility of a variant's bundle.
    pub fn field_visibility(&self, item: ItemId, variant: &str) -> ForgeResult<FieldVisibility> {
        self.definition(item)?;
        self.overrides
            .bundle(item, variant)
            .map(OverrideBundle::visibility)
            .ok_or_else(|| unknown_variant(item, variant))
    }

    /// Current value of a field in its persisted form.
    #[must_use]
    pub fn field_value(&self, item: ItemId, variant: &str, field: OverrideField) -> Option<String> {
        if field.is_item_level() {
            self.overrides.item(item)?.value_string(field)
        } else {
            self.overrides.bundle(item, variant)?.value_string(field)
        }
    }

    /// Load a config file and apply every value that changed.
    pub fn load_config<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, ConfigError> {
        let file = ConfigFile::load(path)?;
        Ok(self.apply_config_file(&file))
    }

    /// Apply persisted values that differ from the current cells.
    ///
    /// Each change goes through `set_field`. Invalid values are logged and
    /// skipped. Returns the number of values applied.
    pub fn apply_config_file(&mut self, file: &ConfigFile) -> usize {
        let mut pending = Vec::new();
        for (index, definition) in self.items.iter().enumerate() {
            let item = ItemId::new(index as u32);
            let section = definition.section_name();

            for (variant, bundle) in self.overrides.bundles_of(item) {
                for (field, value) in
                    changed_values(file, &section, variant, &OverrideField::VARIANT_FIELDS, bundle)
                {
                    pending.push((item, variant.to_string(), field, value));
                }
            }
            if let Some(item_overrides) = self.overrides.item(item) {
                for (field, value) in changed_values(
                    file,
                    &section,
                    DEFAULT_VARIANT,
                    &OverrideField::ITEM_FIELDS,
                    item_overrides,
                ) {
                    pending.push((item, DEFAULT_VARIANT.to_string(), field, value));
                }
            }
        }

        let mut applied = 0;
        for (item, variant, field, value) in pending {
            match self.set_field(item, &variant, field, &value) {
                Ok(true) => applied += 1,
                Ok(false) => {},
                Err(e) => warn!("Ignoring persisted value: {}", e),
            }
        }
        self.config.merge_missing(file);

        info!("Applied {} changed config values", applied);
        applied
    }

    /// Save the config file to the configured path.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        match &self.settings.config_path {
            Some(path) => self.config.save(path),
            None => Ok(()),
        }
    }

    fn persist(&self) {
        if let Err(e) = self.save_config() {
            warn!("Failed to save config: {}", e);
        }
    }

    // === Materialization ===

    /// Rebuild every live recipe, drop and trade offer from scratch.
    ///
    /// Called on every catalog (re)load.
    pub fn reload(&mut self) -> &MaterializeReport {
        self.live.clear();
        let mut report = MaterializeReport::new();

        for (index, definition) in self.items.iter().enumerate() {
            let item = ItemId::new(index as u32);
            let Some(item_ref) = self.catalog.resolve_item(&definition.prefab) else {
                report.warn(ForgeError::UnresolvedItem(definition.prefab.clone()));
                continue;
            };

            for (key, variant) in &definition.recipes {
                let source = VariantSource {
                    item,
                    item_ref,
                    prefab: &definition.prefab,
                    variant_key: key,
                    variant,
                    overrides: self.overrides.bundle(item, key),
                    amounts: &self.amounts,
                    toggle: variant
                        .recipe_is_active
                        .and_then(|toggle| self.toggles.value(toggle)),
                };
                let built = materialize_variant(&self.catalog, &source, &mut report);
                if built.recipes.is_empty() {
                    continue;
                }
                let ids = self.live.insert_variant(built.recipes, built.hidden);
                self.catalog.register_recipes(&ids);
            }

            let item_overrides = self.overrides.item(item);
            let drops = match item_overrides.and_then(|o| o.drops.as_ref()) {
                Some(cell) => materialize_encoded_drops(&self.catalog, item_ref, cell.get(), &mut report),
                None => materialize_drops(&self.catalog, item_ref, &definition.drops.drops, &mut report),
            };
            if !drops.is_empty() {
                self.live.set_drops(item, drops);
            }

            let trade = item_overrides
                .and_then(|o| o.trader.as_ref())
                .map(TraderOverrides::current)
                .or_else(|| definition.trade.clone());
            if let Some(trade) = trade {
                self.live.set_trade_offer(item, materialize_trade(item_ref, &trade));
            }
        }

        info!(
            "Materialized {} recipes ({} hidden) and {} drops with {} warnings",
            report.recipes,
            report.hidden,
            report.drops,
            report.warnings.len()
        );
        self.report = report;
        &self.report
    }

    // === Edits ===

    /// Set any field from its persisted text form.
    ///
    /// Item-level fields ignore `variant`. Returns whether the value changed.
    pub fn set_field(
        &mut self,
        item: ItemId,
        variant: &str,
        field: OverrideField,
        raw: &str,
    ) -> ForgeResult<bool> {
        self.definition(item)?;
        let changed = if field.is_item_level() {
            self.overrides
                .item_mut(item)
                .ok_or_else(|| ForgeError::InvalidValue {
                    field: field.label().to_string(),
                    value: raw.to_string(),
                })?
                .apply_str(field, raw)?
        } else {
            self.overrides
                .bundle_mut(item, variant)
                .ok_or_else(|| unknown_variant(item, variant))?
                .apply_str(field, raw)?
        };

        if changed {
            self.commit(item, variant, field);
        }
        Ok(changed)
    }

    fn update_variant(
        &mut self,
        item: ItemId,
        variant: &str,
        field: OverrideField,
        update: impl FnOnce(&mut OverrideBundle) -> bool,
    ) -> ForgeResult<bool> {
        self.definition(item)?;
        let bundle = self
            .overrides
            .bundle_mut(item, variant)
            .ok_or_else(|| unknown_variant(item, variant))?;
        let changed = update(bundle);
        if changed {
            self.commit(item, variant, field);
        }
        Ok(changed)
    }

    fn update_trader(
        &mut self,
        item: ItemId,
        field: OverrideField,
        update: impl FnOnce(&mut TraderOverrides) -> bool,
    ) -> ForgeResult<bool> {
        self.definition(item)?;
        let trader = self
            .overrides
            .item_mut(item)
            .and_then(|o| o.trader.as_mut())
            .ok_or_else(|| unknown_variant(item, DEFAULT_VARIANT))?;
        let changed = update(trader);
        if changed {
            self.commit(item, DEFAULT_VARIANT, field);
        }
        Ok(changed)
    }

    /// Change the station of the variant's first station entry.
    pub fn set_table(&mut self, item: ItemId, variant: &str, table: CraftingTable) -> ForgeResult<bool> {
        self.update_variant(item, variant, OverrideField::Table, |b| b.table.set(table))
    }

    /// Change the custom station name of the first station entry.
    pub fn set_custom_table(&mut self, item: ItemId, variant: &str, name: &str) -> ForgeResult<bool> {
        self.update_variant(item, variant, OverrideField::CustomTable, |b| {
            b.custom_table.set(name.to_string())
        })
    }

    /// Change the minimum station level of the first station entry.
    pub fn set_table_level(&mut self, item: ItemId, variant: &str, level: u32) -> ForgeResult<bool> {
        self.update_variant(item, variant, OverrideField::TableLevel, |b| b.table_level.set(level))
    }

    /// Change the station level cap. Only upgradable items have one.
    pub fn set_maximum_table_level(
        &mut self,
        item: ItemId,
        variant: &str,
        level: u32,
    ) -> ForgeResult<bool> {
        self.set_field(item, variant, OverrideField::MaximumTableLevel, &level.to_string())
    }

    /// Replace the crafting cost string.
    pub fn set_craft_costs(&mut self, item: ItemId, variant: &str, costs: &str) -> ForgeResult<bool> {
        self.update_variant(item, variant, OverrideField::CraftCosts, |b| {
            b.craft.set(costs.to_string())
        })
    }

    /// Replace the upgrade cost string. Only upgradable items have one.
    pub fn set_upgrade_costs(&mut self, item: ItemId, variant: &str, costs: &str) -> ForgeResult<bool> {
        self.set_field(item, variant, OverrideField::UpgradeCosts, costs)
    }

    /// Change the "require only one resource" flag.
    pub fn set_require_only_one(&mut self, item: ItemId, variant: &str, value: bool) -> ForgeResult<bool> {
        self.update_variant(item, variant, OverrideField::RequireOnlyOne, |b| {
            b.require_only_one.set(value)
        })
    }

    /// Change the quality result amount multiplier.
    pub fn set_quality_multiplier(
        &mut self,
        item: ItemId,
        variant: &str,
        multiplier: f32,
    ) -> ForgeResult<bool> {
        self.set_field(
            item,
            variant,
            OverrideField::QualityMultiplier,
            &multiplier.to_string(),
        )
    }

    /// Replace the drop table string of an item.
    pub fn set_drops(&mut self, item: ItemId, drops: &str) -> ForgeResult<bool> {
        self.set_field(item, DEFAULT_VARIANT, OverrideField::Drops, drops)
    }

    /// Change who sells an item.
    pub fn set_trader(&mut self, item: ItemId, trader: Trader) -> ForgeResult<bool> {
        self.update_trader(item, OverrideField::Trader, |t| t.trader.set(trader))
    }

    /// Change the trader price.
    pub fn set_trader_price(&mut self, item: ItemId, price: u32) -> ForgeResult<bool> {
        self.update_trader(item, OverrideField::TraderPrice, |t| t.price.set(price))
    }

    /// Change the items per purchase.
    pub fn set_trader_stack(&mut self, item: ItemId, stack: u32) -> ForgeResult<bool> {
        self.update_trader(item, OverrideField::TraderStack, |t| t.stack.set(stack))
    }

    /// Change the global key gating the trader offer.
    pub fn set_trader_required_global_key(&mut self, item: ItemId, key: &str) -> ForgeResult<bool> {
        self.update_trader(item, OverrideField::TraderRequiredGlobalKey, |t| {
            t.required_global_key.set(key.to_string())
        })
    }

    /// Flip an external toggle and re-evaluate every variant gated on it.
    pub fn set_toggle(&mut self, toggle: ToggleId, value: bool) -> ForgeResult<bool> {
        let cell = self
            .toggles
            .cell_mut(toggle)
            .ok_or_else(|| ForgeError::InvalidValue {
                field: OverrideField::Toggle.label().to_string(),
                value: toggle.raw().to_string(),
            })?;
        if !cell.set(value) {
            return Ok(false);
        }

        let gated: Vec<(ItemId, String)> = self
            .definitions()
            .flat_map(|(item, definition)| {
                definition
                    .recipes
                    .iter()
                    .filter(move |(_, v)| v.recipe_is_active == Some(toggle))
                    .map(move |(key, _)| (item, key.clone()))
            })
            .collect();
        for (item, variant) in gated {
            self.reconcile(item, &variant, OverrideField::Toggle);
        }
        self.request_refresh();
        Ok(true)
    }

    /// Change an external amount and patch every live recipe reading it.
    ///
    /// Variants with an override bundle take their amounts from the cost
    /// strings and are left alone.
    pub fn set_amount(&mut self, amount: AmountId, value: u32) -> ForgeResult<bool> {
        let cell = self
            .amounts
            .cell_mut(amount)
            .ok_or_else(|| ForgeError::InvalidValue {
                field: OverrideField::ResourceAmount.label().to_string(),
                value: amount.raw().to_string(),
            })?;
        if !cell.set(value) {
            return Ok(false);
        }

        let overrides = &self.overrides;
        let bound: Vec<(ItemId, String)> = self
            .definitions()
            .flat_map(|(item, definition)| {
                definition
                    .recipes
                    .iter()
                    .filter(move |(key, v)| {
                        overrides.bundle(item, key).is_none()
                            && v.required_items
                                .requirements
                                .iter()
                                .chain(&v.required_upgrade_items.requirements)
                                .any(|req| req.amount_config == Some(amount))
                    })
                    .map(move |(key, _)| (item, key.clone()))
            })
            .collect();
        for (item, variant) in bound {
            self.reconcile(item, &variant, OverrideField::ResourceAmount);
        }
        self.request_refresh();
        Ok(true)
    }

    fn commit(&mut self, item: ItemId, variant: &str, field: OverrideField) {
        let Some(section) = self.items.get(item.index()).map(ItemDefinition::section_name) else {
            return;
        };

        if let (Some(key), Some(value)) = (field.config_key(variant), self.field_value(item, variant, field)) {
            debug!("[{}] {} = {}", section, key, value);
            if self.config.set(&section, &key, value) && self.settings.persists() {
                self.persist();
            }
        }

        self.reconcile(item, variant, field);
        self.request_refresh();
    }

    fn request_refresh(&mut self) {
        if let Some(refresh) = self.refresh.as_mut() {
            refresh();
        }
    }

    /// Patch the live objects affected by a field change.
    fn reconcile(&mut self, item: ItemId, variant: &str, field: OverrideField) {
        let mut report = MaterializeReport::new();
        let toggle = self.toggle_value(item, variant);

        match field {
            OverrideField::Table | OverrideField::CustomTable | OverrideField::TableLevel => {
                let (Some(bundle), Some(id)) = (
                    self.overrides.bundle(item, variant),
                    self.live.first_for(item, variant),
                ) else {
                    return;
                };
                let table = *bundle.table.get();
                let level = *bundle.table_level.get();
                let station = resolve_station(&self.catalog, table, bundle.custom_table.get(), &mut report);
                let hidden = self.live.is_hidden(id);
                if let Some(recipe) = self.live.get_mut(id) {
                    recipe.table = table;
                    recipe.crafting_station = station;
                    recipe.min_station_level = level;
                    recipe.enabled = resolve_enabled(hidden, table, toggle);
                }
            },
            OverrideField::CraftCosts | OverrideField::UpgradeCosts | OverrideField::ResourceAmount => {
                let Some(declared) = self.items.get(item.index()).and_then(|d| d.recipes.get(variant))
                else {
                    return;
                };
                let VariantCosts { resources, hidden } = variant_costs(
                    &self.catalog,
                    declared,
                    self.overrides.bundle(item, variant),
                    &self.amounts,
                    &mut report,
                );

                for id in self.live.recipes_for(item, variant).to_vec() {
                    self.live.set_hidden(id, hidden);
                    if let Some(recipe) = self.live.get_mut(id) {
                        recipe.resources = resources.clone();
                        recipe.enabled = resolve_enabled(hidden, recipe.table, toggle);
                    }
                }
            },
            OverrideField::RequireOnlyOne | OverrideField::QualityMultiplier => {
                let Some(bundle) = self.overrides.bundle(item, variant) else {
                    return;
                };
                let only_one = *bundle.require_only_one.get();
                let multiplier = *bundle.quality_multiplier.get();
                for id in self.live.recipes_for(item, variant).to_vec() {
                    if let Some(recipe) = self.live.get_mut(id) {
                        recipe.require_only_one_ingredient = only_one;
                        recipe.quality_result_amount_multiplier = multiplier;
                    }
                }
            },
            OverrideField::MaximumTableLevel => {},
            OverrideField::Drops => {
                let Some(encoded) = self
                    .overrides
                    .item(item)
                    .and_then(|o| o.drops.as_ref())
                    .map(|cell| cell.get().clone())
                else {
                    return;
                };
                let Some(item_ref) = self
                    .items
                    .get(item.index())
                    .and_then(|d| self.catalog.resolve_item(&d.prefab))
                else {
                    return;
                };
                let drops = materialize_encoded_drops(&self.catalog, item_ref, &encoded, &mut report);
                self.live.set_drops(item, drops);
            },
            OverrideField::Trader
            | OverrideField::TraderPrice
            | OverrideField::TraderStack
            | OverrideField::TraderRequiredGlobalKey => {
                let Some(current) = self
                    .overrides
                    .item(item)
                    .and_then(|o| o.trader.as_ref())
                    .map(TraderOverrides::current)
                else {
                    return;
                };
                if let Some(offer) = self.live.trade_offer_mut(item) {
                    offer.trader = current.trader;
                    offer.price = current.price;
                    offer.stack = current.stack;
                    offer.required_global_key = current.required_global_key;
                }
            },
            OverrideField::Toggle => {
                for id in self.live.recipes_for(item, variant).to_vec() {
                    let hidden = self.live.is_hidden(id);
                    if let Some(recipe) = self.live.get_mut(id) {
                        recipe.enabled = resolve_enabled(hidden, recipe.table, toggle);
                    }
                }
            },
        }

        self.report.warnings.extend(report.warnings);
    }

    // === Queries ===

    /// Station level required to craft or upgrade a live recipe to `quality`.
    ///
    /// `max(1, min_station_level) + quality - 1`, capped by the overridden
    /// maximum level or the declared one. Quality 0 asks for one level less
    /// than the first craft.
    #[must_use]
    pub fn required_station_level(&self, recipe: LiveRecipeId, quality: u32) -> Option<u32> {
        let recipe = self.live.get(recipe)?;
        let definition = self.items.get(recipe.key.item.index())?;
        let cap = self
            .overrides
            .bundle(recipe.key.item, &recipe.key.variant)
            .and_then(OverrideBundle::maximum_level)
            .unwrap_or_else(|| definition.declared_maximum_station_level());

        let level = recipe
            .min_station_level
            .max(1)
            .saturating_add(quality)
            .saturating_sub(1);
        Some(level.min(cap))
    }

    /// Run `f` with hidden recipes suppressed, restoring them afterwards.
    pub fn enumerate_available<R>(&mut self, f: impl FnOnce(&mut VisibilityGuard<'_>) -> R) -> R {
        let mut guard = VisibilityGuard::new(&mut self.live);
        f(&mut guard)
    }

    /// Recipes the engine would currently offer.
    pub fn available_recipes(&mut self) -> Vec<LiveRecipeId> {
        self.enumerate_available(|live| live.enabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn catalog() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::with_engine_stations();
        for name in ["Wood", "Stone", "Bronze", "SwordBronze", "Torch", "Resin"] {
            catalog.add_item(name);
        }
        catalog
    }

    fn sword() -> ItemDefinition {
        let mut item = ItemDefinition::new("SwordBronze")
            .with_display_name("Bronze Sword")
            .with_max_quality(4);
        let recipe = item.default_recipe();
        recipe.crafting.add(CraftingTable::Forge, 1);
        recipe.crafting.add(CraftingTable::Workbench, 2);
        recipe.required_items.add("Bronze", 8);
        recipe.required_items.add("Wood", 2);
        recipe.required_upgrade_items.add("Bronze", 4);
        item
    }

    fn session() -> (ItemManager<MemoryCatalog>, ItemId) {
        let mut manager = ItemManager::new(catalog(), ManagerSettings::in_memory());
        let id = manager.register_item(sword());
        manager.enable_configuration();
        manager.reload();
        (manager, id)
    }

    fn first(manager: &ItemManager<MemoryCatalog>, item: ItemId) -> &crate::live::LiveRecipe {
        let id = manager.live().first_for(item, "").expect("recipe materialized");
        manager.live().get(id).expect("recipe exists")
    }

    #[test]
    fn test_enable_configuration_writes_defaults() {
        let (manager, _) = session();
        let config = manager.config_file();
        assert_eq!(config.get("Bronze Sword", "Crafting Station"), Some("Forge"));
        assert_eq!(config.get("Bronze Sword", "Crafting Costs"), Some("Bronze:8,Wood:2"));
        assert_eq!(config.get("Bronze Sword", "Upgrading Costs"), Some("Bronze:4"));
        assert_eq!(config.get("Bronze Sword", "Maximum Crafting Station Level"), Some("4"));
    }

    #[test]
    fn test_persisted_values_seed_bundles() {
        let mut persisted = ConfigFile::new();
        persisted.set("Bronze Sword", "Crafting Station", "Workbench");
        persisted.set("Bronze Sword", "Crafting Station Level", "oops");

        let mut manager = ItemManager::new(catalog(), ManagerSettings::in_memory()).with_config(persisted);
        let id = manager.register_item(sword());
        manager.enable_configuration();

        assert_eq!(manager.field_value(id, "", OverrideField::Table), Some("Workbench".to_string()));
        assert_eq!(manager.field_value(id, "", OverrideField::TableLevel), Some("1".to_string()));
        assert_eq!(manager.config_file().get("Bronze Sword", "Crafting Station Level"), Some("1"));
    }

    #[test]
    fn test_not_configurable_item_has_no_bundle() {
        let mut manager = ItemManager::new(catalog(), ManagerSettings::in_memory());
        let id = manager.register_item(sword().not_configurable());
        manager.enable_configuration();
        assert!(!manager.overrides().is_configured(id));
        assert!(manager.set_table(id, "", CraftingTable::Workbench).is_err());
    }

    #[test]
    fn test_global_switch_disables_bundles() {
        let settings = ManagerSettings {
            configuration_enabled: false,
            ..ManagerSettings::in_memory()
        };
        let mut manager = ItemManager::new(catalog(), settings);
        manager.register_item(sword());
        assert_eq!(manager.enable_configuration(), 0);
    }

    #[test]
    fn test_reload_materializes_every_station() {
        let (manager, id) = session();
        assert_eq!(manager.recipes_for(id, "").len(), 2);
        assert_eq!(manager.catalog().registered_recipes().len(), 2);
        assert!(manager.report().is_clean());
    }

    #[test]
    fn test_table_change_touches_first_recipe_only() {
        let (mut manager, id) = session();
        assert_eq!(manager.set_table(id, "", CraftingTable::Disabled), Ok(true));

        let ids = manager.recipes_for(id, "").to_vec();
        let primary = manager.live().get(ids[0]).expect("primary");
        let secondary = manager.live().get(ids[1]).expect("secondary");
        assert!(!primary.enabled);
        assert_eq!(primary.crafting_station, None);
        assert!(secondary.enabled);
        assert_eq!(secondary.table, CraftingTable::Workbench);
    }

    #[test]
    fn test_table_level_change() {
        let (mut manager, id) = session();
        manager.set_table_level(id, "", 3).expect("level set");
        assert_eq!(first(&manager, id).min_station_level, 3);
        assert_eq!(manager.config_file().get("Bronze Sword", "Crafting Station Level"), Some("3"));
    }

    #[test]
    fn test_same_value_is_noop() {
        let (mut manager, id) = session();
        let refreshes = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&refreshes);
        manager.set_display_refresh(move || *counter.borrow_mut() += 1);

        assert_eq!(manager.set_table(id, "", CraftingTable::Forge), Ok(false));
        assert_eq!(manager.set_craft_costs(id, "", "Bronze:8,Wood:2"), Ok(false));
        assert_eq!(*refreshes.borrow(), 0);

        assert_eq!(manager.set_table_level(id, "", 2), Ok(true));
        assert_eq!(*refreshes.borrow(), 1);
    }

    #[test]
    fn test_cost_change_updates_every_recipe() {
        let (mut manager, id) = session();
        manager.set_craft_costs(id, "", "Stone:5").expect("costs set");

        for &rid in manager.recipes_for(id, "") {
            let recipe = manager.live().get(rid).expect("recipe");
            assert_eq!(recipe.resources.len(), 2);
            assert_eq!(recipe.cost_at(1), vec![(manager.catalog().resolve_item("Stone").expect("stone"), 5)]);
        }
    }

    #[test]
    fn test_empty_costs_hide_and_restore() {
        let (mut manager, id) = session();
        manager.set_craft_costs(id, "", "").expect("costs set");
        manager.set_upgrade_costs(id, "", "").expect("costs set");
        let rid = manager.live().first_for(id, "").expect("recipe");
        assert!(manager.live().is_hidden(rid));
        assert!(!first(&manager, id).enabled);

        manager.set_craft_costs(id, "", "Wood:1").expect("costs set");
        assert!(!manager.live().is_hidden(rid));
        assert!(first(&manager, id).enabled);
    }

    #[test]
    fn test_empty_craft_costs_hide_despite_upgrades() {
        let (mut manager, id) = session();
        manager.set_craft_costs(id, "", "").expect("costs set");
        let rid = manager.live().first_for(id, "").expect("recipe");
        assert_eq!(first(&manager, id).resources.len(), 1);
        assert!(manager.live().is_hidden(rid));
        assert!(!first(&manager, id).enabled);

        manager.set_craft_costs(id, "", "NotAnItem:3").expect("costs set");
        assert!(manager.live().is_hidden(rid));
        assert!(!first(&manager, id).enabled);
    }

    #[test]
    fn test_direct_assignments() {
        let (mut manager, id) = session();
        manager.set_require_only_one(id, "", true).expect("flag set");
        manager.set_quality_multiplier(id, "", 2.5).expect("multiplier set");
        for &rid in manager.recipes_for(id, "") {
            let recipe = manager.live().get(rid).expect("recipe");
            assert!(recipe.require_only_one_ingredient);
            assert!((recipe.quality_result_amount_multiplier - 2.5).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_quality_multiplier_rejects_invalid() {
        let (mut manager, id) = session();
        assert!(matches!(
            manager.set_quality_multiplier(id, "", f32::NAN),
            Err(ForgeError::InvalidValue { .. })
        ));
        assert!(manager.set_quality_multiplier(id, "", -1.0).is_err());
        assert!(manager.set_field(id, "", OverrideField::QualityMultiplier, "NaN").is_err());
        assert_eq!(manager.config_file().get("Bronze Sword", "Quality Multiplier"), Some("1"));

        assert_eq!(manager.set_quality_multiplier(id, "", 2.0), Ok(true));
        assert_eq!(manager.set_quality_multiplier(id, "", 2.0), Ok(false));
        assert_eq!(manager.config_file().get("Bronze Sword", "Quality Multiplier"), Some("2"));
    }

    #[test]
    fn test_unknown_item_and_variant() {
        let (mut manager, id) = session();
        assert_eq!(
            manager.set_table(ItemId::new(42), "", CraftingTable::Forge),
            Err(ForgeError::UnknownItem(ItemId::new(42)))
        );
        assert!(matches!(
            manager.set_table(id, "Alt", CraftingTable::Forge),
            Err(ForgeError::UnknownVariant { .. })
        ));
        assert!(matches!(
            manager.set_field(id, "", OverrideField::TableLevel, "high"),
            Err(ForgeError::InvalidValue { .. })
        ));
        assert_eq!(first(&manager, id).min_station_level, 1);
    }

    #[test]
    fn test_required_station_level() {
        let (mut manager, id) = session();
        let rid = manager.live().first_for(id, "").expect("recipe");
        assert_eq!(manager.required_station_level(rid, 1), Some(1));
        assert_eq!(manager.required_station_level(rid, 3), Some(3));
        assert_eq!(manager.required_station_level(rid, 9), Some(4));
        assert_eq!(manager.required_station_level(rid, 0), Some(0));

        manager.set_table_level(id, "", 3).expect("level set");
        assert_eq!(manager.required_station_level(rid, 0), Some(2));
        assert_eq!(manager.required_station_level(rid, 1), Some(3));

        manager.set_maximum_table_level(id, "", 2).expect("cap set");
        assert_eq!(manager.required_station_level(rid, 3), Some(2));
    }

    #[test]
    fn test_amount_change_patches_unconfigured_item() {
        let mut manager = ItemManager::new(catalog(), ManagerSettings::in_memory());
        let amount = manager.register_amount("Bronze Sword Bronze", 8);
        let mut declared = sword().not_configurable();
        declared.default_recipe().required_items.requirements[0].amount_config = Some(amount);
        let id = manager.register_item(declared);
        manager.enable_configuration();
        manager.reload();
        let bronze = manager.catalog().resolve_item("Bronze").expect("bronze");

        assert_eq!(manager.set_amount(amount, 8), Ok(false));
        assert_eq!(manager.set_amount(amount, 12), Ok(true));
        assert_eq!(manager.amount(amount), Some(12));
        for &rid in manager.recipes_for(id, "") {
            let recipe = manager.live().get(rid).expect("recipe");
            assert_eq!(recipe.cost_at(1)[0], (bronze, 12));
        }
        assert!(manager.set_amount(AmountId::new(9), 1).is_err());
    }

    #[test]
    fn test_toggle_gates_variant() {
        let (mut manager, id) = session();
        let toggle = manager.register_toggle("Bronze Sword Enabled", true);
        manager.bind_toggle(id, "", toggle).expect("toggle bound");
        assert!(first(&manager, id).enabled);

        assert_eq!(manager.set_toggle(toggle, false), Ok(true));
        assert!(manager.recipes_for(id, "").iter().all(|&r| {
            manager.live().get(r).is_some_and(|recipe| !recipe.enabled)
        }));

        assert_eq!(manager.set_toggle(toggle, true), Ok(true));
        assert!(first(&manager, id).enabled);
    }

    #[test]
    fn test_register_after_configuration() {
        let (mut manager, _) = session();
        let mut torch = ItemDefinition::new("Torch");
        torch.default_recipe().crafting.add(CraftingTable::Inventory, 1);
        torch.default_recipe().required_items.add("Resin", 1);
        let id = manager.register_item(torch);

        assert!(manager.overrides().bundle(id, "").is_some());
        assert_eq!(manager.config_file().get("Torch", "Crafting Station"), Some("Inventory"));
    }

    #[test]
    fn test_field_visibility() {
        let (mut manager, id) = session();
        assert!(manager.field_visibility(id, "").is_ok_and(|v| !v.custom_table));
        manager.set_table(id, "", CraftingTable::Custom).expect("table set");
        assert!(manager.field_visibility(id, "").is_ok_and(|v| v.custom_table));
    }
}
