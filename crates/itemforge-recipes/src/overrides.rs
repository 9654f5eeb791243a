//! Runtime override layer.
//!
//! Each configurable recipe variant gets an `OverrideBundle` of notifying
//! cells seeded from its declared defaults (or persisted values). Items also
//! carry item-level cells for their drop table and trader listing. External
//! "recipe is active" toggles live in the `ToggleRegistry`, external
//! per-requirement amounts in the `AmountRegistry`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use itemforge_common::{AmountId, ForgeError, ForgeResult, ItemId, ToggleId};

use crate::config_cell::ConfigCell;
use crate::item::{ItemDefinition, RecipeVariant, Trader, TraderDefinition, DEFAULT_VARIANT};
use crate::requirements::Requirement;
use crate::station::CraftingTable;

// ============================================================================
// Fields
// ============================================================================

/// An editable override field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideField {
    /// Crafting station of the first station entry.
    Table,
    /// Custom station name of the first station entry.
    CustomTable,
    /// Minimum station level of the first station entry.
    TableLevel,
    /// Cap on the station level required to upgrade and repair.
    MaximumTableLevel,
    /// Crafting cost string.
    CraftCosts,
    /// Upgrade cost string.
    UpgradeCosts,
    /// Any single resource is enough.
    RequireOnlyOne,
    /// Result amount multiplier for higher quality crafts.
    QualityMultiplier,
    /// Drop table string of the item.
    Drops,
    /// Trader selling the item.
    Trader,
    /// Trader price.
    TraderPrice,
    /// Items per purchase.
    TraderStack,
    /// Global key gating the trader offer.
    TraderRequiredGlobalKey,
    /// External "recipe is active" toggle.
    Toggle,
    /// External amount of a single requirement.
    ResourceAmount,
}

impl OverrideField {
    /// Fields persisted per recipe variant.
    pub const VARIANT_FIELDS: [Self; 8] = [
        Self::Table,
        Self::CustomTable,
        Self::TableLevel,
        Self::MaximumTableLevel,
        Self::CraftCosts,
        Self::UpgradeCosts,
        Self::RequireOnlyOne,
        Self::QualityMultiplier,
    ];

    /// Fields persisted per item.
    pub const ITEM_FIELDS: [Self; 5] = [
        Self::Drops,
        Self::Trader,
        Self::TraderPrice,
        Self::TraderStack,
        Self::TraderRequiredGlobalKey,
    ];

    /// Configuration label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Table => "Crafting Station",
            Self::CustomTable => "Custom Crafting Station",
            Self::TableLevel => "Crafting Station Level",
            Self::MaximumTableLevel => "Maximum Crafting Station Level",
            Self::CraftCosts => "Crafting Costs",
            Self::UpgradeCosts => "Upgrading Costs",
            Self::RequireOnlyOne => "Require only one resource",
            Self::QualityMultiplier => "Quality Multiplier",
            Self::Drops => "Drops from",
            Self::Trader => "Trader Selling",
            Self::TraderPrice => "Trader Price",
            Self::TraderStack => "Trader Stack",
            Self::TraderRequiredGlobalKey => "Trader Required Global Key",
            Self::Toggle => "Recipe Active",
            Self::ResourceAmount => "Resource Amount",
        }
    }

    /// Whether the field belongs to the item rather than a variant.
    #[must_use]
    pub const fn is_item_level(self) -> bool {
        matches!(
            self,
            Self::Drops
                | Self::Trader
                | Self::TraderPrice
                | Self::TraderStack
                | Self::TraderRequiredGlobalKey
        )
    }

    /// Key in the configuration file. Toggles and resource amounts are owned
    /// externally and have none.
    #[must_use]
    pub fn config_key(self, variant: &str) -> Option<String> {
        match self {
            Self::Toggle | Self::ResourceAmount => None,
            _ if self.is_item_level() || variant == DEFAULT_VARIANT => {
                Some(self.label().to_string())
            }
            _ => Some(format!("{} ({})", self.label(), variant)),
        }
    }
}

impl fmt::Display for OverrideField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn parse_value<T: FromStr>(field: OverrideField, raw: &str) -> ForgeResult<T> {
    raw.trim().parse().map_err(|_| ForgeError::InvalidValue {
        field: field.label().to_string(),
        value: raw.to_string(),
    })
}

fn not_applicable(field: OverrideField, raw: &str) -> ForgeError {
    ForgeError::InvalidValue {
        field: field.label().to_string(),
        value: raw.to_string(),
    }
}

/// Cells addressable by `OverrideField` through their persisted form.
pub trait OverrideCells {
    /// Current value of a field in its persisted form, `None` when the
    /// field does not exist here.
    fn value_string(&self, field: OverrideField) -> Option<String>;

    /// Parse and store a persisted value. Returns whether the value changed.
    fn apply_str(&mut self, field: OverrideField, raw: &str) -> ForgeResult<bool>;
}

// ============================================================================
// Variant Bundles
// ============================================================================

/// Which fields of a bundle are currently meaningful to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldVisibility {
    /// Custom station name.
    pub custom_table: bool,
    /// Station level and maximum station level.
    pub table_level: bool,
    /// Craft and upgrade costs.
    pub costs: bool,
}

impl FieldVisibility {
    /// Visibility for the selected table.
    #[must_use]
    pub fn for_table(table: CraftingTable) -> Self {
        let active = table != CraftingTable::Disabled;
        Self {
            custom_table: table == CraftingTable::Custom,
            table_level: active,
            costs: active,
        }
    }

    /// Whether a field should be shown.
    #[must_use]
    pub const fn shows(self, field: OverrideField) -> bool {
        match field {
            OverrideField::CustomTable => self.custom_table,
            OverrideField::TableLevel | OverrideField::MaximumTableLevel => self.table_level,
            OverrideField::CraftCosts | OverrideField::UpgradeCosts => self.costs,
            _ => true,
        }
    }
}

/// User-editable values of one recipe variant.
#[derive(Debug)]
pub struct OverrideBundle {
    /// Station of the first entry.
    pub table: ConfigCell<CraftingTable>,
    /// Custom station name of the first entry.
    pub custom_table: ConfigCell<String>,
    /// Minimum level of the first entry.
    pub table_level: ConfigCell<u32>,
    /// Station level cap, only for upgradable items.
    pub maximum_table_level: Option<ConfigCell<u32>>,
    /// Crafting cost string.
    pub craft: ConfigCell<String>,
    /// Upgrade cost string, only for upgradable items.
    pub upgrade: Option<ConfigCell<String>>,
    /// Any single resource is enough.
    pub require_only_one: ConfigCell<bool>,
    /// Result amount multiplier.
    pub quality_multiplier: ConfigCell<f32>,
}

impl OverrideBundle {
    /// Bundle holding the declared defaults. `None` for variants without a
    /// station entry.
    #[must_use]
    pub fn from_declared(item: &ItemDefinition, variant: &RecipeVariant) -> Option<Self> {
        let primary = variant.crafting.primary()?;
        let upgradable = item.is_upgradable();
        let maximum_level = item.maximum_required_station_level.unwrap_or_else(|| {
            primary
                .level
                .saturating_add(item.max_quality)
                .saturating_sub(1)
        });

        Some(Self {
            table: ConfigCell::new(primary.table),
            custom_table: ConfigCell::new(primary.custom_name().to_string()),
            table_level: ConfigCell::new(primary.level),
            maximum_table_level: upgradable.then(|| ConfigCell::new(maximum_level)),
            craft: ConfigCell::new(variant.required_items.encode()),
            upgrade: upgradable.then(|| ConfigCell::new(variant.required_upgrade_items.encode())),
            require_only_one: ConfigCell::new(variant.require_only_one_ingredient),
            quality_multiplier: ConfigCell::new(variant.quality_result_amount_multiplier),
        })
    }

    /// Which fields are currently meaningful.
    #[must_use]
    pub fn visibility(&self) -> FieldVisibility {
        FieldVisibility::for_table(*self.table.get())
    }

    /// Upgrade cost string, empty when the item is not upgradable.
    #[must_use]
    pub fn upgrade_costs(&self) -> &str {
        self.upgrade.as_ref().map_or("", |cell| cell.get().as_str())
    }

    /// Overridden station level cap.
    #[must_use]
    pub fn maximum_level(&self) -> Option<u32> {
        self.maximum_table_level.as_ref().map(|cell| *cell.get())
    }
}

impl OverrideCells for OverrideBundle {
    fn value_string(&self, field: OverrideField) -> Option<String> {
        match field {
            OverrideField::Table => Some(self.table.get().to_string()),
            OverrideField::CustomTable => Some(self.custom_table.get().clone()),
            OverrideField::TableLevel => Some(self.table_level.get().to_string()),
            OverrideField::MaximumTableLevel => self.maximum_level().map(|v| v.to_string()),
            OverrideField::CraftCosts => Some(self.craft.get().clone()),
            OverrideField::UpgradeCosts => self.upgrade.as_ref().map(|cell| cell.get().clone()),
            OverrideField::RequireOnlyOne => Some(self.require_only_one.get().to_string()),
            OverrideField::QualityMultiplier => Some(self.quality_multiplier.get().to_string()),
            _ => None,
        }
    }

    fn apply_str(&mut self, field: OverrideField, raw: &str) -> ForgeResult<bool> {
        match field {
            OverrideField::Table => Ok(self.table.set(parse_value(field, raw)?)),
            OverrideField::CustomTable => Ok(self.custom_table.set(raw.to_string())),
            OverrideField::TableLevel => Ok(self.table_level.set(parse_value(field, raw)?)),
            OverrideField::MaximumTableLevel => {
                let value = parse_value(field, raw)?;
                self.maximum_table_level
                    .as_mut()
                    .map(|cell| cell.set(value))
                    .ok_or_else(|| not_applicable(field, raw))
            }
            OverrideField::CraftCosts => Ok(self.craft.set(raw.to_string())),
            OverrideField::UpgradeCosts => self
                .upgrade
                .as_mut()
                .map(|cell| cell.set(raw.to_string()))
                .ok_or_else(|| not_applicable(field, raw)),
            OverrideField::RequireOnlyOne => {
                Ok(self.require_only_one.set(parse_value(field, raw)?))
            }
            OverrideField::QualityMultiplier => {
                let value: f32 = parse_value(field, raw)?;
                if !value.is_finite() || value < 0.0 {
                    return Err(ForgeError::InvalidValue {
                        field: field.label().to_string(),
                        value: raw.to_string(),
                    });
                }
                Ok(self.quality_multiplier.set(value))
            }
            _ => Err(not_applicable(field, raw)),
        }
    }
}

// ============================================================================
// Item-level Overrides
// ============================================================================

/// User-editable trader listing.
#[derive(Debug)]
pub struct TraderOverrides {
    /// Who sells the item.
    pub trader: ConfigCell<Trader>,
    /// Price in coins.
    pub price: ConfigCell<u32>,
    /// Items per purchase.
    pub stack: ConfigCell<u32>,
    /// Global key gating the offer.
    pub required_global_key: ConfigCell<String>,
}

impl TraderOverrides {
    /// Cells holding the declared listing.
    #[must_use]
    pub fn from_declared(trade: &TraderDefinition) -> Self {
        Self {
            trader: ConfigCell::new(trade.trader),
            price: ConfigCell::new(trade.price),
            stack: ConfigCell::new(trade.stack),
            required_global_key: ConfigCell::new(trade.required_global_key.clone()),
        }
    }

    /// Current listing.
    #[must_use]
    pub fn current(&self) -> TraderDefinition {
        TraderDefinition {
            trader: *self.trader.get(),
            price: *self.price.get(),
            stack: *self.stack.get(),
            required_global_key: self.required_global_key.get().clone(),
        }
    }
}

/// User-editable item-level values.
#[derive(Debug, Default)]
pub struct ItemOverrides {
    /// Drop table string, when the item declares drops.
    pub drops: Option<ConfigCell<String>>,
    /// Trader listing, when the item declares one.
    pub trader: Option<TraderOverrides>,
}

impl ItemOverrides {
    /// Cells holding the declared drops and trader listing.
    #[must_use]
    pub fn from_declared(item: &ItemDefinition) -> Self {
        Self {
            drops: (!item.drops.is_empty()).then(|| ConfigCell::new(item.drops.encode())),
            trader: item.trade.as_ref().map(TraderOverrides::from_declared),
        }
    }

    /// Whether the item has nothing to override.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drops.is_none() && self.trader.is_none()
    }
}

impl OverrideCells for ItemOverrides {
    fn value_string(&self, field: OverrideField) -> Option<String> {
        let trader = self.trader.as_ref();
        match field {
            OverrideField::Drops => self.drops.as_ref().map(|cell| cell.get().clone()),
            OverrideField::Trader => trader.map(|t| t.trader.get().to_string()),
            OverrideField::TraderPrice => trader.map(|t| t.price.get().to_string()),
            OverrideField::TraderStack => trader.map(|t| t.stack.get().to_string()),
            OverrideField::TraderRequiredGlobalKey => {
                trader.map(|t| t.required_global_key.get().clone())
            }
            _ => None,
        }
    }

    fn apply_str(&mut self, field: OverrideField, raw: &str) -> ForgeResult<bool> {
        if field == OverrideField::Drops {
            return self
                .drops
                .as_mut()
                .map(|cell| cell.set(raw.to_string()))
                .ok_or_else(|| not_applicable(field, raw));
        }

        let trader = self
            .trader
            .as_mut()
            .ok_or_else(|| not_applicable(field, raw))?;
        match field {
            OverrideField::Trader => Ok(trader.trader.set(parse_value(field, raw)?)),
            OverrideField::TraderPrice => Ok(trader.price.set(parse_value(field, raw)?)),
            OverrideField::TraderStack => Ok(trader.stack.set(parse_value(field, raw)?)),
            OverrideField::TraderRequiredGlobalKey => {
                Ok(trader.required_global_key.set(raw.to_string()))
            }
            _ => Err(not_applicable(field, raw)),
        }
    }
}

// ============================================================================
// External Toggles
// ============================================================================

/// Registry of external "recipe is active" toggles.
#[derive(Debug, Default)]
pub struct ToggleRegistry {
    toggles: Vec<(String, ConfigCell<bool>)>,
}

impl ToggleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a toggle.
    pub fn register(&mut self, name: impl Into<String>, default: bool) -> ToggleId {
        let id = ToggleId::new(self.toggles.len() as u32);
        self.toggles.push((name.into(), ConfigCell::new(default)));
        id
    }

    /// Current value of a toggle.
    #[must_use]
    pub fn value(&self, id: ToggleId) -> Option<bool> {
        self.toggles.get(id.index()).map(|(_, cell)| *cell.get())
    }

    /// Name a toggle was registered under.
    #[must_use]
    pub fn name(&self, id: ToggleId) -> Option<&str> {
        self.toggles.get(id.index()).map(|(name, _)| name.as_str())
    }

    /// The toggle's cell.
    pub fn cell_mut(&mut self, id: ToggleId) -> Option<&mut ConfigCell<bool>> {
        self.toggles.get_mut(id.index()).map(|(_, cell)| cell)
    }

    /// Number of registered toggles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.toggles.len()
    }

    /// Check if no toggle is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.toggles.is_empty()
    }
}

// ============================================================================
// External Amounts
// ============================================================================

/// Registry of external per-requirement amounts.
///
/// Requirements declared with `amount_config` read their amount from here
/// instead of the declared value.
#[derive(Debug, Default)]
pub struct AmountRegistry {
    amounts: Vec<(String, ConfigCell<u32>)>,
}

impl AmountRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an amount setting.
    pub fn register(&mut self, name: impl Into<String>, default: u32) -> AmountId {
        let id = AmountId::new(self.amounts.len() as u32);
        self.amounts.push((name.into(), ConfigCell::new(default)));
        id
    }

    /// Current value of an amount setting.
    #[must_use]
    pub fn value(&self, id: AmountId) -> Option<u32> {
        self.amounts.get(id.index()).map(|(_, cell)| *cell.get())
    }

    /// Name an amount setting was registered under.
    #[must_use]
    pub fn name(&self, id: AmountId) -> Option<&str> {
        self.amounts.get(id.index()).map(|(name, _)| name.as_str())
    }

    /// The setting's cell.
    pub fn cell_mut(&mut self, id: AmountId) -> Option<&mut ConfigCell<u32>> {
        self.amounts.get_mut(id.index()).map(|(_, cell)| cell)
    }

    /// Requirements with every bound amount replaced by its current value.
    ///
    /// Unregistered bindings keep the declared amount.
    #[must_use]
    pub fn apply(&self, requirements: &[Requirement]) -> Vec<Requirement> {
        requirements
            .iter()
            .map(|req| {
                let mut req = req.clone();
                if let Some(amount) = req.amount_config.and_then(|id| self.value(id)) {
                    req.amount = amount;
                }
                req
            })
            .collect()
    }

    /// Number of registered amount settings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    /// Check if no amount setting is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// All override bundles of the session.
#[derive(Debug, Default)]
pub struct OverrideRegistry {
    /// Bundles by item, then by variant key.
    variants: HashMap<ItemId, BTreeMap<String, OverrideBundle>>,
    /// Item-level overrides.
    items: HashMap<ItemId, ItemOverrides>,
}

impl OverrideRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the bundle of a variant.
    pub fn insert_bundle(&mut self, item: ItemId, variant: impl Into<String>, bundle: OverrideBundle) {
        self.variants
            .entry(item)
            .or_default()
            .insert(variant.into(), bundle);
    }

    /// Store the item-level overrides of an item.
    pub fn insert_item(&mut self, item: ItemId, overrides: ItemOverrides) {
        self.items.insert(item, overrides);
    }

    /// Bundle of a variant.
    #[must_use]
    pub fn bundle(&self, item: ItemId, variant: &str) -> Option<&OverrideBundle> {
        self.variants.get(&item)?.get(variant)
    }

    /// Bundle of a variant, mutably.
    pub fn bundle_mut(&mut self, item: ItemId, variant: &str) -> Option<&mut OverrideBundle> {
        self.variants.get_mut(&item)?.get_mut(variant)
    }

    /// All bundles of an item by variant key.
    pub fn bundles_of(&self, item: ItemId) -> impl Iterator<Item = (&str, &OverrideBundle)> {
        self.variants
            .get(&item)
            .into_iter()
            .flat_map(|variants| variants.iter().map(|(k, b)| (k.as_str(), b)))
    }

    /// Item-level overrides.
    #[must_use]
    pub fn item(&self, item: ItemId) -> Option<&ItemOverrides> {
        self.items.get(&item)
    }

    /// Item-level overrides, mutably.
    pub fn item_mut(&mut self, item: ItemId) -> Option<&mut ItemOverrides> {
        self.items.get_mut(&item)
    }

    /// Whether any override exists for the item.
    #[must_use]
    pub fn is_configured(&self, item: ItemId) -> bool {
        self.variants.contains_key(&item) || self.items.contains_key(&item)
    }

    /// Number of variant bundles.
    #[must_use]
    pub fn bundle_count(&self) -> usize {
        self.variants.values().map(BTreeMap::len).sum()
    }

    /// Check if nothing is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty() && self.items.is_empty()
    }
}
