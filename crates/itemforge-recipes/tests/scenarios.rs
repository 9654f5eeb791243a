//! End-to-end sessions against the in-memory catalog.

use itemforge_recipes::prelude::*;
use tempfile::TempDir;

// ===========================================================================
// Fixtures
// ===========================================================================

fn catalog() -> MemoryCatalog {
    let mut catalog = MemoryCatalog::with_engine_stations();
    for name in [
        "Wood", "Stone", "Bronze", "Iron", "Silver", "WolfFang", "SwordBronze", "TrophyTroll",
        "Coins", "MeadBase",
    ] {
        catalog.add_item(name);
    }
    catalog.add_creature("Troll");
    catalog.add_creature("Greydwarf");
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
    recipe.required_upgrade_items.add_at_quality("Silver", 10, 3);

    let alt = item.recipe("Cheap");
    alt.crafting.add(CraftingTable::Workbench, 1);
    alt.required_items.add("Stone", 20);
    item
}

fn trophy() -> ItemDefinition {
    let mut item = ItemDefinition::new("TrophyTroll").with_display_name("Troll Trophy");
    item.drops.add("Troll", 0.5, 1, 1);
    item.trade = Some(TraderDefinition {
        trader: Trader::Haldor,
        price: 120,
        stack: 1,
        required_global_key: String::new(),
    });
    item
}

fn session(settings: ManagerSettings) -> (ItemManager<MemoryCatalog>, ItemId, ItemId) {
    let mut manager = ItemManager::new(catalog(), settings);
    let sword = manager.register_item(sword());
    let trophy = manager.register_item(trophy());
    manager.enable_configuration();
    manager.reload();
    (manager, sword, trophy)
}

fn recipe(manager: &ItemManager<MemoryCatalog>, id: LiveRecipeId) -> &LiveRecipe {
    manager.live().get(id).expect("live recipe")
}

fn item_ref(manager: &ItemManager<MemoryCatalog>, name: &str) -> ItemRef {
    manager.catalog().resolve_item(name).expect("catalog item")
}

// ===========================================================================
// Materialization
// ===========================================================================

#[test]
fn test_variants_materialize_separately() {
    let (manager, sword, _) = session(ManagerSettings::in_memory());
    assert_eq!(manager.recipes_for(sword, "").len(), 2);
    assert_eq!(manager.recipes_for(sword, "Cheap").len(), 1);
    assert_eq!(manager.live().len(), 3);
    assert!(manager.report().is_clean());
}

#[test]
fn test_quality_tagged_upgrade_cost() {
    let (manager, sword, _) = session(ManagerSettings::in_memory());
    let first = recipe(&manager, manager.recipes_for(sword, "")[0]);
    let bronze = item_ref(&manager, "Bronze");
    let silver = item_ref(&manager, "Silver");

    assert_eq!(first.cost_at(1), vec![(bronze, 8), (item_ref(&manager, "Wood"), 2)]);
    assert_eq!(first.cost_at(2), vec![(bronze, 4)]);
    assert_eq!(first.cost_at(3), vec![(bronze, 8), (silver, 10)]);
    assert_eq!(first.cost_at(4), vec![(bronze, 12)]);
}

#[test]
fn test_empty_not_free_is_disabled() {
    let mut item = ItemDefinition::new("MeadBase");
    item.default_recipe().crafting.add(CraftingTable::Cauldron, 1);

    let mut manager = ItemManager::new(catalog(), ManagerSettings::in_memory());
    let id = manager.register_item(item);
    manager.reload();

    let rid = manager.recipes_for(id, "")[0];
    assert!(!recipe(&manager, rid).enabled);
    assert!(manager.live().is_hidden(rid));
}

#[test]
fn test_empty_free_is_enabled() {
    let mut item = ItemDefinition::new("MeadBase");
    let variant = item.default_recipe();
    variant.crafting.add(CraftingTable::Cauldron, 1);
    variant.required_items.free = true;

    let mut manager = ItemManager::new(catalog(), ManagerSettings::in_memory());
    let id = manager.register_item(item);
    manager.reload();

    let rid = manager.recipes_for(id, "")[0];
    assert!(recipe(&manager, rid).enabled);
    assert!(recipe(&manager, rid).resources.is_empty());
    assert!(!manager.live().is_hidden(rid));
}

#[test]
fn test_hidden_recipe_shown_by_toggle() {
    let mut item = ItemDefinition::new("MeadBase");
    item.default_recipe().crafting.add(CraftingTable::Cauldron, 1);

    let mut manager = ItemManager::new(catalog(), ManagerSettings::in_memory());
    let id = manager.register_item(item);
    let toggle = manager.register_toggle("Mead Base Active", true);
    manager.bind_toggle(id, "", toggle).expect("toggle bound");
    manager.reload();

    let rid = manager.recipes_for(id, "")[0];
    assert!(recipe(&manager, rid).enabled);
    assert!(manager.available_recipes().is_empty());
    assert!(recipe(&manager, rid).enabled);
}

#[test]
fn test_upgrade_only_costs_stay_hidden() {
    for configured in [false, true] {
        let mut item = ItemDefinition::new("SwordBronze")
            .with_display_name("Bronze Sword")
            .with_max_quality(4);
        let variant = item.default_recipe();
        variant.crafting.add(CraftingTable::Forge, 1);
        variant.required_upgrade_items.add("Bronze", 4);

        let mut manager = ItemManager::new(catalog(), ManagerSettings::in_memory());
        let id = manager.register_item(item);
        if configured {
            manager.enable_configuration();
        }
        manager.reload();

        let rid = manager.recipes_for(id, "")[0];
        assert!(manager.live().is_hidden(rid));
        assert!(!recipe(&manager, rid).enabled);
        assert!(recipe(&manager, rid).cost_at(1).is_empty());
        assert!(manager.available_recipes().is_empty());
    }
}

#[test]
fn test_configured_amount_follows_setting() {
    let mut manager = ItemManager::new(catalog(), ManagerSettings::in_memory());
    let amount = manager.register_amount("Bronze Amount", 8);

    let mut fixed = ItemDefinition::new("SwordBronze").not_configurable();
    let variant = fixed.default_recipe();
    variant.crafting.add(CraftingTable::Forge, 1);
    variant.crafting.add(CraftingTable::Workbench, 2);
    variant.required_items.add_configured("Bronze", 6, amount);
    variant.required_items.add("Wood", 2);
    let fixed = manager.register_item(fixed);

    let mut editable = ItemDefinition::new("MeadBase").with_display_name("Mead Base");
    let variant = editable.default_recipe();
    variant.crafting.add(CraftingTable::Cauldron, 1);
    variant.required_items.add_configured("Bronze", 6, amount);
    let editable = manager.register_item(editable);

    manager.enable_configuration();
    manager.reload();
    let bronze = item_ref(&manager, "Bronze");
    let before = manager.recipes_for(fixed, "").to_vec();
    assert_eq!(recipe(&manager, before[0]).cost_at(1)[0], (bronze, 8));
    assert_eq!(manager.config_file().get("Mead Base", "Crafting Costs"), Some("Bronze:6"));

    assert_eq!(manager.set_amount(amount, 15), Ok(true));
    assert_eq!(manager.recipes_for(fixed, ""), before.as_slice());
    for &id in &before {
        assert_eq!(recipe(&manager, id).cost_at(1), vec![(bronze, 15), (item_ref(&manager, "Wood"), 2)]);
    }
    let mead = manager.recipes_for(editable, "")[0];
    assert_eq!(recipe(&manager, mead).cost_at(1), vec![(bronze, 6)]);

    manager.reload();
    let rid = manager.recipes_for(fixed, "")[0];
    assert_eq!(recipe(&manager, rid).cost_at(1)[0], (bronze, 15));
}

#[test]
fn test_unresolved_names_are_soft() {
    let mut item = ItemDefinition::new("SwordBronze");
    let variant = item.default_recipe();
    variant.crafting.add_custom("piece_runeforge", 1);
    variant.required_items.add("NotAnItem", 5);
    variant.required_items.add("Wood", 1);

    let mut manager = ItemManager::new(catalog(), ManagerSettings::in_memory());
    let id = manager.register_item(item);
    let report = manager.reload().clone();

    assert_eq!(report.warnings.len(), 2);
    let live = recipe(&manager, manager.recipes_for(id, "")[0]);
    assert_eq!(live.crafting_station, None);
    assert_eq!(live.resources.len(), 1);
    assert!(live.enabled);
}

#[test]
fn test_unknown_item_prefab_skipped() {
    let mut manager = ItemManager::new(catalog(), ManagerSettings::in_memory());
    let mut ghost = ItemDefinition::new("GhostBlade");
    ghost.default_recipe().crafting.add(CraftingTable::Forge, 1);
    let ghost = manager.register_item(ghost);
    let sword = manager.register_item(sword());
    manager.reload();

    assert!(manager.recipes_for(ghost, "").is_empty());
    assert_eq!(manager.recipes_for(sword, "").len(), 2);
}

// ===========================================================================
// Reconciliation
// ===========================================================================

#[test]
fn test_cost_edit_keeps_identity_and_station() {
    let (mut manager, sword, _) = session(ManagerSettings::in_memory());
    let before: Vec<LiveRecipeId> = manager.recipes_for(sword, "").to_vec();
    let stations: Vec<Option<StationRef>> =
        before.iter().map(|&id| recipe(&manager, id).crafting_station).collect();

    manager
        .set_craft_costs(sword, "", "Iron:120,WolfFang:20,Silver:40")
        .expect("costs set");

    assert_eq!(manager.recipes_for(sword, ""), before.as_slice());
    for (&id, station) in before.iter().zip(stations) {
        let live = recipe(&manager, id);
        assert_eq!(live.crafting_station, station);
        assert_eq!(live.cost_at(1).len(), 3);
    }
}

#[test]
fn test_station_edit_only_first_recipe() {
    let (mut manager, sword, _) = session(ManagerSettings::in_memory());
    let ids = manager.recipes_for(sword, "").to_vec();
    let second_before = recipe(&manager, ids[1]).clone();

    manager
        .set_table(sword, "", CraftingTable::BlackForge)
        .expect("table set");
    manager.set_table_level(sword, "", 3).expect("level set");

    let first = recipe(&manager, ids[0]);
    assert_eq!(first.table, CraftingTable::BlackForge);
    assert_eq!(first.crafting_station, manager.catalog().resolve_station("blackforge"));
    assert_eq!(first.min_station_level, 3);
    assert_eq!(recipe(&manager, ids[1]), &second_before);
}

#[test]
fn test_custom_station_edit() {
    let (mut manager, sword, _) = session(ManagerSettings::in_memory());
    let runeforge = manager.catalog_mut().add_station("piece_runeforge");

    manager.set_custom_table(sword, "", "piece_runeforge").expect("name set");
    manager.set_table(sword, "", CraftingTable::Custom).expect("table set");

    let first = recipe(&manager, manager.recipes_for(sword, "")[0]);
    assert_eq!(first.crafting_station, Some(runeforge));
}

#[test]
fn test_variant_edits_are_isolated() {
    let (mut manager, sword, _) = session(ManagerSettings::in_memory());
    manager.set_craft_costs(sword, "Cheap", "Stone:5").expect("costs set");

    let cheap = recipe(&manager, manager.recipes_for(sword, "Cheap")[0]);
    assert_eq!(cheap.cost_at(1), vec![(item_ref(&manager, "Stone"), 5)]);
    let main = recipe(&manager, manager.recipes_for(sword, "")[0]);
    assert_eq!(main.cost_at(1).len(), 2);
    assert_eq!(
        manager.config_file().get("Bronze Sword", "Crafting Costs (Cheap)"),
        Some("Stone:5")
    );
}

#[test]
fn test_observers_see_edits() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let (mut manager, sword, _) = session(ManagerSettings::in_memory());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    manager
        .overrides_mut()
        .bundle_mut(sword, "")
        .expect("bundle")
        .table_level
        .subscribe(move |level| sink.borrow_mut().push(*level));

    manager.set_table_level(sword, "", 2).expect("level set");
    manager.set_table_level(sword, "", 2).expect("level set");
    manager.set_table_level(sword, "", 5).expect("level set");
    assert_eq!(seen.borrow().as_slice(), [2, 5]);
}

#[test]
fn test_drop_override_replaces_live_drops() {
    let (mut manager, _, trophy) = session(ManagerSettings::in_memory());
    let troll = manager.catalog().resolve_creature("Troll").expect("troll");
    let greydwarf = manager.catalog().resolve_creature("Greydwarf").expect("greydwarf");
    assert_eq!(manager.live().drops_for(trophy).len(), 1);

    manager
        .set_drops(trophy, "Greydwarf:0.3:1:2,Troll:1:2::0")
        .expect("drops set");

    let drops = manager.live().drops_for(trophy);
    assert_eq!(drops.len(), 2);
    assert_eq!(drops[0].creature, greydwarf);
    assert_eq!((drops[0].min, drops[0].max), (1, 2));
    assert_eq!(drops[1].creature, troll);
    assert!(!drops[1].level_multiplier);
    assert_eq!(manager.live().drops_for_creature(greydwarf).len(), 1);
}

#[test]
fn test_trader_override_edits_offer() {
    let (mut manager, _, trophy) = session(ManagerSettings::in_memory());
    manager.set_trader(trophy, Trader::Hildir).expect("trader set");
    manager.set_trader_price(trophy, 90).expect("price set");
    manager.set_trader_stack(trophy, 3).expect("stack set");
    manager
        .set_trader_required_global_key(trophy, "defeated_gdking")
        .expect("key set");

    let offer = manager.live().trade_offer(trophy).expect("offer");
    assert_eq!(offer.trader, Trader::Hildir);
    assert_eq!((offer.price, offer.stack), (90, 3));
    assert_eq!(offer.required_global_key, "defeated_gdking");
}

#[test]
fn test_reload_keeps_overrides() {
    let (mut manager, sword, _) = session(ManagerSettings::in_memory());
    manager.set_table_level(sword, "", 4).expect("level set");
    manager.set_craft_costs(sword, "", "Iron:3").expect("costs set");
    manager.catalog_mut().clear_registered();
    manager.reload();

    let first = recipe(&manager, manager.recipes_for(sword, "")[0]);
    assert_eq!(first.min_station_level, 4);
    assert_eq!(first.cost_at(1), vec![(item_ref(&manager, "Iron"), 3)]);
    assert_eq!(manager.catalog().registered_recipes().len(), 3);
}

// ===========================================================================
// Visibility
// ===========================================================================

fn hidden_session() -> (ItemManager<MemoryCatalog>, LiveRecipeId) {
    let mut item = ItemDefinition::new("MeadBase");
    item.default_recipe().crafting.add(CraftingTable::Cauldron, 1);

    let mut manager = ItemManager::new(catalog(), ManagerSettings::in_memory());
    let id = manager.register_item(item);
    let toggle = manager.register_toggle("Mead Base Active", true);
    manager.bind_toggle(id, "", toggle).expect("toggle bound");
    manager.reload();
    let rid = manager.recipes_for(id, "")[0];
    (manager, rid)
}

#[test]
fn test_guard_restores_on_error() {
    let (mut manager, rid) = hidden_session();

    let result: Result<usize, String> = manager.enumerate_available(|live| {
        let offered = live.enabled().len();
        if offered == 0 {
            return Err("nothing to craft".to_string());
        }
        Ok(offered)
    });

    assert!(result.is_err());
    assert!(recipe(&manager, rid).enabled);
}

#[test]
fn test_guard_restores_on_panic() {
    let (mut manager, rid) = hidden_session();

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        manager.enumerate_available(|_| panic!("enumeration failed"))
    }));

    assert!(outcome.is_err());
    assert!(recipe(&manager, rid).enabled);
}

#[test]
fn test_nested_guards_restore() {
    let (mut manager, rid) = hidden_session();

    manager.enumerate_available(|outer| {
        let inner = VisibilityGuard::new(outer);
        assert!(inner.get(rid).is_some_and(|r| !r.enabled));
    });

    assert!(recipe(&manager, rid).enabled);
}

// ===========================================================================
// Persistence
// ===========================================================================

#[test]
fn test_edits_write_through_to_disk() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("itemforge.cfg.toml");
    let settings = ManagerSettings {
        config_path: Some(path.clone()),
        ..ManagerSettings::default()
    };

    let (mut manager, sword, _) = session(settings);
    assert!(path.exists());

    manager.set_table_level(sword, "", 3).expect("level set");
    let on_disk = ConfigFile::load(&path).expect("Failed to load config");
    assert_eq!(on_disk.get("Bronze Sword", "Crafting Station Level"), Some("3"));
    assert_eq!(on_disk.get("Troll Trophy", "Drops from"), Some("Troll:0.5:1:"));
}

#[test]
fn test_persisted_values_survive_restart() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("itemforge.cfg.toml");
    let settings = ManagerSettings {
        config_path: Some(path.clone()),
        ..ManagerSettings::default()
    };

    {
        let (mut manager, sword, _) = session(settings.clone());
        manager.set_craft_costs(sword, "", "Iron:7").expect("costs set");
    }

    let (manager, sword, _) = session(settings);
    let first = recipe(&manager, manager.recipes_for(sword, "")[0]);
    assert_eq!(first.cost_at(1), vec![(item_ref(&manager, "Iron"), 7)]);
}

#[test]
fn test_hot_reload_applies_only_changes() {
    let (mut manager, sword, trophy) = session(ManagerSettings::in_memory());
    let refreshes = std::rc::Rc::new(std::cell::RefCell::new(0));
    let counter = std::rc::Rc::clone(&refreshes);
    manager.set_display_refresh(move || *counter.borrow_mut() += 1);

    let mut edited = manager.config_file().clone();
    edited.set("Bronze Sword", "Crafting Station", "Workbench");
    edited.set("Troll Trophy", "Trader Price", "75");
    edited.set("Troll Trophy", "Trader Stack", "many");

    assert_eq!(manager.apply_config_file(&edited), 2);
    assert_eq!(*refreshes.borrow(), 2);
    assert_eq!(recipe(&manager, manager.recipes_for(sword, "")[0]).table, CraftingTable::Workbench);
    assert_eq!(manager.live().trade_offer(trophy).map(|o| o.price), Some(75));
    assert_eq!(manager.live().trade_offer(trophy).map(|o| o.stack), Some(1));
    assert_eq!(manager.config_file().get("Troll Trophy", "Trader Stack"), Some("1"));
}

#[test]
fn test_load_config_from_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("edited.toml");
    let (mut manager, sword, _) = session(ManagerSettings::in_memory());

    let mut edited = manager.config_file().clone();
    edited.set("Bronze Sword", "Maximum Crafting Station Level", "2");
    edited.save(&path).expect("Failed to save config");

    assert_eq!(manager.load_config(&path).expect("Failed to load config"), 1);
    let rid = manager.recipes_for(sword, "")[0];
    assert_eq!(manager.required_station_level(rid, 4), Some(2));
}
