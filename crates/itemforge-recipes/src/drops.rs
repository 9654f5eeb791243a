//! Creature drop tables and their text encoding.
//!
//! A drop list persists as one string per item, entries joined by `,`:
//! `creature:chance:min:[max][:0]`. The max slot is left empty when it equals
//! min, and a trailing `:0` turns off level-based amount scaling. Saved
//! configuration depends on this exact shape.

use serde::{Deserialize, Serialize};

use itemforge_common::{CreatureRef, ForgeError, ItemRef};

use crate::requirements::{parse_field, ENTRY_SEPARATOR, FIELD_SEPARATOR};

/// One creature that drops the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropTarget {
    /// Catalog name of the creature.
    pub creature: String,
    /// Drop chance (0.0-1.0).
    pub chance: f32,
    /// Minimum amount dropped.
    pub min: u32,
    /// Maximum amount dropped.
    pub max: u32,
    /// Scale the amount with the creature level.
    #[serde(default = "default_level_multiplier")]
    pub level_multiplier: bool,
}

const fn default_level_multiplier() -> bool {
    true
}

impl DropTarget {
    /// Drop with level scaling enabled.
    #[must_use]
    pub fn new(creature: impl Into<String>, chance: f32, min: u32, max: u32) -> Self {
        Self {
            creature: creature.into(),
            chance,
            min,
            max,
            level_multiplier: true,
        }
    }

    /// Disable level scaling.
    #[must_use]
    pub const fn without_level_multiplier(mut self) -> Self {
        self.level_multiplier = false;
        self
    }
}

/// Declared drop table for an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DropList {
    /// Drop sources in order.
    pub drops: Vec<DropTarget>,
}

impl DropList {
    /// Add a creature drop with level scaling.
    pub fn add(&mut self, creature: impl Into<String>, chance: f32, min: u32, max: u32) {
        self.drops.push(DropTarget::new(creature, chance, min, max));
    }

    /// Check if the item drops from nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drops.is_empty()
    }

    /// Encoded form of the list.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(&self.drops)
    }
}

/// A drop attached to a resolved creature.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveDrop {
    /// Creature that drops the item.
    pub creature: CreatureRef,
    /// Dropped item.
    pub item: ItemRef,
    /// Drop chance.
    pub chance: f32,
    /// Minimum amount.
    pub min: u32,
    /// Maximum amount.
    pub max: u32,
    /// Scale with creature level.
    pub level_multiplier: bool,
}

/// Encode drops into their persisted string form.
#[must_use]
pub fn encode(drops: &[DropTarget]) -> String {
    drops
        .iter()
        .map(|d| {
            let max = if d.min == d.max {
                String::new()
            } else {
                d.max.to_string()
            };
            let scaling = if d.level_multiplier { "" } else { ":0" };
            format!("{}:{}:{}:{}{}", d.creature, d.chance, d.min, max, scaling)
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode a persisted drop string. Empty input means no drops.
#[must_use]
pub fn decode(encoded: &str) -> Vec<DropTarget> {
    decode_reporting(encoded).0
}

/// Decode a persisted drop string and report every fallback taken.
#[must_use]
pub fn decode_reporting(encoded: &str) -> (Vec<DropTarget>, Vec<ForgeError>) {
    let mut diagnostics = Vec::new();
    let drops = encoded
        .split(ENTRY_SEPARATOR)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split(FIELD_SEPARATOR).collect();
            let field = |i: usize| parts.get(i).copied();
            let chance = parse_field(entry, "chance", field(1), 1.0_f32, &mut diagnostics);
            let min = parse_field(entry, "min", field(2), 1, &mut diagnostics);
            let max = parse_field(entry, "max", field(3), min, &mut diagnostics);
            DropTarget {
                creature: parts[0].to_string(),
                chance,
                min,
                max,
                level_multiplier: field(4) != Some("0"),
            }
        })
        .collect();

    (drops, diagnostics)
}
