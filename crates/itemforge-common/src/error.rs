//! Error types for itemforge.
//!
//! Most of these are soft: the recipe engine logs them and carries on with a
//! best-effort result. Only the setter-facing kinds (`UnknownItem`,
//! `UnknownVariant`, `InvalidValue`) are returned to callers.

use thiserror::Error;

use crate::ids::ItemId;

/// Domain error type for recipe configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForgeError {
    /// Item name has no catalog entry
    #[error("The required item '{0}' does not exist")]
    UnresolvedItem(String),

    /// Station name has no catalog entry
    #[error("Crafting station '{0}' does not exist")]
    UnresolvedStation(String),

    /// Creature name has no catalog entry
    #[error("Creature '{0}' does not exist")]
    UnresolvedCreature(String),

    /// A field of an encoded entry could not be parsed
    #[error("Malformed {field} '{value}' in '{entry}', using {fallback}")]
    MalformedEncoding {
        /// The full entry the field belongs to
        entry: String,
        /// Field name
        field: &'static str,
        /// Raw field text
        value: String,
        /// Value used instead
        fallback: String,
    },

    /// Item ID not registered with the manager
    #[error("Unknown item id {0}")]
    UnknownItem(ItemId),

    /// Variant has no override bundle
    #[error("Item {item} has no configurable recipe '{variant}'")]
    UnknownVariant {
        /// Item the variant was looked up on
        item: ItemId,
        /// Variant key
        variant: String,
    },

    /// A value was rejected by a setter
    #[error("Invalid value '{value}' for {field}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Rejected value
        value: String,
    },
}

/// Result type alias for itemforge operations.
pub type ForgeResult<T> = Result<T, ForgeError>;
