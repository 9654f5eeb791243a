//! # Itemforge Common
//!
//! Common types shared by the itemforge crates.
//!
//! This crate provides:
//! - ID types for declared items, catalog handles and live recipes
//! - The domain error type reported by the recipe engine
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;
