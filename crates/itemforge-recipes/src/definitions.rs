//! Item declarations from RON files.
//!
//! A declaration file is a RON list of `ItemDefinition`s:
//!
//! ```ron
//! [
//!     (
//!         prefab: "SwordBronze",
//!         display_name: Some("Bronze Sword"),
//!         max_quality: 4,
//!         recipes: {
//!             "": (
//!                 crafting: [(table: Forge, level: 1)],
//!                 required_items: (requirements: [(item_name: "Bronze", amount: 8)]),
//!             ),
//!         },
//!     ),
//! ]
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::item::ItemDefinition;

/// Errors that can occur while loading declarations.
#[derive(Debug, Error)]
pub enum DefinitionLoadError {
    /// Failed to read the file.
    #[error("Failed to read declaration file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse RON.
    #[error("Failed to parse declarations in {file}: {detail}")]
    Ron {
        /// File being parsed.
        file: PathBuf,
        /// Parser message.
        detail: String,
    },

    /// The same prefab is declared twice.
    #[error("Duplicate item declaration: {0}")]
    DuplicatePrefab(String),
}

/// Result type for declaration loading.
pub type DefinitionLoadResult<T> = Result<T, DefinitionLoadError>;

/// Parse declarations from RON text.
pub fn parse_definitions(contents: &str, file: &Path) -> DefinitionLoadResult<Vec<ItemDefinition>> {
    let items: Vec<ItemDefinition> = ron::from_str(contents).map_err(|e| DefinitionLoadError::Ron {
        file: file.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut seen = HashSet::new();
    for item in &items {
        if !seen.insert(item.prefab.as_str()) {
            return Err(DefinitionLoadError::DuplicatePrefab(item.prefab.clone()));
        }
    }

    Ok(items)
}

/// Load declarations from a RON file.
pub fn load_definitions<P: AsRef<Path>>(path: P) -> DefinitionLoadResult<Vec<ItemDefinition>> {
    let path = path.as_ref();
    debug!("Loading declarations: {:?}", path);

    let contents = fs::read_to_string(path)?;
    let items = parse_definitions(&contents, path)?;

    info!("Loaded {} item declarations from {}", items.len(), path.display());
    Ok(items)
}
