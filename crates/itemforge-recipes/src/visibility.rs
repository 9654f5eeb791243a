//! Scoped suppression of hidden recipes.
//!
//! Hidden recipes (empty, non-free costs) can still be switched on by an
//! external toggle. While the engine enumerates what the player may craft,
//! they must not show up. `VisibilityGuard` disables them for the lifetime
//! of the guard and puts back their previous state when dropped, including
//! on early return and unwinding.

use std::ops::{Deref, DerefMut};

use itemforge_common::LiveRecipeId;

use crate::live::LiveRecipeRegistry;

/// Disables hidden recipes until dropped.
///
/// Guards nest by reborrowing through the outer guard; inner guards restore
/// first.
#[derive(Debug)]
pub struct VisibilityGuard<'a> {
    registry: &'a mut LiveRecipeRegistry,
    /// Enabled flags captured on entry.
    saved: Vec<(LiveRecipeId, bool)>,
}

impl<'a> VisibilityGuard<'a> {
    /// Disable every hidden recipe, remembering its current state.
    pub fn new(registry: &'a mut LiveRecipeRegistry) -> Self {
        let hidden: Vec<LiveRecipeId> = registry.hidden().collect();
        let mut saved = Vec::with_capacity(hidden.len());
        for id in hidden {
            if let Some(recipe) = registry.get_mut(id) {
                saved.push((id, recipe.enabled));
                recipe.enabled = false;
            }
        }
        Self { registry, saved }
    }

    /// Number of recipes this guard suppressed.
    #[must_use]
    pub fn suppressed(&self) -> usize {
        self.saved.len()
    }
}

impl Deref for VisibilityGuard<'_> {
    type Target = LiveRecipeRegistry;

    fn deref(&self) -> &Self::Target {
        self.registry
    }
}

impl DerefMut for VisibilityGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.registry
    }
}

impl Drop for VisibilityGuard<'_> {
    fn drop(&mut self) {
        for (id, enabled) in self.saved.drain(..).rev() {
            if let Some(recipe) = self.registry.get_mut(id) {
                recipe.enabled = enabled;
            }
        }
    }
}
