//! Crafts module: the shared recipe book.
//!
//! Content modules do not push recipes directly at load time; their
//! barriers publish here once this module (and whatever else they depend
//! on) is loaded. The book handle is cloned into those modules at
//! bootstrap, so publishing never needs to reach back into the runtime.

use crate::cache::{LoadContext, ModuleCache};
use crate::error::CoreResult;
use crate::models::key::NamespacedKey;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CraftCategory {
    Blocks,
    Decor,
    Items,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeEntry {
    pub result: NamespacedKey,
    pub category: CraftCategory,
    pub ingredients: Vec<NamespacedKey>,
}

/// Clonable handle to the recipe book; clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    inner: Arc<Mutex<Vec<RecipeEntry>>>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, entries: Vec<RecipeEntry>) {
        if entries.is_empty() {
            return;
        }
        tracing::debug!(count = entries.len(), "recipes published");
        self.inner.lock().extend(entries);
    }

    pub fn entries(&self) -> Vec<RecipeEntry> {
        self.inner.lock().clone()
    }

    pub fn by_category(&self, category: CraftCategory) -> Vec<RecipeEntry> {
        self.inner
            .lock()
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

pub struct CraftsCache {
    module: NamespacedKey,
    book: RecipeBook,
}

impl CraftsCache {
    pub const MODULE: &'static str = "core:crafts";

    pub fn new(book: RecipeBook) -> CoreResult<Self> {
        Ok(Self {
            module: Self::MODULE.parse()?,
            book,
        })
    }

    pub fn book(&self) -> &RecipeBook {
        &self.book
    }
}

impl ModuleCache for CraftsCache {
    fn module(&self) -> &NamespacedKey {
        &self.module
    }

    fn on_load(&mut self, _ctx: &mut LoadContext<'_, '_>) -> CoreResult<()> {
        // The book starts empty; dependents fill it once their barriers
        // see this module on the loaded board.
        self.book.clear();
        Ok(())
    }

    fn on_unload(&mut self) -> CoreResult<()> {
        self.book.clear();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
