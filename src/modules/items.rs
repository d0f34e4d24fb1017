//! Custom items module. Same shape as blocks: dual-keyed descriptors plus
//! recipes deferred to the crafts barrier.

use crate::cache::{LoadContext, ModuleCache};
use crate::error::{CoreResult, RuntimeError};
use crate::models::key::NamespacedKey;
use crate::modules::crafts::{CraftCategory, CraftsCache, RecipeBook, RecipeEntry};
use crate::registry::DualKeyRegistry;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    pub key: NamespacedKey,
    /// Engine-native custom model data; unique per item.
    pub model_data: i32,
    pub display_name: String,
    #[serde(default)]
    pub max_stack: Option<u8>,
    #[serde(default)]
    pub ingredients: Vec<NamespacedKey>,
}

pub struct ItemsCache {
    module: NamespacedKey,
    registry: DualKeyRegistry<NamespacedKey, i32, Arc<ItemDescriptor>>,
    book: RecipeBook,
}

impl ItemsCache {
    pub const MODULE: &'static str = "core:items";

    pub fn new(book: RecipeBook) -> CoreResult<Self> {
        Ok(Self {
            module: Self::MODULE.parse()?,
            registry: DualKeyRegistry::new(),
            book,
        })
    }

    pub fn registry(&self) -> &DualKeyRegistry<NamespacedKey, i32, Arc<ItemDescriptor>> {
        &self.registry
    }

    pub fn by_key(&self, key: &NamespacedKey) -> Option<&Arc<ItemDescriptor>> {
        self.registry.get_by_primary(key)
    }

    pub fn by_model_data(&self, model_data: i32) -> Option<&Arc<ItemDescriptor>> {
        self.registry.get_by_secondary(&model_data)
    }

    pub fn register(&mut self, descriptor: ItemDescriptor) -> Option<Arc<ItemDescriptor>> {
        self.registry.put(
            descriptor.key.clone(),
            descriptor.model_data,
            Arc::new(descriptor),
        )
    }

    fn parse_settings(&self, settings: &toml::Table) -> CoreResult<Vec<ItemDescriptor>> {
        let Some(value) = settings.get("items") else {
            return Ok(Vec::new());
        };

        value
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| RuntimeError::ModuleLoad {
                module: self.module.clone(),
                message: e.to_string(),
            })
    }
}

impl ModuleCache for ItemsCache {
    fn module(&self) -> &NamespacedKey {
        &self.module
    }

    fn on_load(&mut self, ctx: &mut LoadContext<'_, '_>) -> CoreResult<()> {
        let mut recipes = Vec::new();
        for descriptor in self.parse_settings(ctx.settings())? {
            if !descriptor.ingredients.is_empty() {
                recipes.push(RecipeEntry {
                    result: descriptor.key.clone(),
                    category: CraftCategory::Items,
                    ingredients: descriptor.ingredients.clone(),
                });
            }
            self.register(descriptor);
        }
        tracing::info!(count = self.registry.len(), "custom items registered");

        let barrier = ctx.barrier_for(vec![CraftsCache::MODULE.parse()?]);
        let book = self.book.clone();
        barrier.enqueue(Box::new(move || {
            book.publish(recipes);
            Ok(())
        }));

        Ok(())
    }

    fn on_unload(&mut self) -> CoreResult<()> {
        self.registry.clear();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
