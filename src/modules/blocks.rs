//! Custom blocks module.
//!
//! A block descriptor is reachable by its namespaced key and by the
//! engine-native note-block state id. Crafting recipes are not registered
//! at load time: they are parked on a barrier that publishes them to the
//! crafts book once the crafts module is loaded, whatever the load order.

use crate::cache::{LoadContext, ModuleCache};
use crate::error::{CoreResult, RuntimeError};
use crate::models::key::NamespacedKey;
use crate::modules::crafts::{CraftCategory, CraftsCache, RecipeBook, RecipeEntry};
use crate::registry::DualKeyRegistry;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub key: NamespacedKey,
    /// Engine-native note-block state id; unique per block.
    pub state_id: u16,
    pub display_name: String,
    /// Recipe ingredients; empty means the block has no recipe.
    #[serde(default)]
    pub ingredients: Vec<NamespacedKey>,
}

pub struct BlocksCache {
    module: NamespacedKey,
    registry: DualKeyRegistry<NamespacedKey, u16, Arc<BlockDescriptor>>,
    book: RecipeBook,
}

impl BlocksCache {
    pub const MODULE: &'static str = "core:blocks";

    pub fn new(book: RecipeBook) -> CoreResult<Self> {
        Ok(Self {
            module: Self::MODULE.parse()?,
            registry: DualKeyRegistry::new(),
            book,
        })
    }

    pub fn registry(&self) -> &DualKeyRegistry<NamespacedKey, u16, Arc<BlockDescriptor>> {
        &self.registry
    }

    pub fn by_key(&self, key: &NamespacedKey) -> Option<&Arc<BlockDescriptor>> {
        self.registry.get_by_primary(key)
    }

    pub fn by_state(&self, state_id: u16) -> Option<&Arc<BlockDescriptor>> {
        self.registry.get_by_secondary(&state_id)
    }

    pub fn register(&mut self, descriptor: BlockDescriptor) -> Option<Arc<BlockDescriptor>> {
        self.registry.put(
            descriptor.key.clone(),
            descriptor.state_id,
            Arc::new(descriptor),
        )
    }

    fn parse_settings(&self, settings: &toml::Table) -> CoreResult<Vec<BlockDescriptor>> {
        let Some(value) = settings.get("blocks") else {
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

impl ModuleCache for BlocksCache {
    fn module(&self) -> &NamespacedKey {
        &self.module
    }

    fn on_load(&mut self, ctx: &mut LoadContext<'_, '_>) -> CoreResult<()> {
        let descriptors = self.parse_settings(ctx.settings())?;

        let mut recipes = Vec::new();
        for descriptor in descriptors {
            if !descriptor.ingredients.is_empty() {
                recipes.push(RecipeEntry {
                    result: descriptor.key.clone(),
                    category: CraftCategory::Blocks,
                    ingredients: descriptor.ingredients.clone(),
                });
            }
            self.register(descriptor);
        }
        tracing::info!(count = self.registry.len(), "custom blocks registered");

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_parse_into_descriptors() {
        let cache = BlocksCache::new(RecipeBook::new()).unwrap();
        let settings: toml::Table = toml::from_str(
            r#"
            [[blocks]]
            key = "blocks:stone_block"
            state_id = 4001
            display_name = "Stone Block"
            ingredients = ["core:stone", "core:stone"]

            [[blocks]]
            key = "blocks:oak_shelf"
            state_id = 4002
            display_name = "Oak Shelf"
            "#,
        )
        .unwrap();

        let descriptors = cache.parse_settings(&settings).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].state_id, 4001);
        assert!(descriptors[1].ingredients.is_empty());
    }

    #[test]
    fn missing_blocks_table_is_empty() {
        let cache = BlocksCache::new(RecipeBook::new()).unwrap();
        let settings = toml::Table::new();
        assert!(cache.parse_settings(&settings).unwrap().is_empty());
    }

    #[test]
    fn register_is_dual_keyed() {
        let mut cache = BlocksCache::new(RecipeBook::new()).unwrap();
        cache.register(BlockDescriptor {
            key: "blocks:stone_block".parse().unwrap(),
            state_id: 4001,
            display_name: "Stone Block".into(),
            ingredients: Vec::new(),
        });

        let key: NamespacedKey = "blocks:stone_block".parse().unwrap();
        assert_eq!(cache.by_key(&key).unwrap().display_name, "Stone Block");
        assert!(Arc::ptr_eq(
            cache.by_key(&key).unwrap(),
            cache.by_state(4001).unwrap()
        ));
    }
}
