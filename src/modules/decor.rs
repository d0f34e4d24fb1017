//! Custom decorations module.
//!
//! Decor descriptors are dual-keyed by namespaced key and the item's
//! custom model data. Unlike blocks, decor carries no recipes; its load
//! concern is hitbox validation.

use crate::cache::{LoadContext, ModuleCache};
use crate::error::{CoreResult, RuntimeError};
use crate::models::key::NamespacedKey;
use crate::registry::DualKeyRegistry;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitboxKind {
    /// Occupies the block, players collide with it.
    Solid,
    /// Wall or floor mounted, no collision.
    Frame,
    /// Sittable; height decides the seat offset.
    Seat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecorDescriptor {
    pub key: NamespacedKey,
    /// Engine-native custom model data; unique per decoration.
    pub model_data: i32,
    pub display_name: String,
    pub hitbox: HitboxKind,
    /// Hitbox height in blocks; must be within (0.0, 8.0].
    pub height: f64,
}

pub struct DecorCache {
    module: NamespacedKey,
    registry: DualKeyRegistry<NamespacedKey, i32, Arc<DecorDescriptor>>,
}

impl DecorCache {
    pub const MODULE: &'static str = "core:decor";

    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            module: Self::MODULE.parse()?,
            registry: DualKeyRegistry::new(),
        })
    }

    pub fn registry(&self) -> &DualKeyRegistry<NamespacedKey, i32, Arc<DecorDescriptor>> {
        &self.registry
    }

    pub fn by_key(&self, key: &NamespacedKey) -> Option<&Arc<DecorDescriptor>> {
        self.registry.get_by_primary(key)
    }

    pub fn by_model_data(&self, model_data: i32) -> Option<&Arc<DecorDescriptor>> {
        self.registry.get_by_secondary(&model_data)
    }

    pub fn register(&mut self, descriptor: DecorDescriptor) -> CoreResult<()> {
        if descriptor.height <= 0.0 || descriptor.height > 8.0 {
            return Err(RuntimeError::ModuleLoad {
                module: self.module.clone(),
                message: format!(
                    "decor {} has hitbox height {}, expected (0.0, 8.0]",
                    descriptor.key, descriptor.height
                ),
            });
        }

        self.registry.put(
            descriptor.key.clone(),
            descriptor.model_data,
            Arc::new(descriptor),
        );
        Ok(())
    }

    fn parse_settings(&self, settings: &toml::Table) -> CoreResult<Vec<DecorDescriptor>> {
        let Some(value) = settings.get("decor") else {
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

impl ModuleCache for DecorCache {
    fn module(&self) -> &NamespacedKey {
        &self.module
    }

    fn on_load(&mut self, ctx: &mut LoadContext<'_, '_>) -> CoreResult<()> {
        for descriptor in self.parse_settings(ctx.settings())? {
            self.register(descriptor)?;
        }
        tracing::info!(count = self.registry.len(), "custom decor registered");
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
