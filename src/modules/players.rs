//! Player utilities module.
//!
//! Profiles are dual-keyed by account uuid and a small sequential numeric
//! id (the id players see in chat and admin commands). Ids are handed out
//! in link order and rebuilt from scratch on every load.

use crate::cache::{LoadContext, ModuleCache};
use crate::error::CoreResult;
use crate::models::key::NamespacedKey;
use crate::registry::DualKeyRegistry;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub uuid: Uuid,
    pub id: u32,
    pub nickname: String,
}

pub struct PlayersCache {
    module: NamespacedKey,
    registry: DualKeyRegistry<Uuid, u32, Arc<PlayerProfile>>,
    next_id: u32,
}

impl PlayersCache {
    pub const MODULE: &'static str = "core:players";

    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            module: Self::MODULE.parse()?,
            registry: DualKeyRegistry::new(),
            next_id: 1,
        })
    }

    /// Links a player, allocating the next numeric id. Re-linking a known
    /// uuid keeps its id and updates the nickname.
    pub fn link(&mut self, uuid: Uuid, nickname: &str) -> u32 {
        let id = match self.registry.get_by_primary(&uuid) {
            Some(profile) => profile.id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };

        self.registry.put(
            uuid,
            id,
            Arc::new(PlayerProfile {
                uuid,
                id,
                nickname: nickname.to_owned(),
            }),
        );
        id
    }

    pub fn by_uuid(&self, uuid: &Uuid) -> Option<&Arc<PlayerProfile>> {
        self.registry.get_by_primary(uuid)
    }

    pub fn by_id(&self, id: u32) -> Option<&Arc<PlayerProfile>> {
        self.registry.get_by_secondary(&id)
    }

    pub fn unlink(&mut self, uuid: &Uuid) -> Option<Arc<PlayerProfile>> {
        self.registry.remove_by_primary(uuid)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

impl ModuleCache for PlayersCache {
    fn module(&self) -> &NamespacedKey {
        &self.module
    }

    fn on_load(&mut self, _ctx: &mut LoadContext<'_, '_>) -> CoreResult<()> {
        self.registry.clear();
        self.next_id = 1;
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
    fn ids_are_sequential_and_stable() {
        let mut cache = PlayersCache::new().unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(cache.link(a, "Nova"), 1);
        assert_eq!(cache.link(b, "Ada"), 2);
        // relink keeps the id, updates the nickname
        assert_eq!(cache.link(a, "Nova2"), 1);
        assert_eq!(cache.by_id(1).unwrap().nickname, "Nova2");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn unlink_frees_both_keys() {
        let mut cache = PlayersCache::new().unwrap();
        let a = Uuid::new_v4();
        cache.link(a, "Nova");

        let removed = cache.unlink(&a).unwrap();
        assert_eq!(removed.id, 1);
        assert!(cache.by_uuid(&a).is_none());
        assert!(cache.by_id(1).is_none());
    }
}
