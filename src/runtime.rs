//! Runtime container.
//!
//! One `Runtime` instance is created at startup and torn down at shutdown;
//! it is the arena for every extension and the owner of every module cache.
//! Startup flows one direction (discover extensions, load caches, arm
//! barriers), shutdown the reverse (cancel barriers, unload caches in
//! reverse load order). There is no global accessor; the handle is threaded
//! through explicitly.

use crate::cache::{CacheSlot, LoadEnv, LoadedModules, ModuleCache};
use crate::config::Config;
use crate::error::{CoreResult, RuntimeError};
use crate::extension::{
    CommandInvocation, EventFlow, Extension, ExtensionKind, PacketFrame, RegistrationGuard,
    ServerEvent,
};
use crate::models::types::{ExtensionId, OwnerId};
use crate::models::key::NamespacedKey;
use crate::sched::Scheduler;
use std::sync::Arc;

/// Explicit, ordered registration list of extension constructors. Replaces
/// runtime type scanning: the bootstrap assembles this table once and hands
/// it to `Runtime::discover`.
pub type ExtensionCtor = fn() -> Box<dyn Extension>;

#[derive(Default, Clone)]
pub struct DiscoverySource {
    ctors: Vec<ExtensionCtor>,
}

impl DiscoverySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ctor: ExtensionCtor) -> Self {
        self.ctors.push(ctor);
        self
    }

    pub fn push(&mut self, ctor: ExtensionCtor) {
        self.ctors.push(ctor);
    }

    pub fn len(&self) -> usize {
        self.ctors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ctors.is_empty()
    }
}

struct ExtensionEntry {
    id: ExtensionId,
    guard: RegistrationGuard,
    ext: Box<dyn Extension>,
}

pub struct Runtime {
    id: OwnerId,
    config: Arc<Config>,
    scheduler: Arc<dyn Scheduler>,
    extensions: Vec<ExtensionEntry>,
    caches: Vec<CacheSlot>,
    load_order: Vec<NamespacedKey>,
    loaded: LoadedModules,
}

impl Runtime {
    pub fn new(config: Arc<Config>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            id: OwnerId::new(),
            config,
            scheduler,
            extensions: Vec::new(),
            caches: Vec::new(),
            load_order: Vec::new(),
            loaded: LoadedModules::new(),
        }
    }

    pub fn owner_id(&self) -> OwnerId {
        self.id
    }

    pub fn loaded_board(&self) -> &LoadedModules {
        &self.loaded
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    // ---- extensions -----------------------------------------------------

    /// Instantiates and binds every extension in the discovery list, in
    /// order. Returns how many were registered.
    pub fn discover(&mut self, source: &DiscoverySource) -> CoreResult<usize> {
        for ctor in &source.ctors {
            self.register_extension(ctor())?;
        }

        tracing::info!(count = source.len(), "extensions registered");
        Ok(source.len())
    }

    /// Binds one extension to this container and inserts it into the
    /// dispatch table. A failed bind leaves the table untouched.
    pub fn register_extension(&mut self, ext: Box<dyn Extension>) -> CoreResult<ExtensionId> {
        let mut guard = RegistrationGuard::new();
        guard.bind(self.id, ext.name())?;

        let id = ExtensionId::new();
        tracing::debug!(name = ext.name(), kind = ?ext.kind(), "extension bound");
        self.extensions.push(ExtensionEntry { id, guard, ext });
        Ok(id)
    }

    pub fn extension_count(&self) -> usize {
        self.extensions.len()
    }

    /// Owner of a bound extension; a dangling id is a lifecycle error.
    pub fn extension_owner(&self, id: ExtensionId) -> CoreResult<OwnerId> {
        let entry = self
            .extensions
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| RuntimeError::Internal(format!("no extension with id {id}")))?;
        Ok(entry.guard.owner(entry.ext.name())?)
    }

    pub fn extension_names(&self, kind: ExtensionKind) -> Vec<&'static str> {
        self.extensions
            .iter()
            .filter(|e| e.ext.kind() == kind)
            .map(|e| e.ext.name())
            .collect()
    }

    // ---- dispatch -------------------------------------------------------

    fn ordered(&self, kind: ExtensionKind) -> Vec<&ExtensionEntry> {
        let mut entries: Vec<_> = self
            .extensions
            .iter()
            .filter(|e| e.ext.kind() == kind)
            .collect();
        // stable: registration order breaks priority ties
        entries.sort_by_key(|e| e.ext.priority());
        entries
    }

    /// Delivers to listeners lowest priority first. Cancellation is a flag
    /// later handlers observe; it never stops delivery.
    pub fn dispatch_event(&self, event: &ServerEvent) -> EventFlow {
        let mut flow = EventFlow::new();
        for entry in self.ordered(ExtensionKind::Listener) {
            entry.ext.on_event(event, &mut flow);
        }
        flow
    }

    pub fn dispatch_command(&self, cmd: &CommandInvocation) -> EventFlow {
        let mut flow = EventFlow::new();
        for entry in self.ordered(ExtensionKind::Command) {
            entry.ext.on_command(cmd, &mut flow);
        }
        flow
    }

    /// Packet handlers with a non-empty whitelist only see the packet
    /// types they declared.
    pub fn dispatch_packet(&self, packet: &PacketFrame) -> EventFlow {
        let mut flow = EventFlow::new();
        for entry in self.ordered(ExtensionKind::PacketHandler) {
            let whitelist = entry.ext.packet_whitelist();
            if whitelist.is_empty() || whitelist.contains(&packet.packet_type) {
                entry.ext.on_packet(packet, &mut flow);
            }
        }
        flow
    }

    // ---- module caches --------------------------------------------------

    /// Installs a module cache, unloaded. Installation order is the
    /// default load order.
    pub fn add_module(&mut self, cache: Box<dyn ModuleCache>) -> CoreResult<()> {
        let module = cache.module().clone();
        if self.caches.iter().any(|s| *s.module() == module) {
            return Err(RuntimeError::DuplicateModule(module));
        }

        self.caches.push(CacheSlot::new(cache));
        Ok(())
    }

    pub fn cache_for(&self, module: &NamespacedKey) -> CoreResult<&CacheSlot> {
        self.caches
            .iter()
            .find(|s| s.module() == module)
            .ok_or_else(|| RuntimeError::UnknownModule(module.clone()))
    }

    pub fn cache_for_mut(&mut self, module: &NamespacedKey) -> CoreResult<&mut CacheSlot> {
        self.caches
            .iter_mut()
            .find(|s| s.module() == module)
            .ok_or_else(|| RuntimeError::UnknownModule(module.clone()))
    }

    pub fn modules(&self) -> impl Iterator<Item = &NamespacedKey> {
        self.caches.iter().map(|s| s.module())
    }

    pub fn load(&mut self, module: &NamespacedKey) -> CoreResult<()> {
        let index = self
            .caches
            .iter()
            .position(|s| s.module() == module)
            .ok_or_else(|| RuntimeError::UnknownModule(module.clone()))?;

        let env = LoadEnv {
            settings: self.config.module_settings(module),
            loaded: &self.loaded,
            scheduler: &self.scheduler,
            poll_period: self.config.poll_period(),
            stall_warn_polls: self.config.barrier_stall_warn_polls,
        };
        self.caches[index].load(&env)?;

        self.loaded.mark(module.clone());
        self.load_order.push(module.clone());
        tracing::info!(module = %module, "module loaded");
        Ok(())
    }

    /// Loads every installed module in installation order, stopping at the
    /// first failure.
    pub fn load_all(&mut self) -> CoreResult<()> {
        let modules: Vec<NamespacedKey> = self.modules().cloned().collect();
        for module in &modules {
            self.load(module)?;
        }
        Ok(())
    }

    pub fn unload(&mut self, module: &NamespacedKey) -> CoreResult<()> {
        let slot = self
            .caches
            .iter_mut()
            .find(|s| s.module() == module)
            .ok_or_else(|| RuntimeError::UnknownModule(module.clone()))?;
        slot.unload()?;

        self.loaded.unmark(module);
        self.load_order.retain(|m| m != module);
        tracing::info!(module = %module, "module unloaded");
        Ok(())
    }

    /// Cancels every outstanding barrier, then unloads loaded caches in
    /// reverse load order. Unload errors are logged, not propagated, so
    /// one bad hook cannot wedge the rest of the teardown.
    pub fn shutdown(&mut self) {
        for slot in &self.caches {
            for barrier in slot.barriers() {
                barrier.cancel();
            }
        }

        let order: Vec<NamespacedKey> = self.load_order.iter().rev().cloned().collect();
        for module in order {
            if let Err(e) = self.unload(&module) {
                tracing::error!(module = %module, error = %e, "unload failed during shutdown");
            }
        }

        tracing::info!("runtime shut down");
    }
}
