//! Per-module cache lifecycle.
//!
//! Each content module implements `ModuleCache`; the runtime wraps it in a
//! `CacheSlot` that enforces the `Unloaded <-> Loaded` state machine. Every
//! `on_load` rebuilds the module's registries from scratch and may arm
//! barriers through its `LoadContext`; `unload` cancels those barriers
//! before the hook runs, so a reload never leaves two live polls draining
//! overlapping queues.

use crate::barrier::{DeferredBarrier, ReadyPredicate};
use crate::error::{CoreResult, LifecycleError};
use crate::models::key::NamespacedKey;
use crate::sched::Scheduler;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Shared readiness board: which modules are currently loaded. Barrier
/// predicates read it; the container flips the flags.
#[derive(Debug, Clone, Default)]
pub struct LoadedModules {
    inner: Arc<RwLock<HashSet<NamespacedKey>>>,
}

impl LoadedModules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, module: &NamespacedKey) -> bool {
        self.inner.read().contains(module)
    }

    pub fn all_loaded<'a>(&self, modules: impl IntoIterator<Item = &'a NamespacedKey>) -> bool {
        let board = self.inner.read();
        modules.into_iter().all(|m| board.contains(m))
    }

    pub(crate) fn mark(&self, module: NamespacedKey) {
        self.inner.write().insert(module);
    }

    pub(crate) fn unmark(&self, module: &NamespacedKey) {
        self.inner.write().remove(module);
    }
}

/// What a `CacheSlot` needs from its surroundings to run `on_load`.
pub struct LoadEnv<'a> {
    /// The module's parsed settings table; empty if the config has none.
    pub settings: &'a toml::Table,
    pub loaded: &'a LoadedModules,
    pub scheduler: &'a Arc<dyn Scheduler>,
    pub poll_period: Duration,
    pub stall_warn_polls: u64,
}

/// Handed to `on_load`. Collects the barriers the hook arms so the slot
/// can cancel them on unload.
pub struct LoadContext<'a, 'e> {
    env: &'a LoadEnv<'e>,
    barriers: Vec<DeferredBarrier>,
}

impl<'a, 'e> LoadContext<'a, 'e> {
    fn new(env: &'a LoadEnv<'e>) -> Self {
        Self {
            env,
            barriers: Vec::new(),
        }
    }

    pub fn settings(&self) -> &toml::Table {
        self.env.settings
    }

    pub fn loaded(&self) -> &LoadedModules {
        self.env.loaded
    }

    /// Arms a barrier owned by this module, polled on the configured
    /// cadence. The returned clone shares state with the slot's copy.
    pub fn arm_barrier(&mut self, predicate: ReadyPredicate) -> DeferredBarrier {
        let barrier = DeferredBarrier::new();
        barrier.arm(
            self.env.scheduler.as_ref(),
            predicate,
            self.env.poll_period,
            self.env.stall_warn_polls,
        );
        self.barriers.push(barrier.clone());
        barrier
    }

    /// Barrier that fires once every module in `deps` is loaded.
    pub fn barrier_for(&mut self, deps: Vec<NamespacedKey>) -> DeferredBarrier {
        let board = self.env.loaded.clone();
        self.arm_barrier(Box::new(move || board.all_loaded(deps.iter())))
    }
}

/// A content module's registry holder.
pub trait ModuleCache: Send + Sync {
    fn module(&self) -> &NamespacedKey;

    /// Populate registries from scratch; arm any barriers this module's
    /// content depends on.
    fn on_load(&mut self, ctx: &mut LoadContext<'_, '_>) -> CoreResult<()>;

    /// Clear registries. Barriers are already cancelled by the slot.
    fn on_unload(&mut self) -> CoreResult<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Wraps a module cache with the loaded flag and the barriers its last
/// `on_load` armed.
pub struct CacheSlot {
    cache: Box<dyn ModuleCache>,
    loaded: bool,
    barriers: Vec<DeferredBarrier>,
}

impl fmt::Debug for CacheSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSlot")
            .field("module", &format_args!("{}", self.cache.module()))
            .field("loaded", &self.loaded)
            .field("barriers", &self.barriers.len())
            .finish()
    }
}

impl CacheSlot {
    pub fn new(cache: Box<dyn ModuleCache>) -> Self {
        Self {
            cache,
            loaded: false,
            barriers: Vec::new(),
        }
    }

    pub fn module(&self) -> &NamespacedKey {
        self.cache.module()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn cache(&self) -> &dyn ModuleCache {
        self.cache.as_ref()
    }

    pub fn cache_mut(&mut self) -> &mut dyn ModuleCache {
        self.cache.as_mut()
    }

    /// Typed access to the underlying cache.
    pub fn cache_as<T: 'static>(&self) -> Option<&T> {
        self.cache.as_any().downcast_ref::<T>()
    }

    pub fn barriers(&self) -> &[DeferredBarrier] {
        &self.barriers
    }

    /// Fails if already loaded. A hook error cancels any barriers the hook
    /// armed and clears the flag, so the load can be retried.
    pub fn load(&mut self, env: &LoadEnv<'_>) -> CoreResult<()> {
        if self.loaded {
            return Err(LifecycleError::AlreadyLoaded(self.module().clone()).into());
        }

        self.loaded = true;
        let mut ctx = LoadContext::new(env);
        match self.cache.on_load(&mut ctx) {
            Ok(()) => {
                self.barriers = ctx.barriers;
                tracing::debug!(module = %self.module(), barriers = self.barriers.len(), "cache loaded");
                Ok(())
            }
            Err(e) => {
                for barrier in &ctx.barriers {
                    barrier.cancel();
                }
                self.loaded = false;
                Err(e)
            }
        }
    }

    /// Fails if not loaded. Cancels owned barriers first, then runs the
    /// hook; the flag clears even if the hook errors.
    pub fn unload(&mut self) -> CoreResult<()> {
        if !self.loaded {
            return Err(LifecycleError::NotLoaded(self.module().clone()).into());
        }

        for barrier in self.barriers.drain(..) {
            barrier.cancel();
        }

        let result = self.cache.on_unload();
        self.loaded = false;
        tracing::debug!(module = %self.module(), "cache unloaded");
        result
    }
}
