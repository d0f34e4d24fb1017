pub mod barrier;
pub mod cache;
pub mod config;
pub mod error;
pub mod extension;
pub mod models;
pub mod modules;
pub mod registry;
pub mod runtime;
pub mod sched;

// Convenient re-exports (so call sites can do `forgekit::Runtime`, etc.)
pub use barrier::DeferredBarrier;
pub use cache::{CacheSlot, LoadedModules, ModuleCache};
pub use config::Config;
pub use error::{CoreResult, LifecycleError, RuntimeError};
pub use extension::{Extension, ExtensionKind, RegistrationGuard};
pub use models::key::NamespacedKey;
pub use registry::DualKeyRegistry;
pub use runtime::{DiscoverySource, Runtime};
pub use sched::{ManualScheduler, Scheduler, TaskHandle, TokioScheduler};
