use crate::models::key::NamespacedKey;
use thiserror::Error;

pub type CoreResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by the runtime itself. Lookup misses are not errors;
/// registry getters return `Option` instead.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("unknown module: {0}")]
    UnknownModule(NamespacedKey),

    #[error("module {0} already installed")]
    DuplicateModule(NamespacedKey),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("deferred action failed: {0}")]
    DeferredAction(String),

    #[error("module {module} failed to load: {message}")]
    ModuleLoad {
        module: NamespacedKey,
        message: String,
    },

    #[error(transparent)]
    Infra(#[from] InfraError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Programmer errors in registration / load ordering. These fail fast,
/// affect only the offending call, and never corrupt registry state.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("extension {0} already registered")]
    AlreadyRegistered(&'static str),

    #[error("extension {0} not registered")]
    NotRegistered(&'static str),

    #[error("module {0} already loaded")]
    AlreadyLoaded(NamespacedKey),

    #[error("module {0} not loaded")]
    NotLoaded(NamespacedKey),
}

#[derive(Debug, Error)]
pub enum ConfigErrorKind {
    #[error("failed to read file: {0}")]
    Read(std::io::Error),

    #[error("failed to parse file: {0}")]
    Parse(toml::de::Error),

    #[error("invalid environment variable {0}: {1}")]
    InvalidEnv(String, String),
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: std::path::PathBuf,
        #[source]
        source: ConfigErrorKind,
    },

    #[error("invalid environment: {0}")]
    Env(#[source] ConfigErrorKind),
}
