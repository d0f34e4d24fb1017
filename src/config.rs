use once_cell::sync::Lazy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigErrorKind, CoreResult, InfraError};
use crate::models::key::NamespacedKey;

static EMPTY_TABLE: Lazy<toml::Table> = Lazy::new(toml::Table::new);

fn env_u64(name: &str, default: u64) -> CoreResult<u64> {
    match std::env::var(name) {
        Ok(raw) => parse_env_u64(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, raw: &str) -> CoreResult<u64> {
    raw.trim().parse().map_err(|_| {
        InfraError::Env(ConfigErrorKind::InvalidEnv(
            name.to_string(),
            raw.to_string(),
        ))
        .into()
    })
}

fn default_poll_ms() -> u64 {
    500
}

fn default_stall_warn_polls() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Barrier poll cadence in milliseconds.
    #[serde(default = "default_poll_ms")]
    pub barrier_poll_ms: u64,

    /// How many stale polls between "predicate still false" warnings.
    /// 0 disables the warning; the poll itself never times out.
    #[serde(default = "default_stall_warn_polls")]
    pub barrier_stall_warn_polls: u64,

    /// Per-module settings tables, keyed by full module key,
    /// e.g. `[modules."core:blocks"]`.
    #[serde(default)]
    pub modules: toml::Table,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            barrier_poll_ms: default_poll_ms(),
            barrier_stall_warn_polls: default_stall_warn_polls(),
            modules: toml::Table::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| InfraError::Config {
            path: path.to_path_buf(),
            source: ConfigErrorKind::Read(e),
        })?;
        let cfg: Self = toml::from_str(&data).map_err(|e| InfraError::Config {
            path: path.to_path_buf(),
            source: ConfigErrorKind::Parse(e),
        })?;
        Ok(cfg)
    }

    pub fn from_env() -> CoreResult<Self> {
        let _ = dotenvy::from_filename(".env");
        let cfg = Self {
            barrier_poll_ms: env_u64("FORGEKIT_BARRIER_POLL_MS", default_poll_ms())?,
            barrier_stall_warn_polls: env_u64(
                "FORGEKIT_BARRIER_STALL_WARN_POLLS",
                default_stall_warn_polls(),
            )?,
            modules: toml::Table::new(),
        };

        Ok(cfg)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.barrier_poll_ms.max(1))
    }

    /// The settings table for `module`; empty if the config has none.
    pub fn module_settings(&self, module: &NamespacedKey) -> &toml::Table {
        self.modules
            .get(&module.to_string())
            .and_then(|v| v.as_table())
            .unwrap_or(&EMPTY_TABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;

    #[test]
    fn load_reports_a_missing_file_as_a_read_error() {
        let err = Config::load("no-such-forgekit.toml").unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Infra(InfraError::Config {
                source: ConfigErrorKind::Read(_),
                ..
            })
        ));
    }

    #[test]
    fn load_reports_bad_toml_as_a_parse_error() {
        let path = std::env::temp_dir().join(format!("forgekit-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "barrier_poll_ms = \"soon\"").unwrap();
        let err = Config::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(
            err,
            RuntimeError::Infra(InfraError::Config {
                source: ConfigErrorKind::Parse(_),
                ..
            })
        ));
    }

    #[test]
    fn non_numeric_env_value_is_rejected() {
        assert_eq!(parse_env_u64("FORGEKIT_BARRIER_POLL_MS", "250").unwrap(), 250);

        let err = parse_env_u64("FORGEKIT_BARRIER_POLL_MS", "soon").unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Infra(InfraError::Env(ConfigErrorKind::InvalidEnv(_, _)))
        ));
    }

    #[test]
    fn parses_module_tables() {
        let cfg: Config = toml::from_str(
            r#"
            barrier_poll_ms = 250

            [modules."core:blocks"]
            greedy = true
            "#,
        )
        .unwrap();

        assert_eq!(cfg.barrier_poll_ms, 250);
        assert_eq!(cfg.barrier_stall_warn_polls, 120);

        let blocks = NamespacedKey::core("blocks").unwrap();
        assert_eq!(
            cfg.module_settings(&blocks).get("greedy"),
            Some(&toml::Value::Boolean(true))
        );

        let decor = NamespacedKey::core("decor").unwrap();
        assert!(cfg.module_settings(&decor).is_empty());
    }
}
