//! # Application Configuration
//!
//! Layered settings for the CLI and server:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config`, else `auditgate.toml` in the working directory
//!    when present)
//! 3. Environment overrides
//! 4. Command-line flags
//!
//! ## Environment Variables
//!
//! - `AUDITGATE_DATA_DIR`: session storage directory
//! - `AUDITGATE_BACKEND`: `file`, `redb` or `memory`
//! - `AUDITGATE_MAX_CONCURRENCY`: probes in flight at once
//! - `AUDITGATE_PROBE_TIMEOUT_MS`: per-probe timeout in milliseconds
//! - `AUDITGATE_CORS_ORIGINS`: comma-separated origins, or `*` for all

use crate::error::AppError;
use auditgate_core::{BackendKind, GatePolicy, VersionCatalog};
use auditgate_discovery::{
    DEFAULT_CACHE_TTL, DEFAULT_MAX_CONCURRENCY, DEFAULT_PROBE_TIMEOUT, DiscoveryConfig,
    ProbeRegistry,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "auditgate.toml";

pub const ENV_DATA_DIR: &str = "AUDITGATE_DATA_DIR";
pub const ENV_BACKEND: &str = "AUDITGATE_BACKEND";
pub const ENV_MAX_CONCURRENCY: &str = "AUDITGATE_MAX_CONCURRENCY";
pub const ENV_PROBE_TIMEOUT_MS: &str = "AUDITGATE_PROBE_TIMEOUT_MS";
pub const ENV_CORS_ORIGINS: &str = "AUDITGATE_CORS_ORIGINS";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendKind,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::File,
            data_dir: PathBuf::from("auditgate-data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub max_concurrency: usize,
    pub probe_timeout_ms: u64,
    pub cache_ttl_secs: u64,
    /// Replaces the built-in probe registry when present.
    pub registry: Option<ProbeRegistry>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            registry: None,
        }
    }
}

impl DiscoverySettings {
    #[must_use]
    pub fn engine_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            max_concurrency: self.max_concurrency,
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }

    #[must_use]
    pub fn registry(&self) -> ProbeRegistry {
        self.registry.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` allows localhost origins only; `["*"]` allows all.
    pub cors_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: None,
        }
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub gates: GatePolicy,
    /// Latest known releases, replacing the built-in table when given.
    pub versions: VersionCatalog,
    pub discovery: DiscoverySettings,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Parse a TOML document. Missing sections and keys take defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, AppError> {
        let config: AppConfig =
            toml::from_str(input).map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file at `path`, or `auditgate.toml` if present, or defaults.
    ///
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let metadata = std::fs::metadata(&path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(AppError::Config(format!(
                "{} exceeds {MAX_CONFIG_FILE_SIZE} bytes",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply `AUDITGATE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), AppError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get(ENV_DATA_DIR) {
            self.storage.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(backend) = get(ENV_BACKEND) {
            self.storage.backend = backend
                .parse()
                .map_err(|e| AppError::Config(format!("{ENV_BACKEND}: {e}")))?;
        }
        if let Some(value) = get(ENV_MAX_CONCURRENCY) {
            self.discovery.max_concurrency = parse_number(ENV_MAX_CONCURRENCY, &value)?;
        }
        if let Some(value) = get(ENV_PROBE_TIMEOUT_MS) {
            self.discovery.probe_timeout_ms = parse_number(ENV_PROBE_TIMEOUT_MS, &value)?;
        }
        if let Some(origins) = get(ENV_CORS_ORIGINS) {
            self.server.cors_origins = Some(
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.discovery.max_concurrency == 0 {
            return Err(AppError::Config(
                "discovery.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.discovery.probe_timeout_ms == 0 {
            return Err(AppError::Config(
                "discovery.probe_timeout_ms must be at least 1".to_string(),
            ));
        }
        if !(1..=100).contains(&self.gates.coverage_percent) {
            return Err(AppError::Config(
                "gates.coverage_percent must be between 1 and 100".to_string(),
            ));
        }
        if self.gates.min_opportunities == 0 {
            return Err(AppError::Config(
                "gates.min_opportunities must be at least 1".to_string(),
            ));
        }
        if let Some((pattern, _)) = self
            .versions
            .latest
            .iter()
            .find(|(pattern, version)| pattern.trim().is_empty() || version.trim().is_empty())
        {
            return Err(AppError::Config(format!(
                "versions.latest: blank entry for '{pattern}'"
            )));
        }
        if let Some(registry) = &self.discovery.registry {
            registry.validate()?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{key}: '{value}' is not a valid number")))
}
