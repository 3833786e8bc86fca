//! Configuration for catalog limits.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (IPCS_MAX_TEXT_BYTES, IPCS_MAX_IMAGE_BYTES,
//!    IPCS_MAX_BINARY_BYTES, IPCS_MAX_LIVE_HANDLES, IPCS_MAX_PINNED_BYTES)
//! 2. Config file (.ipcs/config.yaml)
//! 3. Defaults (5MB text, 10MB image, 50MB video/file, no handle caps)
//!
//! Config file discovery:
//! - Searches current directory and parents for .ipcs/config.yaml
//! - Falls back to ~/.ipcs/config.yaml

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::resources::ResourceLimits;
use crate::core::validation::ValidationLimits;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub limits: Option<LimitsConfig>,
    #[serde(default)]
    pub resources: Option<ResourceLimits>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitsConfig {
    pub max_text_bytes: Option<u64>,
    pub max_image_bytes: Option<u64>,
    pub max_binary_bytes: Option<u64>,
}

/// Resolved configuration
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedConfig {
    /// Validation size ceilings
    pub validation: ValidationLimits,
    /// Handle table caps
    pub resources: ResourceLimits,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".ipcs").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let home_config = dirs::home_dir()?.join(".ipcs").join("config.yaml");
    home_config.exists().then_some(home_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Read a numeric environment override
fn env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("Invalid value for {}: {}", name, value)),
        Err(_) => Ok(None),
    }
}

/// Combine a parsed config file (if any) with environment overrides
fn resolve(file: Option<ConfigFile>, config_file: Option<PathBuf>) -> Result<ResolvedConfig> {
    let defaults = ValidationLimits::default();
    let limits = file
        .as_ref()
        .and_then(|f| f.limits.clone())
        .unwrap_or_default();
    let mut resources = file.and_then(|f| f.resources).unwrap_or_default();

    let validation = ValidationLimits {
        max_text_bytes: env_u64("IPCS_MAX_TEXT_BYTES")?
            .or(limits.max_text_bytes)
            .unwrap_or(defaults.max_text_bytes),
        max_image_bytes: env_u64("IPCS_MAX_IMAGE_BYTES")?
            .or(limits.max_image_bytes)
            .unwrap_or(defaults.max_image_bytes),
        max_binary_bytes: env_u64("IPCS_MAX_BINARY_BYTES")?
            .or(limits.max_binary_bytes)
            .unwrap_or(defaults.max_binary_bytes),
    };

    if let Some(max) = env_u64("IPCS_MAX_LIVE_HANDLES")? {
        resources.max_live_handles = Some(max as usize);
    }
    if let Some(max) = env_u64("IPCS_MAX_PINNED_BYTES")? {
        resources.max_pinned_bytes = Some(max);
    }

    Ok(ResolvedConfig {
        validation,
        resources,
        config_file,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();
    let file = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };
    resolve(file, config_file)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
