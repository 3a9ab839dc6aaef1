//! Configuration loading
//!
//! TOML file settings with environment variable overrides. Resolution
//! priority for every field: `LUDOVEC_*` environment variable, then the
//! TOML config file, then the compiled default.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings loaded from the TOML config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Path to the sqlite database file
    pub database_path: Option<String>,

    /// Base URL of the storefront catalog API
    pub catalog_base_url: Option<String>,

    /// Base URL of the community tag API
    pub tags_base_url: Option<String>,

    /// Base URL of the inference gateway (captioning, embeddings, search)
    pub inference_base_url: Option<String>,

    /// API key for the inference gateway
    pub inference_api_key: Option<String>,

    /// Target embedding dimensionality
    pub embedding_dim: Option<usize>,

    /// Minimum spacing between catalog API requests, in milliseconds
    pub catalog_min_interval_ms: Option<u64>,

    /// Model identifier overrides for the inference gateway
    pub vision_model: Option<String>,
    pub image_embed_model: Option<String>,
    pub text_embed_model: Option<String>,
    pub grounded_model: Option<String>,

    /// Retry policy overrides for external calls
    pub retry_max_attempts: Option<u32>,
    pub retry_initial_delay_ms: Option<u64>,
    pub retry_max_delay_ms: Option<u64>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            catalog_base_url: None,
            tags_base_url: None,
            inference_base_url: None,
            inference_api_key: None,
            embedding_dim: None,
            catalog_min_interval_ms: None,
            vision_model: None,
            image_embed_model: None,
            text_embed_model: None,
            grounded_model: None,
            retry_max_attempts: None,
            retry_initial_delay_ms: None,
            retry_max_delay_ms: None,
        }
    }
}

/// Load TOML config from an explicit path, or the platform default location
/// (`~/.config/ludovec/config.toml`) when `path` is `None`.
///
/// A missing file is not an error; it yields defaults so env variables and
/// compiled fallbacks still apply.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return Ok(TomlConfig::default()),
        },
    };

    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read config failed ({}): {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse config failed ({}): {}", path.display(), e)))?;

    tracing::info!(path = %path.display(), "Loaded TOML config");
    Ok(config)
}

/// Platform default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ludovec").join("config.toml"))
}

/// Resolve a string setting: environment variable, then TOML, then default
pub fn resolve_setting(
    env_var_name: &str,
    toml_value: Option<&str>,
    default: Option<&str>,
) -> Option<String> {
    if let Ok(value) = std::env::var(env_var_name) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }
    if let Some(value) = toml_value {
        return Some(value.to_string());
    }
    default.map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_toml_config(Some(Path::new("/nonexistent/ludovec.toml"))).unwrap();
        assert!(config.database_path.is_none());
        assert!(config.embedding_dim.is_none());
    }

    #[test]
    fn test_parse_toml_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database_path = \"/tmp/ludovec.db\"\nembedding_dim = 768\ncatalog_min_interval_ms = 2000"
        )
        .unwrap();

        let config = load_toml_config(Some(file.path())).unwrap();
        assert_eq!(config.database_path.as_deref(), Some("/tmp/ludovec.db"));
        assert_eq!(config.embedding_dim, Some(768));
        assert_eq!(config.catalog_min_interval_ms, Some(2000));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database_path = [not toml").unwrap();

        let err = load_toml_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_resolve_setting_priority() {
        // TOML beats default
        let v = resolve_setting("LUDOVEC_TEST_UNSET_VAR", Some("from-toml"), Some("fallback"));
        assert_eq!(v.as_deref(), Some("from-toml"));

        // Default when nothing else is set
        let v = resolve_setting("LUDOVEC_TEST_UNSET_VAR", None, Some("fallback"));
        assert_eq!(v.as_deref(), Some("fallback"));

        let v = resolve_setting("LUDOVEC_TEST_UNSET_VAR", None, None);
        assert!(v.is_none());
    }
}
