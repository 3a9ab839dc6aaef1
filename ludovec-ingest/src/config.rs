//! Resolved runtime configuration for the ingest service
//!
//! Built on the shared TOML loader; every field resolves environment
//! variable first, TOML file second, compiled default last.

use crate::services::catalog_client::DEFAULT_MIN_INTERVAL_MS;
use crate::services::ModelIds;
use crate::utils::RetryPolicy;
use anyhow::{anyhow, Result};
use ludovec_common::config::{load_toml_config, resolve_setting};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Target dimensionality for all stored facet vectors
pub const DEFAULT_EMBEDDING_DIM: usize = 768;

/// Fully resolved settings for one process
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub database_path: PathBuf,
    pub catalog_base_url: String,
    pub tags_base_url: String,
    pub inference_base_url: String,
    pub inference_api_key: Option<String>,
    pub embedding_dim: usize,
    pub catalog_min_interval_ms: u64,
    pub models: ModelIds,
    pub retry: RetryPolicy,
}

impl IngestConfig {
    /// Load and resolve configuration.
    ///
    /// `config_path` overrides the platform default TOML location. A missing
    /// file is fine; environment variables and defaults still apply.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let toml = load_toml_config(config_path)?;

        let database_path = resolve_setting(
            "LUDOVEC_DATABASE_PATH",
            toml.database_path.as_deref(),
            None,
        )
        .map(PathBuf::from)
        .unwrap_or_else(default_database_path);

        let catalog_base_url = resolve_setting(
            "LUDOVEC_CATALOG_BASE_URL",
            toml.catalog_base_url.as_deref(),
            Some("https://catalog.example.com/api"),
        )
        .unwrap_or_default();

        let tags_base_url = resolve_setting(
            "LUDOVEC_TAGS_BASE_URL",
            toml.tags_base_url.as_deref(),
            Some("https://tags.example.com/api"),
        )
        .unwrap_or_default();

        let inference_base_url = resolve_setting(
            "LUDOVEC_INFERENCE_BASE_URL",
            toml.inference_base_url.as_deref(),
            Some("https://inference.example.com"),
        )
        .unwrap_or_default();

        let inference_api_key = resolve_setting(
            "LUDOVEC_INFERENCE_API_KEY",
            toml.inference_api_key.as_deref(),
            None,
        );

        let embedding_dim = match resolve_setting("LUDOVEC_EMBEDDING_DIM", None, None) {
            Some(value) => value
                .parse::<usize>()
                .map_err(|_| anyhow!("LUDOVEC_EMBEDDING_DIM is not a number: {}", value))?,
            None => toml.embedding_dim.unwrap_or(DEFAULT_EMBEDDING_DIM),
        };
        if embedding_dim == 0 {
            return Err(anyhow!("embedding_dim must be positive"));
        }

        let catalog_min_interval_ms =
            match resolve_setting("LUDOVEC_CATALOG_MIN_INTERVAL_MS", None, None) {
                Some(value) => value.parse::<u64>().map_err(|_| {
                    anyhow!("LUDOVEC_CATALOG_MIN_INTERVAL_MS is not a number: {}", value)
                })?,
                None => toml
                    .catalog_min_interval_ms
                    .unwrap_or(DEFAULT_MIN_INTERVAL_MS),
            };

        let defaults = ModelIds::default();
        let models = ModelIds {
            vision: resolve_setting(
                "LUDOVEC_VISION_MODEL",
                toml.vision_model.as_deref(),
                Some(&defaults.vision),
            )
            .unwrap_or_default(),
            image_embed: resolve_setting(
                "LUDOVEC_IMAGE_EMBED_MODEL",
                toml.image_embed_model.as_deref(),
                Some(&defaults.image_embed),
            )
            .unwrap_or_default(),
            text_embed: resolve_setting(
                "LUDOVEC_TEXT_EMBED_MODEL",
                toml.text_embed_model.as_deref(),
                Some(&defaults.text_embed),
            )
            .unwrap_or_default(),
            grounded: resolve_setting(
                "LUDOVEC_GROUNDED_MODEL",
                toml.grounded_model.as_deref(),
                Some(&defaults.grounded),
            )
            .unwrap_or_default(),
        };

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: toml
                .retry_max_attempts
                .unwrap_or(retry_defaults.max_attempts),
            initial_delay: toml
                .retry_initial_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(retry_defaults.initial_delay),
            max_delay: toml
                .retry_max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(retry_defaults.max_delay),
        };

        Ok(Self {
            database_path,
            catalog_base_url,
            tags_base_url,
            inference_base_url,
            inference_api_key,
            embedding_dim,
            catalog_min_interval_ms,
            models,
            retry,
        })
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("ludovec").join("ludovec.db"))
        .unwrap_or_else(|| PathBuf::from("ludovec.db"))
}
