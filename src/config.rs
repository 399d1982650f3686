// src/config.rs

//! Configuration loading utilities.
//!
//! Lambda deployments configure the service through environment variables;
//! the CLI reads a TOML file. Both start from the same defaults.

use std::path::Path;

use crate::error::Result;
#[cfg(feature = "aws")]
use crate::models::AwsConfig;
use crate::models::AppConfig;

/// Environment variable naming an optional TOML file to start from.
pub const CONFIG_PATH_VAR: &str = "CONFIG_PATH";

/// Load configuration for the Lambda environment.
///
/// Reads `CONFIG_PATH` when set (falling back to defaults), then applies
/// environment overrides and validates the result.
pub fn from_env() -> Result<AppConfig> {
    let base = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => AppConfig::load_or_default(Path::new(&path)),
        Err(_) => AppConfig::default(),
    };

    let config = apply_overrides(base, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Load configuration from a TOML file, then apply environment overrides.
pub fn load_with_env(path: &Path) -> Result<AppConfig> {
    let config = apply_overrides(AppConfig::load_or_default(path), |key| {
        std::env::var(key).ok()
    });
    config.validate()?;
    Ok(config)
}

/// Load the shared AWS SDK configuration for the configured region.
#[cfg(feature = "aws")]
pub async fn aws_sdk_config(config: &AwsConfig) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()))
        .load()
        .await
}

/// Apply overrides from a key lookup onto a base configuration.
///
/// Unparsable numeric values are ignored and the base value kept.
pub fn apply_overrides<F>(mut config: AppConfig, lookup: F) -> AppConfig
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(region) = get("AWS_REGION") {
        config.aws.region = region;
    }

    if let Some(name) = get("TABLE_NAME") {
        config.table.name = name;
    }
    if let Some(index) = get("YEAR_INDEX") {
        config.table.year_index = Some(index);
    }
    if let Some(index) = get("TITLE_INDEX") {
        config.table.title_index = Some(index);
    }

    if let Some(bucket) = get("BUCKET_NAME") {
        config.covers.bucket = bucket;
    }
    if let Some(prefix) = get("COVER_PREFIX") {
        config.covers.prefix = prefix.trim_matches('/').to_string();
    }
    if let Some(secs) = get("COVER_WAIT_SECS").and_then(|v| v.parse().ok()) {
        config.covers.visibility_timeout_secs = secs;
    }

    if let Some(model) = get("MODEL_ID") {
        config.summary.model_id = model;
    }
    if let Some(tokens) = get("SUMMARY_MAX_TOKENS").and_then(|v| v.parse().ok()) {
        config.summary.max_tokens = tokens;
    }

    if let Some(bytes) = get("UPLOAD_MAX_BYTES").and_then(|v| v.parse().ok()) {
        config.upload.max_bytes = bytes;
    }

    config
}
