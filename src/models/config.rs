//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// AWS client settings
    #[serde(default)]
    pub aws: AwsConfig,

    /// Record table settings
    #[serde(default)]
    pub table: TableConfig,

    /// Cover image storage settings
    #[serde(default)]
    pub covers: CoverConfig,

    /// Summary generation settings
    #[serde(default)]
    pub summary: SummaryConfig,

    /// Multipart upload limits
    #[serde(default)]
    pub upload: UploadConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.aws.region.trim().is_empty() {
            return Err(AppError::config("aws.region is empty"));
        }
        if self.table.name.trim().is_empty() {
            return Err(AppError::config("table.name is empty"));
        }
        if self.covers.bucket.trim().is_empty() {
            return Err(AppError::config("covers.bucket is empty"));
        }
        if self.covers.visibility_timeout_secs == 0 {
            return Err(AppError::config(
                "covers.visibility_timeout_secs must be > 0",
            ));
        }
        if self.summary.model_id.trim().is_empty() {
            return Err(AppError::config("summary.model_id is empty"));
        }
        if self.summary.max_tokens <= 0 {
            return Err(AppError::config("summary.max_tokens must be > 0"));
        }
        if self.upload.max_bytes == 0 {
            return Err(AppError::config("upload.max_bytes must be > 0"));
        }
        Ok(())
    }
}

/// AWS client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Region shared by all clients and used in public cover URLs
    #[serde(default = "defaults::region")]
    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: defaults::region(),
        }
    }
}

/// Record table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name
    #[serde(default = "defaults::table_name")]
    pub name: String,

    /// Secondary index keyed by `releaseYear`; scans when unset
    #[serde(default)]
    pub year_index: Option<String>,

    /// Secondary index keyed by `titleKey`; scans when unset
    #[serde(default)]
    pub title_index: Option<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: defaults::table_name(),
            year_index: None,
            title_index: None,
        }
    }
}

/// Cover image storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverConfig {
    /// Bucket holding cover images
    #[serde(default = "defaults::bucket")]
    pub bucket: String,

    /// Key prefix for cover images
    #[serde(default = "defaults::cover_prefix")]
    pub prefix: String,

    /// Upper bound on waiting for an uploaded cover to become readable
    #[serde(default = "defaults::visibility_timeout")]
    pub visibility_timeout_secs: u64,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            bucket: defaults::bucket(),
            prefix: defaults::cover_prefix(),
            visibility_timeout_secs: defaults::visibility_timeout(),
        }
    }
}

/// Summary generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Hosted model identifier
    #[serde(default = "defaults::model_id")]
    pub model_id: String,

    /// Maximum output tokens per summary
    #[serde(default = "defaults::max_tokens")]
    pub max_tokens: i32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model_id: defaults::model_id(),
            max_tokens: defaults::max_tokens(),
        }
    }
}

/// Multipart upload limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted multipart body size
    #[serde(default = "defaults::max_bytes")]
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: defaults::max_bytes(),
        }
    }
}

mod defaults {
    // AWS defaults
    pub fn region() -> String {
        "ap-south-1".into()
    }

    // Table defaults
    pub fn table_name() -> String {
        "Movies".into()
    }

    // Cover defaults
    pub fn bucket() -> String {
        "movies-api-data".into()
    }
    pub fn cover_prefix() -> String {
        "images".into()
    }
    pub fn visibility_timeout() -> u64 {
        60
    }

    // Summary defaults
    pub fn model_id() -> String {
        "anthropic.claude-3-sonnet-20240229-v1:0".into()
    }
    pub fn max_tokens() -> i32 {
        500
    }

    // Upload defaults
    pub fn max_bytes() -> u64 {
        10 << 20
    }
}
