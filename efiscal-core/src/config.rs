//! Configuration management
//!
//! Settings live in `<data dir>/settings.json`:
//! ```json
//! { "maxUploadBytes": 10485760, "updateBatchSize": 50, "listLimit": 1000 }
//! ```
//! Keys this crate does not manage are kept when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::result::Error;
use crate::ports::DEFAULT_LIST_LIMIT;

/// Largest accepted upload by default (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Categorized notes written per batch by default
pub const DEFAULT_UPDATE_BATCH_SIZE: usize = 50;

pub const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_upload_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    update_batch_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    list_limit: Option<usize>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Effective configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_upload_bytes: u64,
    pub update_batch_size: usize,
    pub list_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            update_batch_size: DEFAULT_UPDATE_BATCH_SIZE,
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// `EFISCAL_MAX_UPLOAD_BYTES` and `EFISCAL_BATCH_SIZE` override the file.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;
        let defaults = Self::default();

        let config = Self {
            max_upload_bytes: env_override("EFISCAL_MAX_UPLOAD_BYTES")?
                .or(raw.max_upload_bytes)
                .unwrap_or(defaults.max_upload_bytes),
            update_batch_size: env_override("EFISCAL_BATCH_SIZE")?
                .or(raw.update_batch_size)
                .unwrap_or(defaults.update_batch_size),
            list_limit: raw.list_limit.unwrap_or(defaults.list_limit),
        };

        config.validate()?;
        Ok(config)
    }

    /// Save managed fields, preserving everything else in settings.json
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;
        settings.max_upload_bytes = Some(self.max_upload_bytes);
        settings.update_batch_size = Some(self.update_batch_size);
        settings.list_limit = Some(self.list_limit);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), content)
            .with_context(|| format!("failed to write {}", SETTINGS_FILE))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("maxUploadBytes must be greater than zero".to_string()).into());
        }
        if self.update_batch_size == 0 {
            return Err(Error::Config("updateBatchSize must be greater than zero".to_string()).into());
        }
        if self.list_limit == 0 {
            return Err(Error::Config("listLimit must be greater than zero".to_string()).into());
        }
        Ok(())
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }

    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("failed to read {}", settings_path.display()))?;
    match serde_json::from_str(&content) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable settings.json");
            Ok(SettingsFile::default())
        }
    }
}

fn env_override<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} is not a valid number: {}", name, value)).into()),
        Err(_) => Ok(None),
    }
}
