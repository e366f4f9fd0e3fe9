/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Application configuration.
//!
//! The expected YAML structure is:
//! ```yaml
//! kvdb_path: /var/lib/dialclock/store.yaml
//! clock_period_ms: 2000
//! watchdog_timeout_s: 10
//! auto_shutdown_s: 300
//! long_press_ms: 1000
//! ```
//! Every field is optional; missing values fall back to their defaults, and
//! a missing file falls back to the full default configuration with a
//! warning.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backing file of the key/value store.
    pub kvdb_path: PathBuf,
    /// Period of the clock snapshot broadcast.
    pub clock_period_ms: u32,
    pub watchdog_timeout_s: u32,
    /// Idle seconds before the appliance powers itself down.
    pub auto_shutdown_s: u32,
    /// Hold duration that turns a press into a long press.
    pub long_press_ms: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            kvdb_path: PathBuf::from("dialclock-store.yaml"),
            clock_period_ms: 2000,
            watchdog_timeout_s: 10,
            auto_shutdown_s: 300,
            long_press_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Parses `path` as YAML.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is structurally
    /// invalid YAML.
    pub fn load(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;
        info!(
            kvdb_path = %config.kvdb_path.display(),
            clock_period_ms = config.clock_period_ms,
            watchdog_timeout_s = config.watchdog_timeout_s,
            auto_shutdown_s = config.auto_shutdown_s,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Loads `path` when given, otherwise the defaults with a warning.
    pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig> {
        match path {
            Some(path) => AppConfig::load(path),
            None => {
                warn!("no configuration file provided, using default settings");
                Ok(AppConfig::default())
            }
        }
    }
}
