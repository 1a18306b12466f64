//! Layered settings.
//!
//! Sources, later ones winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config PATH`, or `shipwatch.toml` if present)
//! 3. Environment variables prefixed with `SHIPWATCH`, nested keys joined
//!    by `__` (e.g. `SHIPWATCH_API__ENDPOINT`)
//!
//! Command line flags are applied on top by the binary.
//!
//! ```toml
//! [api]
//! endpoint = "http://127.0.0.1:5000"
//! timeout_secs = 30
//!
//! [dashboard]
//! default_days = 30
//! preferred_ship = "MSC CATERINA"
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::source::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};

/// File picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "shipwatch.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SHIPWATCH";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub dashboard: DashboardSettings,
}

/// Data service connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    /// Length of the default date range, ending today.
    pub default_days: u32,
    /// Ship selected when none is given.
    pub preferred_ship: Option<String>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            default_days: 30,
            preferred_ship: Some("MSC CATERINA".to_string()),
        }
    }
}

impl Settings {
    /// Load settings from an explicit file or `shipwatch.toml`, then the
    /// process environment.
    ///
    /// An explicit path must exist. The default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    /// Same as [`load`](Self::load) with a caller-supplied environment
    /// source.
    pub fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(env.prefix_separator("_").separator("__").try_parsing(true))
            .build()
            .with_context(|| match path {
                Some(path) => format!("Failed to load config from {}", path.display()),
                None => "Failed to load config".to_string(),
            })?;

        config
            .try_deserialize()
            .context("Invalid shipwatch settings")
    }
}
