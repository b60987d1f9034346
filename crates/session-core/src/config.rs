//! Configuration for the cast core
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! [orchestrator]
//! event_channel_capacity = 512
//!
//! [discovery]
//! mode = "passive"
//! deliver_initial_snapshot = false
//!
//! [logging]
//! level = "debug"
//! json = true
//! ```

use std::path::Path;

use rcast_infra_common::logging::{log_welcome, parse_log_level, setup_logging, LoggingConfig};
use serde::{Deserialize, Serialize};

use crate::errors::{CastError, Result};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CastConfig {
    pub orchestrator: OrchestratorConfig,
    pub discovery: DiscoveryConfig,
    pub logging: LogSettings,
}

/// Session orchestrator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Capacity of the lifecycle event broadcast channel
    pub event_channel_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 256,
        }
    }
}

/// How aggressively the platform should scan for sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Request active discovery (scanning) from the platform
    #[default]
    Active,
    /// Only listen for routes the platform finds on its own
    Passive,
}

/// Sink discovery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub mode: DiscoveryMode,
    /// Post the last known sinks to a requester when it starts observing
    pub deliver_initial_snapshot: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            mode: DiscoveryMode::Active,
            deliver_initial_snapshot: true,
        }
    }
}

/// Logging settings, converted into [`LoggingConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LogSettings {
    /// Build the infra logging config for these settings
    pub fn to_logging_config(&self) -> Result<LoggingConfig> {
        let level = parse_log_level(&self.level)?;
        let mut config = LoggingConfig::new(level, "rcast");
        if self.json {
            config = config.with_json();
        }
        Ok(config)
    }
}

impl CastConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: CastConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded cast config from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Install the global tracing subscriber described by `[logging]`
    ///
    /// Fails if a subscriber is already installed.
    pub fn init_logging(&self) -> Result<()> {
        let logging = self.logging.to_logging_config()?;
        let app_name = logging.app_name.clone();
        setup_logging(logging)?;
        log_welcome(&app_name, env!("CARGO_PKG_VERSION"));
        Ok(())
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.orchestrator.event_channel_capacity == 0 {
            return Err(CastError::config(
                "orchestrator.event_channel_capacity must be greater than zero",
            ));
        }
        self.logging.to_logging_config()?;
        Ok(())
    }
}
