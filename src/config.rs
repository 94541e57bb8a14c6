//! # Bridge Configuration
//!
//! Loaded once at startup from a TOML file and read-only afterwards.
//!
//! ## Lookup Order
//! 1. Path given as first command line argument
//! 2. `SENSORBRIDGE_CONFIG` environment variable
//! 3. `<config dir>/sensorbridge/config.toml` (e.g. `~/.config` on Linux)
//!
//! ## Overrides
//! `ONLINE_TIMEOUT` (minutes) replaces `offline_timeout_minutes` when set to
//! a valid number, matching existing deployments of the bridge.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::hass::DEFAULT_MANUFACTURER;
use crate::mqtt::config::BrokerConfig;
use crate::sensors::{EntityKind, SensorType, SensorTypeCatalog};

const CONFIG_DIR: &str = "sensorbridge";
const CONFIG_FILE: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "SENSORBRIDGE_CONFIG";
pub const ONLINE_TIMEOUT_ENV: &str = "ONLINE_TIMEOUT";

fn default_offline_timeout() -> u64 {
    1
}

fn default_manufacturer() -> String {
    DEFAULT_MANUFACTURER.to_string()
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct BridgeConfig {
    pub broker: BrokerConfig,
    /// Minutes of silence before a sensor is reported offline
    #[serde(default = "default_offline_timeout")]
    pub offline_timeout_minutes: u64,
    /// Manufacturer shown on every device in the hub
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,
    #[serde(default)]
    pub sensor_types: Vec<SensorType>,
}

impl BridgeConfig {
    pub fn parse(content: &str) -> Result<Self> {
        let config: BridgeConfig =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let mut config = Self::parse(&content)?;
        config.apply_timeout_override(std::env::var(ONLINE_TIMEOUT_ENV).ok());
        Ok(config)
    }

    /// Replaces the offline timeout with a valid `ONLINE_TIMEOUT` value.
    pub fn apply_timeout_override(&mut self, value: Option<String>) {
        let Some(value) = value else {
            return;
        };
        match value.trim().parse::<u64>() {
            Ok(minutes) => {
                info!("Offline timeout set to {} min by {}", minutes, ONLINE_TIMEOUT_ENV);
                self.offline_timeout_minutes = minutes;
            }
            Err(e) => warn!(
                "Ignoring {}='{}': {}, keeping {} min",
                ONLINE_TIMEOUT_ENV, value, e, self.offline_timeout_minutes
            ),
        }
    }

    /// Rejects configurations the bridge cannot serve and warns about
    /// ambiguous ones.
    pub fn validate(&self) -> Result<()> {
        if self.broker.host.trim().is_empty() {
            return Err(eyre!("Broker host must not be empty"));
        }
        if self.sensor_types.is_empty() {
            return Err(eyre!("At least one sensor type must be configured"));
        }
        for sensor_type in &self.sensor_types {
            if sensor_type.topic.trim().is_empty() {
                return Err(eyre!("Sensor type '{}' has no topic", sensor_type.name));
            }
            if sensor_type.options.is_some()
                && (sensor_type.min.is_some() || sensor_type.max.is_some())
            {
                warn!(
                    "Sensor type '{}' sets both options and min/max, announced as {}",
                    sensor_type.name,
                    sensor_type.kind()
                );
            }
            if sensor_type.command_topic.is_none() && sensor_type.kind() != EntityKind::Sensor {
                warn!(
                    "Sensor type '{}' is a {} without command_topic, hub commands will be dropped",
                    sensor_type.name,
                    sensor_type.kind()
                );
            }
        }
        for topic in self.catalog().shared_topics() {
            warn!(
                "Several sensor types read from '{}', only the first one is used",
                topic
            );
        }
        Ok(())
    }

    pub fn catalog(&self) -> SensorTypeCatalog {
        SensorTypeCatalog::new(self.sensor_types.clone())
    }
}

/// Picks the config file from the CLI argument, the environment, or the
/// user config directory, in that order.
pub fn resolve_config_path(cli_arg: Option<String>) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    let mut path = dirs::config_dir().ok_or_else(|| eyre!("No config directory available"))?;
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    Ok(path)
}
