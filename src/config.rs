//! Configuration model
//!
//! Mirrors the platform block of the host runtime's `config.json`: a global
//! section applied to every speaker and a list of per-accessory overrides.
//! Configuration is loaded once at start-up and never mutated afterwards.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Platform identifier expected in the `platform` field
pub const PLATFORM_NAME: &str = "SoundTouchPlugins";

/// Plugin identifier used when registering accessories with the host
pub const PLUGIN_NAME: &str = "homebridge-soundtouch-plugins";

/// Default HTTP port of the SoundTouch API
pub const DEFAULT_PORT: u16 = 8090;

/// How the speaker volume is surfaced to the host runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VolumeMode {
    None,
    #[default]
    Lightbulb,
    Speaker,
}

/// Volume settings as written in the configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeConfig {
    /// Volume applied when the speaker is switched on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_value: Option<i32>,
    /// Device volume reached when the characteristic is at 100%
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i32>,
    /// Volume restored when unmuting a silent speaker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmute_value: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<VolumeMode>,
}

/// Override for a hardware preset slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresetConfig {
    /// Hardware slot number (1-6 on most speakers)
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub enabled: bool,
}

/// Override for a hardware source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    /// Hardware source identifier, e.g. `AUX` or `BLUETOOTH`
    pub source: String,
    /// Restricts the override to one account of the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub enabled: bool,
}

/// Defaults applied to every speaker
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    /// Polling interval in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<VolumeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets: Option<Vec<PresetConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceConfig>>,
}

/// Per-accessory configuration, always the higher-precedence layer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryConfig {
    /// Display name override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Room name reported by the speaker, used to locate it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(flatten)]
    pub settings: GlobalConfig,
}

impl AccessoryConfig {
    /// Name used in error messages: the display name, else the room, else the ip
    pub fn label(&self) -> String {
        self.name
            .as_deref()
            .or(self.room.as_deref())
            .or(self.ip.as_deref())
            .unwrap_or("unnamed accessory")
            .to_string()
    }
}

/// Platform block of the host configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    pub platform: String,
    /// Expose every speaker found on the network, not only configured ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_all_accessories: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessories: Option<Vec<AccessoryConfig>>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            platform: PLATFORM_NAME.to_string(),
            discovery_all_accessories: Some(true),
            global: None,
            accessories: None,
        }
    }
}

impl PlatformConfig {
    /// Parse a platform block from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a platform block stored on its own in a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Load the platform block out of a full host `config.json`
    ///
    /// Returns `None` when the `platforms` array has no entry for this plugin.
    pub fn from_host_config_file(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let text = std::fs::read_to_string(path)?;
        let root: serde_json::Value = serde_json::from_str(&text)?;

        let entry = root
            .get("platforms")
            .and_then(|v| v.as_array())
            .and_then(|platforms| {
                platforms
                    .iter()
                    .find(|p| p.get("platform").and_then(|v| v.as_str()) == Some(PLATFORM_NAME))
            });

        match entry {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Validate the loaded configuration, falling back to defaults when absent
    pub fn validate_or_default(config: Option<PlatformConfig>) -> Result<PlatformConfig> {
        let config = match config {
            Some(config) => config,
            None => {
                tracing::warn!(
                    "Missing configuration, register the plugin with {{\"platform\": \"{}\"}}; using the default configuration",
                    PLATFORM_NAME
                );
                PlatformConfig::default()
            }
        };

        if config.platform != PLATFORM_NAME {
            return Err(BridgeError::InvalidConfiguration(format!(
                "platform '{}' does not match '{}', you must edit your config.json file",
                config.platform, PLATFORM_NAME
            )));
        }

        Ok(config)
    }

    /// Global section, empty when not configured
    pub fn global(&self) -> GlobalConfig {
        self.global.clone().unwrap_or_default()
    }

    /// Accessory list, empty when not configured
    pub fn accessories(&self) -> Vec<AccessoryConfig> {
        self.accessories.clone().unwrap_or_default()
    }

    pub fn discovers_all(&self) -> bool {
        self.discovery_all_accessories == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_platform_block() {
        let json = r#"{
            "platform": "SoundTouchPlugins",
            "discoveryAllAccessories": false,
            "global": {
                "verbose": true,
                "pollingInterval": 10000,
                "volume": { "onValue": 20, "mode": "speaker" },
                "presets": [{ "index": 3, "enabled": false }]
            },
            "accessories": [{
                "name": "Kitchen",
                "ip": "192.168.1.20",
                "verbose": false,
                "sources": [{ "source": "AUX", "name": "Turntable", "enabled": true }]
            }]
        }"#;

        let config = PlatformConfig::from_json_str(json).unwrap();
        let global = config.global();
        assert_eq!(global.verbose, Some(true));
        assert_eq!(global.polling_interval, Some(10000));
        let volume = global.volume.unwrap();
        assert_eq!(volume.on_value, Some(20));
        assert_eq!(volume.mode, Some(VolumeMode::Speaker));
        assert_eq!(global.presets.unwrap()[0].index, 3);

        let accessories = config.accessories();
        assert_eq!(accessories.len(), 1);
        assert_eq!(accessories[0].ip.as_deref(), Some("192.168.1.20"));
        assert_eq!(accessories[0].settings.verbose, Some(false));
        let sources = accessories[0].settings.sources.as_ref().unwrap();
        assert_eq!(sources[0].name.as_deref(), Some("Turntable"));
        assert!(!config.discovers_all());
    }

    #[test]
    fn test_preset_requires_enabled() {
        let json = r#"{ "platform": "SoundTouchPlugins", "global": { "presets": [{ "index": 1 }] } }"#;
        assert!(PlatformConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_missing_config_uses_default() {
        let config = PlatformConfig::validate_or_default(None).unwrap();
        assert_eq!(config.platform, PLATFORM_NAME);
        assert!(config.discovers_all());
    }

    #[test]
    fn test_wrong_platform_is_rejected() {
        let config = PlatformConfig {
            platform: "Other".to_string(),
            ..Default::default()
        };
        match PlatformConfig::validate_or_default(Some(config)) {
            Err(BridgeError::InvalidConfiguration(msg)) => assert!(msg.contains("config.json")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_accessory_label_fallbacks() {
        let accessory = AccessoryConfig {
            room: Some("Bedroom".to_string()),
            ..Default::default()
        };
        assert_eq!(accessory.label(), "Bedroom");
    }
}
