//! Resolved device records
//!
//! A [`ResolvedDevice`] is built once per discovery cycle for every speaker
//! and never mutated; the next cycle builds a new one.

use crate::client::DeviceApi;
use crate::config::{AccessoryConfig, GlobalConfig, DEFAULT_PORT};
use crate::discovery::DeviceDiscovery;
use crate::error::{BridgeError, Result};
use crate::resolve::{
    resolve_presets, resolve_sources, resolve_verbosity, resolve_volume_settings, ResolvedPreset,
    ResolvedSource, VolumeSettings,
};
use crate::types::{DeviceId, DeviceInfo, HardwarePreset, HardwareSource};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything a speaker reported about itself in one discovery cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardwareSnapshot {
    pub info: DeviceInfo,
    pub presets: Vec<HardwarePreset>,
    pub sources: Vec<HardwareSource>,
}

/// Effective configuration of one speaker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDevice {
    pub id: DeviceId,
    /// Display name
    pub name: String,
    pub model: String,
    pub version: Option<String>,
    pub verbose: bool,
    /// Polling interval in milliseconds; `None` leaves the cadence to the host
    pub polling_interval: Option<u64>,
    pub volume_settings: VolumeSettings,
    pub presets: Vec<ResolvedPreset>,
    pub sources: Vec<ResolvedSource>,
}

/// A resolved device together with the api it was resolved from
#[derive(Clone)]
pub struct SoundTouchDevice {
    pub resolved: Arc<ResolvedDevice>,
    pub api: Arc<dyn DeviceApi>,
}

impl std::fmt::Debug for SoundTouchDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundTouchDevice")
            .field("resolved", &self.resolved)
            .field("host", &self.api.host())
            .finish()
    }
}

/// Compose the effective configuration of a speaker
///
/// Fails only when the device id or name is missing.
pub fn build_resolved_device(
    hardware: &HardwareSnapshot,
    global: &GlobalConfig,
    accessory: &AccessoryConfig,
) -> Result<ResolvedDevice> {
    let info = &hardware.info;
    let id = info
        .id
        .clone()
        .ok_or(BridgeError::DeviceUnidentifiable("id"))?;
    let hardware_name = info
        .name
        .clone()
        .ok_or(BridgeError::DeviceUnidentifiable("name"))?;

    let name = accessory
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or(hardware_name);
    let verbose = resolve_verbosity(&[global, &accessory.settings]);
    let polling_interval = accessory
        .settings
        .polling_interval
        .filter(|ms| *ms > 0)
        .or(global.polling_interval.filter(|ms| *ms > 0));

    if verbose {
        tracing::info!("[{}] found device", name);
        for preset in &hardware.presets {
            tracing::info!("[{}] found preset n°{} '{}' on device", name, preset.id, preset.label());
        }
        for source in hardware.sources.iter().filter(|s| s.is_local) {
            tracing::info!(
                "[{}] found local source '{}' with account '{}' on device",
                name,
                source.source,
                source.account.as_deref().unwrap_or("")
            );
        }
    }

    let presets = resolve_presets(
        &hardware.presets,
        accessory.settings.presets.as_deref(),
        global.presets.as_deref(),
    );
    let sources = resolve_sources(
        &hardware.sources,
        &name,
        accessory.settings.sources.as_deref(),
        global.sources.as_deref(),
    );
    let volume_settings =
        resolve_volume_settings(global.volume.as_ref(), accessory.settings.volume.as_ref());

    Ok(ResolvedDevice {
        id,
        name,
        model: info.model.clone(),
        version: info.software_version(),
        verbose,
        polling_interval,
        volume_settings,
        presets,
        sources,
    })
}

/// Fetch a speaker's capabilities and resolve it
pub async fn device_from_api(
    api: Arc<dyn DeviceApi>,
    global: &GlobalConfig,
    accessory: &AccessoryConfig,
) -> Result<SoundTouchDevice> {
    let info = api.info().await?;
    device_from_info(api, info, global, accessory).await
}

async fn device_from_info(
    api: Arc<dyn DeviceApi>,
    info: DeviceInfo,
    global: &GlobalConfig,
    accessory: &AccessoryConfig,
) -> Result<SoundTouchDevice> {
    let (presets, sources) = tokio::try_join!(api.presets(), api.sources())?;
    let hardware = HardwareSnapshot {
        info,
        presets,
        sources,
    };
    let resolved = build_resolved_device(&hardware, global, accessory)?;

    Ok(SoundTouchDevice {
        resolved: Arc::new(resolved),
        api,
    })
}

/// Resolve every speaker found on the network
///
/// Each speaker is matched to an accessory configuration by room name or ip.
/// Speakers that fail to resolve are logged and skipped.
pub async fn search_all_devices(
    discovery: &dyn DeviceDiscovery,
    global: &GlobalConfig,
    accessories: &[AccessoryConfig],
) -> Result<Vec<SoundTouchDevice>> {
    let apis = discovery.search().await?;
    tracing::debug!("Discovery returned {} speaker(s)", apis.len());

    let outcomes = join_all(apis.into_iter().map(|api| async move {
        let host = api.host().to_string();
        let result: Result<SoundTouchDevice> = async {
            let info = api.info().await?;
            let accessory = accessories
                .iter()
                .find(|ac| {
                    (ac.room.is_some() && ac.room == info.name)
                        || ac.ip.as_deref() == Some(api.host())
                })
                .cloned()
                .unwrap_or_default();
            device_from_info(api.clone(), info, global, &accessory).await
        }
        .await;
        (host, result)
    }))
    .await;

    Ok(collect_devices(outcomes))
}

/// Resolve a single configured accessory, by ip or by room name
pub async fn device_from_config(
    discovery: &dyn DeviceDiscovery,
    global: &GlobalConfig,
    accessory: &AccessoryConfig,
) -> Result<SoundTouchDevice> {
    let api = if let Some(ip) = &accessory.ip {
        discovery.connect(ip, accessory.port.unwrap_or(DEFAULT_PORT))?
    } else if let Some(room) = &accessory.room {
        discovery
            .find(room)
            .await?
            .ok_or_else(|| BridgeError::DeviceNotFound {
                name: accessory.label(),
            })?
    } else {
        return Err(BridgeError::InvalidConfiguration(format!(
            "accessory '{}' needs an ip or a room",
            accessory.label()
        )));
    };

    device_from_api(api, global, accessory).await
}

/// Resolve every configured accessory independently
///
/// Accessories that fail to resolve are logged and skipped.
pub async fn resolve_configured_devices(
    discovery: &dyn DeviceDiscovery,
    global: &GlobalConfig,
    accessories: &[AccessoryConfig],
) -> Vec<SoundTouchDevice> {
    let outcomes = join_all(accessories.iter().map(|accessory| async move {
        (
            accessory.label(),
            device_from_config(discovery, global, accessory).await,
        )
    }))
    .await;

    collect_devices(outcomes)
}

fn collect_devices(outcomes: Vec<(String, Result<SoundTouchDevice>)>) -> Vec<SoundTouchDevice> {
    let mut devices = Vec::new();
    for (label, outcome) in outcomes {
        match outcome {
            Ok(device) => devices.push(device),
            Err(e) => tracing::warn!("Skipping {}: {}", label, e),
        }
    }
    devices
}

/// Whether the speaker is playing anything (not in standby)
pub async fn device_is_on(api: &dyn DeviceApi) -> Result<bool> {
    Ok(!api.now_playing().await?.is_standby())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PresetConfig, VolumeConfig, VolumeMode};
    use crate::types::{Component, ContentItem};

    fn snapshot() -> HardwareSnapshot {
        HardwareSnapshot {
            info: DeviceInfo {
                id: Some("689E19B8BB8A".to_string()),
                name: Some("Living Room".to_string()),
                model: "SoundTouch 10".to_string(),
                components: vec![Component {
                    category: Some("SCM".to_string()),
                    software_version: Some("27.0.6".to_string()),
                    serial_number: Some("689E19B8BB8A".to_string()),
                }],
            },
            presets: vec![
                HardwarePreset {
                    id: 1,
                    content: ContentItem {
                        item_name: Some("Radio".to_string()),
                        ..Default::default()
                    },
                },
                HardwarePreset {
                    id: 3,
                    content: ContentItem {
                        item_name: Some("Jazz".to_string()),
                        ..Default::default()
                    },
                },
            ],
            sources: vec![
                HardwareSource {
                    source: "SPOTIFY".to_string(),
                    account: None,
                    label: None,
                    status: None,
                    is_local: true,
                },
                HardwareSource {
                    source: "UPNP".to_string(),
                    account: None,
                    label: None,
                    status: None,
                    is_local: false,
                },
            ],
        }
    }

    #[test]
    fn test_build_with_defaults() {
        let device =
            build_resolved_device(&snapshot(), &GlobalConfig::default(), &AccessoryConfig::default())
                .unwrap();

        assert_eq!(device.id, "689E19B8BB8A");
        assert_eq!(device.name, "Living Room");
        assert_eq!(device.model, "SoundTouch 10");
        assert_eq!(device.version.as_deref(), Some("27.0.6"));
        assert!(!device.verbose);
        assert_eq!(device.polling_interval, None);
        assert_eq!(device.volume_settings, VolumeSettings::default());
        assert_eq!(device.presets.len(), 2);
        assert_eq!(device.sources.len(), 1);
        assert_eq!(device.sources[0].name, "Living Room Spotify");
    }

    #[test]
    fn test_accessory_layer_overrides_global() {
        let global = GlobalConfig {
            verbose: Some(true),
            polling_interval: Some(10_000),
            presets: Some(vec![PresetConfig {
                index: 1,
                name: Some("Global Radio".to_string()),
                enabled: true,
            }]),
            volume: Some(VolumeConfig {
                mode: Some(VolumeMode::Speaker),
                ..Default::default()
            }),
            ..Default::default()
        };
        let accessory = AccessoryConfig {
            name: Some("Den".to_string()),
            settings: GlobalConfig {
                verbose: Some(false),
                polling_interval: Some(2_000),
                presets: Some(vec![PresetConfig {
                    index: 3,
                    name: None,
                    enabled: false,
                }]),
                ..Default::default()
            },
            ..Default::default()
        };

        let device = build_resolved_device(&snapshot(), &global, &accessory).unwrap();
        assert_eq!(device.name, "Den");
        assert!(!device.verbose);
        assert_eq!(device.polling_interval, Some(2_000));
        assert_eq!(
            device.presets,
            vec![ResolvedPreset {
                name: "Global Radio".to_string(),
                index: 1
            }]
        );
        assert_eq!(device.sources[0].name, "Den Spotify");
        assert_eq!(device.volume_settings.mode, VolumeMode::Speaker);
    }

    #[test]
    fn test_polling_interval_falls_back_to_global() {
        let global = GlobalConfig {
            polling_interval: Some(7_000),
            ..Default::default()
        };
        let device = build_resolved_device(&snapshot(), &global, &AccessoryConfig::default()).unwrap();
        assert_eq!(device.polling_interval, Some(7_000));
    }

    #[test]
    fn test_missing_id_is_unidentifiable() {
        let mut hardware = snapshot();
        hardware.info.id = None;
        let result =
            build_resolved_device(&hardware, &GlobalConfig::default(), &AccessoryConfig::default());
        assert!(matches!(result, Err(BridgeError::DeviceUnidentifiable("id"))));
    }

    #[test]
    fn test_missing_name_is_unidentifiable() {
        let mut hardware = snapshot();
        hardware.info.name = None;
        let result =
            build_resolved_device(&hardware, &GlobalConfig::default(), &AccessoryConfig::default());
        assert!(matches!(result, Err(BridgeError::DeviceUnidentifiable("name"))));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let global = GlobalConfig {
            verbose: Some(true),
            ..Default::default()
        };
        let accessory = AccessoryConfig::default();
        let first = build_resolved_device(&snapshot(), &global, &accessory).unwrap();
        let second = build_resolved_device(&snapshot(), &global, &accessory).unwrap();
        assert_eq!(first, second);
    }
}
