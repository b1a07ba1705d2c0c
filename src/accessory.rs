//! Accessory exposition
//!
//! Maps a [`ResolvedDevice`] onto the host runtime's service/characteristic
//! model and wires characteristic reads and writes to the speaker. The host
//! keeps the accessory registry; this module only talks to it through
//! [`AccessoryRegistry`].

use crate::client::DeviceApi;
use crate::config::VolumeMode;
use crate::device::{device_is_on, ResolvedDevice, SoundTouchDevice};
use crate::error::{BridgeError, Result};
use crate::resolve::ResolvedSource;
use crate::types::{Key, NowPlaying};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Stable accessory identifier derived from the device id
pub fn accessory_uuid(device_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, device_id.as_bytes())
}

/// Service kinds used by speaker accessories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServiceType {
    Switch,
    Lightbulb,
    Speaker,
}

/// Characteristics used by speaker accessories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Characteristic {
    On,
    Brightness,
    Volume,
    Mute,
}

/// One service of an accessory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub service_type: ServiceType,
    pub display_name: String,
    /// Distinguishes services of the same type on one accessory
    pub subtype: String,
    pub characteristics: Vec<Characteristic>,
}

/// Accessory as known to the host runtime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessoryHandle {
    pub uuid: Uuid,
    pub display_name: String,
    pub services: Vec<ServiceDescriptor>,
}

/// Host-side accessory registry
pub trait AccessoryRegistry: Send + Sync {
    /// Accessory restored from the host cache, if any
    fn cached(&self, uuid: &Uuid) -> Option<AccessoryHandle>;

    fn cached_uuids(&self) -> Vec<Uuid>;

    /// Register a new accessory
    fn register(&self, plugin: &str, platform: &str, handle: AccessoryHandle);

    /// Replace the services of a cached accessory
    fn update(&self, handle: AccessoryHandle);

    fn unregister(&self, plugin: &str, platform: &str, uuids: &[Uuid]);
}

/// How volume is surfaced for a [`VolumeMode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeRepresentation {
    None,
    /// Brightness stands in for volume, On for "not muted"
    Lightbulb,
    /// Native Volume and Mute characteristics
    Speaker,
}

impl From<VolumeMode> for VolumeRepresentation {
    fn from(mode: VolumeMode) -> Self {
        match mode {
            VolumeMode::None => VolumeRepresentation::None,
            VolumeMode::Lightbulb => VolumeRepresentation::Lightbulb,
            VolumeMode::Speaker => VolumeRepresentation::Speaker,
        }
    }
}

impl VolumeRepresentation {
    pub fn service_type(&self) -> Option<ServiceType> {
        match self {
            VolumeRepresentation::None => None,
            VolumeRepresentation::Lightbulb => Some(ServiceType::Lightbulb),
            VolumeRepresentation::Speaker => Some(ServiceType::Speaker),
        }
    }

    pub fn volume_characteristic(&self) -> Option<Characteristic> {
        match self {
            VolumeRepresentation::None => None,
            VolumeRepresentation::Lightbulb => Some(Characteristic::Brightness),
            VolumeRepresentation::Speaker => Some(Characteristic::Volume),
        }
    }

    pub fn mute_characteristic(&self) -> Option<Characteristic> {
        match self {
            VolumeRepresentation::None => None,
            VolumeRepresentation::Lightbulb => Some(Characteristic::On),
            VolumeRepresentation::Speaker => Some(Characteristic::Mute),
        }
    }

    /// Value of the mute characteristic for a muted state
    ///
    /// A lightbulb is "on" when the speaker is audible.
    pub fn mute_value(&self, muted: bool) -> bool {
        match self {
            VolumeRepresentation::Lightbulb => !muted,
            _ => muted,
        }
    }

    /// Muted state requested by a write to the mute characteristic
    pub fn muted_from_value(&self, value: bool) -> bool {
        self.mute_value(value)
    }
}

/// Snapshot of the live state of a speaker accessory
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryState {
    pub on: bool,
    /// Characteristic level, 0-100
    pub volume: i32,
    pub muted: bool,
    pub active_preset: Option<u32>,
    pub active_source: Option<String>,
}

/// Speaker exposed as an accessory
#[derive(Clone)]
pub struct SpeakerAccessory {
    uuid: Uuid,
    device: Arc<ResolvedDevice>,
    api: Arc<dyn DeviceApi>,
    representation: VolumeRepresentation,
}

impl SpeakerAccessory {
    pub fn new(device: SoundTouchDevice) -> Self {
        let representation = device.resolved.volume_settings.mode.into();
        Self {
            uuid: accessory_uuid(&device.resolved.id),
            device: device.resolved,
            api: device.api,
            representation,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn device(&self) -> &ResolvedDevice {
        &self.device
    }

    pub fn representation(&self) -> VolumeRepresentation {
        self.representation
    }

    /// Services this accessory exposes
    pub fn services(&self) -> Vec<ServiceDescriptor> {
        let name = &self.device.name;
        let mut services = vec![ServiceDescriptor {
            service_type: ServiceType::Switch,
            display_name: name.clone(),
            subtype: "onService".to_string(),
            characteristics: vec![Characteristic::On],
        }];

        if let (Some(service_type), Some(volume), Some(mute)) = (
            self.representation.service_type(),
            self.representation.volume_characteristic(),
            self.representation.mute_characteristic(),
        ) {
            services.push(ServiceDescriptor {
                service_type,
                display_name: format!("{} Volume", name),
                subtype: "volumeService".to_string(),
                characteristics: vec![mute, volume],
            });
        }

        for preset in &self.device.presets {
            services.push(ServiceDescriptor {
                service_type: ServiceType::Switch,
                display_name: preset.name.clone(),
                subtype: format!("preset{}", preset.index),
                characteristics: vec![Characteristic::On],
            });
        }

        for source in &self.device.sources {
            services.push(ServiceDescriptor {
                service_type: ServiceType::Switch,
                display_name: source.name.clone(),
                subtype: source_subtype(source),
                characteristics: vec![Characteristic::On],
            });
        }

        services
    }

    pub fn handle(&self) -> AccessoryHandle {
        AccessoryHandle {
            uuid: self.uuid,
            display_name: self.device.name.clone(),
            services: self.services(),
        }
    }

    fn log(&self, message: std::fmt::Arguments<'_>) {
        if self.device.verbose {
            tracing::info!("[{}] {}", self.device.name, message);
        }
    }

    // ========== Power ==========

    pub async fn is_on(&self) -> Result<bool> {
        device_is_on(self.api.as_ref()).await
    }

    /// Switch the speaker on or off, applying the on-value when switching on
    pub async fn set_on(&self, on: bool) -> Result<()> {
        if self.is_on().await? == on {
            return Ok(());
        }

        self.api.press_key(Key::Power).await?;
        self.log(format_args!("turned {}", if on { "on" } else { "off" }));

        if on {
            if let Some(on_value) = self.device.volume_settings.on_value() {
                self.api.set_volume(on_value).await?;
                self.log(format_args!("volume set to {}", on_value));
            }
        }
        Ok(())
    }

    // ========== Volume ==========

    /// Characteristic level (0-100) for a device volume
    pub fn level_from_volume(&self, volume: i32) -> i32 {
        let max = self.device.volume_settings.max_value.max(1) as f64;
        ((volume as f64) * 100.0 / max).round().clamp(0.0, 100.0) as i32
    }

    /// Device volume for a characteristic level (0-100)
    pub fn volume_from_level(&self, level: i32) -> i32 {
        let max = self.device.volume_settings.max_value.max(1) as f64;
        ((level.clamp(0, 100) as f64) * max / 100.0).round() as i32
    }

    pub async fn volume_level(&self) -> Result<i32> {
        let volume = self.api.volume().await?;
        Ok(self.level_from_volume(volume.actual))
    }

    pub async fn set_volume_level(&self, level: i32) -> Result<()> {
        let volume = self.volume_from_level(level);
        self.api.set_volume(volume).await?;
        self.log(format_args!("volume set to {}", volume));
        Ok(())
    }

    // ========== Mute ==========

    pub async fn is_muted(&self) -> Result<bool> {
        let volume = self.api.volume().await?;
        Ok(volume.muted || volume.actual == 0)
    }

    /// Mute by silencing the speaker; unmute switches it on and restores the unmute value
    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        if muted {
            self.api.set_volume(0).await?;
            self.log(format_args!("muted"));
            return Ok(());
        }

        if !self.is_on().await? {
            self.set_on(true).await?;
        }
        let volume = self.api.volume().await?;
        if volume.muted {
            self.api.press_key(Key::Mute).await?;
        }
        if volume.actual == 0 {
            self.api
                .set_volume(self.device.volume_settings.unmute_value)
                .await?;
        }
        self.log(format_args!("unmuted"));
        Ok(())
    }

    /// Handle a write to the mute characteristic of the volume service
    pub async fn set_mute_characteristic(&self, value: bool) -> Result<()> {
        self.set_muted(self.representation.muted_from_value(value))
            .await
    }

    // ========== Presets and sources ==========

    pub async fn select_preset(&self, index: u32) -> Result<()> {
        let preset = self
            .device
            .presets
            .iter()
            .find(|p| p.index == index)
            .ok_or_else(|| BridgeError::NotExposed(format!("preset {}", index)))?;

        self.api.select_preset(index).await?;
        self.log(format_args!("selected preset '{}'", preset.name));
        Ok(())
    }

    /// Select a source by its id and the account the speaker reports for it
    pub async fn select_source(&self, source: &str, account: Option<&str>) -> Result<()> {
        let exposed = self
            .device
            .sources
            .iter()
            .find(|s| s.source == source && s.hardware_account.as_deref() == account)
            .ok_or_else(|| BridgeError::NotExposed(format!("source {}", source)))?;

        self.api.select_source(source, account).await?;
        self.log(format_args!("selected source '{}'", exposed.name));
        Ok(())
    }

    /// Exposed source currently playing
    pub fn active_source(&self, now_playing: &NowPlaying) -> Option<&ResolvedSource> {
        if now_playing.is_standby() {
            return None;
        }
        self.device.sources.iter().find(|s| {
            s.source == now_playing.source
                && match s.hardware_account.as_deref() {
                    Some(account) => now_playing.source_account.as_deref() == Some(account),
                    None => true,
                }
        })
    }

    /// Exposed preset currently playing
    pub async fn active_preset(&self, now_playing: &NowPlaying) -> Result<Option<u32>> {
        let content = match &now_playing.content {
            Some(content) if !now_playing.is_standby() => content,
            _ => return Ok(None),
        };
        if self.device.presets.is_empty() {
            return Ok(None);
        }

        let presets = self.api.presets().await?;
        Ok(presets
            .iter()
            .find(|p| p.content.same_content(content))
            .map(|p| p.id)
            .filter(|id| self.device.presets.iter().any(|p| p.index == *id)))
    }

    /// Read the live state of the speaker
    pub async fn poll(&self) -> Result<AccessoryState> {
        let (now_playing, volume) = tokio::try_join!(self.api.now_playing(), self.api.volume())?;
        let active_preset = self.active_preset(&now_playing).await?;

        Ok(AccessoryState {
            on: !now_playing.is_standby(),
            volume: self.level_from_volume(volume.actual),
            muted: volume.muted || volume.actual == 0,
            active_preset,
            active_source: self
                .active_source(&now_playing)
                .map(|s| s.name.clone()),
        })
    }
}

impl std::fmt::Debug for SpeakerAccessory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeakerAccessory")
            .field("uuid", &self.uuid)
            .field("device", &self.device)
            .field("representation", &self.representation)
            .finish()
    }
}

fn source_subtype(source: &ResolvedSource) -> String {
    match &source.hardware_account {
        Some(account) => format!("source{}{}", source.source, account),
        None => format!("source{}", source.source),
    }
}
