//! Rust library for exposing Bose SoundTouch speakers as smart-home accessories
//!
//! This library discovers SoundTouch speakers on the local network (or takes
//! them from static configuration), resolves how each one is exposed to a
//! home-automation host, and keeps the exposed state in sync by polling. It
//! supports:
//!
//! - Discovery via SSDP, or direct connection by ip / lookup by room name
//! - Layered configuration: global defaults with per-accessory overrides
//! - Preset and source switches with renaming and disabling
//! - Three volume representations: none, lightbulb, speaker
//! - Periodic state polling
//!
//! # Quick Start
//!
//! ```no_run
//! use soundtouch_bridge::{Platform, PlatformConfig, SsdpDiscovery};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PlatformConfig::from_json_str(r#"{
//!         "platform": "SoundTouchPlugins",
//!         "discoveryAllAccessories": true,
//!         "global": { "volume": { "mode": "speaker", "maxValue": 60 } }
//!     }"#)?;
//!
//!     let platform = Platform::new(Some(config), Arc::new(SsdpDiscovery::new()))?;
//!     for device in platform.search_devices().await? {
//!         println!("{}: {} preset(s), {} source(s)",
//!             device.resolved.name,
//!             device.resolved.presets.len(),
//!             device.resolved.sources.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Direct Connection
//!
//! If you know the IP address of a speaker, you can talk to it directly:
//!
//! ```no_run
//! use soundtouch_bridge::{DeviceApi, Key, SoundTouchClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SoundTouchClient::new("192.168.1.100", 8090)?;
//!     if client.now_playing().await?.is_standby() {
//!         client.press_key(Key::Power).await?;
//!     }
//!     client.set_volume(25).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Config**: configuration model and loading
//! - **Resolve**: global/accessory layer merging, preset/source/volume mapping
//! - **Device**: resolved device records and per-device resolution
//! - **Accessory**: service/characteristic mapping and get/set wiring
//! - **Platform**: accessory registration and polling
//! - **Client / Discovery**: HTTP and SSDP access to the speakers
//! - **Protocol / Types**: XML wire shapes and hardware data

mod accessory;
mod client;
mod config;
mod device;
mod discovery;
mod error;
mod platform;
mod protocol;
mod resolve;
mod types;

// Public exports
pub use accessory::{
    accessory_uuid, AccessoryHandle, AccessoryRegistry, AccessoryState, Characteristic,
    ServiceDescriptor, ServiceType, SpeakerAccessory, VolumeRepresentation,
};
pub use client::{DeviceApi, SoundTouchClient};
pub use config::{
    AccessoryConfig, GlobalConfig, PlatformConfig, PresetConfig, SourceConfig, VolumeConfig,
    VolumeMode, DEFAULT_PORT, PLATFORM_NAME, PLUGIN_NAME,
};
pub use device::{
    build_resolved_device, device_from_api, device_from_config, device_is_on,
    resolve_configured_devices, search_all_devices, HardwareSnapshot, ResolvedDevice,
    SoundTouchDevice,
};
pub use discovery::{DeviceDiscovery, SsdpDiscovery};
pub use error::{BridgeError, Result};
pub use platform::{next_update, Platform, Poller, StateUpdate, DEFAULT_POLLING_INTERVAL};
pub use resolve::{
    resolve_presets, resolve_sources, resolve_verbosity, resolve_volume_settings, title_case,
    ResolvedPreset, ResolvedSource, VolumeSettings, NO_ON_VALUE,
};
pub use types::{
    Component, ContentItem, DeviceId, DeviceInfo, HardwarePreset, HardwareSource, Key, NowPlaying,
    Volume, STANDBY_SOURCE,
};
