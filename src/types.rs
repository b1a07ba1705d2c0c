use serde::{Deserialize, Serialize};
use std::fmt;

/// Device identifier (the speaker's `deviceID`, its MAC address)
pub type DeviceId = String;

/// Source reported by a speaker that is switched off
pub const STANDBY_SOURCE: &str = "STANDBY";

/// Device information as reported by `/info`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: Option<DeviceId>,
    pub name: Option<String>,
    /// Product type, e.g. "SoundTouch 10"
    pub model: String,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl DeviceInfo {
    /// Software version of the component whose serial number is the device id
    pub fn software_version(&self) -> Option<String> {
        let id = self.id.as_deref()?.to_lowercase();
        self.components
            .iter()
            .find(|c| c.serial_number.as_deref().map(str::to_lowercase).as_deref() == Some(id.as_str()))
            .and_then(|c| c.software_version.clone())
    }
}

/// Hardware component of a speaker
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Component {
    pub category: Option<String>,
    pub software_version: Option<String>,
    pub serial_number: Option<String>,
}

/// Content reference used by presets and the now-playing status
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentItem {
    pub source: Option<String>,
    pub source_account: Option<String>,
    pub location: Option<String>,
    pub item_name: Option<String>,
}

impl ContentItem {
    /// Whether two items point at the same content
    pub fn same_content(&self, other: &ContentItem) -> bool {
        self.source == other.source && self.location == other.location
    }
}

/// Preset slot stored on the speaker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HardwarePreset {
    /// Slot number
    pub id: u32,
    pub content: ContentItem,
}

impl HardwarePreset {
    /// Label shown by the speaker for this slot
    pub fn label(&self) -> &str {
        self.content.item_name.as_deref().unwrap_or("")
    }
}

/// Input source known to the speaker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HardwareSource {
    /// Source identifier, e.g. `AUX`, `BLUETOOTH`, `SPOTIFY`
    pub source: String,
    pub account: Option<String>,
    /// Label reported by the speaker
    pub label: Option<String>,
    pub status: Option<String>,
    /// Reachable without cloud linkage
    pub is_local: bool,
}

/// Playback status as reported by `/now_playing`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NowPlaying {
    pub source: String,
    pub source_account: Option<String>,
    pub content: Option<ContentItem>,
}

impl NowPlaying {
    pub fn is_standby(&self) -> bool {
        self.source == STANDBY_SOURCE
    }
}

/// Volume status as reported by `/volume`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Volume {
    pub target: i32,
    pub actual: i32,
    pub muted: bool,
}

/// Remote-control keys accepted by `/key`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Power,
    Mute,
    /// Preset slot 1-6
    Preset(u32),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Power => f.write_str("POWER"),
            Key::Mute => f.write_str("MUTE"),
            Key::Preset(index) => write!(f, "PRESET_{}", index),
        }
    }
}
