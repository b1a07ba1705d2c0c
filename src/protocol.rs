//! XML shapes of the SoundTouch HTTP API
//!
//! The speaker answers every `GET` with a small XML document and accepts XML
//! bodies on `POST`. The structs here only describe the wire format; they are
//! converted into the types in [`crate::types`] right after parsing.

use crate::error::Result;
use crate::types::{
    Component, ContentItem, DeviceInfo, HardwarePreset, HardwareSource, Key, NowPlaying, Volume,
};
use quick_xml::escape::escape;
use serde::Deserialize;

/// API endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Info,
    Presets,
    Sources,
    NowPlaying,
    Volume,
    Key,
    Select,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Info => "/info",
            Endpoint::Presets => "/presets",
            Endpoint::Sources => "/sources",
            Endpoint::NowPlaying => "/now_playing",
            Endpoint::Volume => "/volume",
            Endpoint::Key => "/key",
            Endpoint::Select => "/select",
        }
    }
}

/// Key press phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Press,
    Release,
}

#[derive(Debug, Deserialize)]
struct InfoXml {
    #[serde(rename = "@deviceID", default)]
    device_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    device_type: Option<String>,
    #[serde(default)]
    components: Option<ComponentsXml>,
}

#[derive(Debug, Deserialize)]
struct ComponentsXml {
    #[serde(rename = "component", default)]
    items: Vec<ComponentXml>,
}

#[derive(Debug, Deserialize)]
struct ComponentXml {
    #[serde(rename = "componentCategory", default)]
    category: Option<String>,
    #[serde(rename = "softwareVersion", default)]
    software_version: Option<String>,
    #[serde(rename = "serialNumber", default)]
    serial_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentItemXml {
    #[serde(rename = "@source", default)]
    source: Option<String>,
    #[serde(rename = "@sourceAccount", default)]
    source_account: Option<String>,
    #[serde(rename = "@location", default)]
    location: Option<String>,
    #[serde(rename = "itemName", default)]
    item_name: Option<String>,
}

impl From<ContentItemXml> for ContentItem {
    fn from(xml: ContentItemXml) -> Self {
        ContentItem {
            source: xml.source,
            source_account: non_empty(xml.source_account),
            location: xml.location,
            item_name: xml.item_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PresetsXml {
    #[serde(rename = "preset", default)]
    items: Vec<PresetXml>,
}

#[derive(Debug, Deserialize)]
struct PresetXml {
    #[serde(rename = "@id")]
    id: u32,
    #[serde(rename = "ContentItem")]
    content: ContentItemXml,
}

#[derive(Debug, Deserialize)]
struct SourcesXml {
    #[serde(rename = "sourceItem", default)]
    items: Vec<SourceItemXml>,
}

#[derive(Debug, Deserialize)]
struct SourceItemXml {
    #[serde(rename = "@source")]
    source: String,
    #[serde(rename = "@sourceAccount", default)]
    source_account: Option<String>,
    #[serde(rename = "@status", default)]
    status: Option<String>,
    #[serde(rename = "@isLocal", default)]
    is_local: bool,
    #[serde(rename = "$text", default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NowPlayingXml {
    #[serde(rename = "@source")]
    source: String,
    #[serde(rename = "@sourceAccount", default)]
    source_account: Option<String>,
    #[serde(rename = "ContentItem", default)]
    content: Option<ContentItemXml>,
}

#[derive(Debug, Deserialize)]
struct VolumeXml {
    #[serde(rename = "targetvolume", default)]
    target: i32,
    #[serde(rename = "actualvolume")]
    actual: i32,
    #[serde(rename = "muteenabled", default)]
    muted: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Parse the `/info` response
pub fn parse_info(xml: &str) -> Result<DeviceInfo> {
    let info: InfoXml = quick_xml::de::from_str(xml)?;
    Ok(DeviceInfo {
        id: non_empty(info.device_id),
        name: non_empty(info.name),
        model: info.device_type.unwrap_or_default(),
        components: info
            .components
            .map(|c| c.items)
            .unwrap_or_default()
            .into_iter()
            .map(|c| Component {
                category: c.category,
                software_version: c.software_version,
                serial_number: c.serial_number,
            })
            .collect(),
    })
}

/// Parse the `/presets` response
pub fn parse_presets(xml: &str) -> Result<Vec<HardwarePreset>> {
    let presets: PresetsXml = quick_xml::de::from_str(xml)?;
    Ok(presets
        .items
        .into_iter()
        .map(|p| HardwarePreset {
            id: p.id,
            content: p.content.into(),
        })
        .collect())
}

/// Parse the `/sources` response
pub fn parse_sources(xml: &str) -> Result<Vec<HardwareSource>> {
    let sources: SourcesXml = quick_xml::de::from_str(xml)?;
    Ok(sources
        .items
        .into_iter()
        .map(|s| HardwareSource {
            source: s.source,
            account: non_empty(s.source_account),
            label: non_empty(s.label),
            status: s.status,
            is_local: s.is_local,
        })
        .collect())
}

/// Parse the `/now_playing` response
pub fn parse_now_playing(xml: &str) -> Result<NowPlaying> {
    let now_playing: NowPlayingXml = quick_xml::de::from_str(xml)?;
    Ok(NowPlaying {
        source: now_playing.source,
        source_account: non_empty(now_playing.source_account),
        content: now_playing.content.map(Into::into),
    })
}

/// Parse the `/volume` response
pub fn parse_volume(xml: &str) -> Result<Volume> {
    let volume: VolumeXml = quick_xml::de::from_str(xml)?;
    Ok(Volume {
        target: volume.target,
        actual: volume.actual,
        muted: volume.muted,
    })
}

/// Body of a `/key` request
pub fn key_body(key: Key, state: KeyState) -> String {
    let state = match state {
        KeyState::Press => "press",
        KeyState::Release => "release",
    };
    format!(r#"<key state="{}" sender="Gabbo">{}</key>"#, state, key)
}

/// Body of a `/volume` request
pub fn volume_body(volume: i32) -> String {
    format!("<volume>{}</volume>", volume)
}

/// Body of a `/select` request
pub fn select_body(source: &str, account: Option<&str>) -> String {
    match account {
        Some(account) => format!(
            r#"<ContentItem source="{}" sourceAccount="{}"></ContentItem>"#,
            escape(source),
            escape(account)
        ),
        None => format!(r#"<ContentItem source="{}"></ContentItem>"#, escape(source)),
    }
}
