//! Configuration resolution
//!
//! Merges the global and per-accessory configuration layers into the values a
//! single speaker is exposed with: verbosity, the preset and source switches
//! and the volume representation. Everything here is pure and total; absent
//! configuration is always valid input.

use crate::config::{GlobalConfig, PresetConfig, SourceConfig, VolumeConfig, VolumeMode};
use crate::types::{HardwarePreset, HardwareSource};
use serde::{Deserialize, Serialize};

/// On-value meaning "leave the volume alone when switching on"
pub const NO_ON_VALUE: i32 = -1;

pub const DEFAULT_MAX_VALUE: i32 = 100;

pub const DEFAULT_UNMUTE_VALUE: i32 = 35;

/// Preset exposed as a switch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedPreset {
    pub name: String,
    pub index: u32,
}

/// Source exposed as a switch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedSource {
    pub name: String,
    pub source: String,
    /// Account from the matching override, never taken from the hardware
    pub account: Option<String>,
    pub enabled: bool,
    /// Account the speaker reports for this source; addresses it on the device
    #[serde(skip)]
    pub hardware_account: Option<String>,
}

/// Fully populated volume settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSettings {
    /// Volume applied on power-on, [`NO_ON_VALUE`] when none
    pub on_value: i32,
    pub max_value: i32,
    pub unmute_value: i32,
    pub mode: VolumeMode,
}

impl VolumeSettings {
    /// Dedicated power-on volume, if one is configured
    pub fn on_value(&self) -> Option<i32> {
        (self.on_value != NO_ON_VALUE).then_some(self.on_value)
    }
}

impl Default for VolumeSettings {
    fn default() -> Self {
        resolve_volume_settings(None, None)
    }
}

/// Resolve the verbosity flag across layers ordered from lowest to highest precedence
///
/// The last layer that sets the flag wins, so an accessory can force it back
/// to `false` after the global section enabled it.
pub fn resolve_verbosity(layers: &[&GlobalConfig]) -> bool {
    let mut verbose = false;
    for layer in layers {
        if let Some(value) = layer.verbose {
            verbose = value;
        }
    }
    verbose
}

/// Override after the two-tier lookup; implicit when no entry matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResolvedOverride<'a> {
    enabled: bool,
    name: Option<&'a str>,
    account: Option<&'a str>,
}

impl ResolvedOverride<'_> {
    fn implicit() -> Self {
        Self {
            enabled: true,
            name: None,
            account: None,
        }
    }
}

impl<'a> From<&'a PresetConfig> for ResolvedOverride<'a> {
    fn from(config: &'a PresetConfig) -> Self {
        Self {
            enabled: config.enabled,
            name: non_empty(config.name.as_deref()),
            account: None,
        }
    }
}

impl<'a> From<&'a SourceConfig> for ResolvedOverride<'a> {
    fn from(config: &'a SourceConfig) -> Self {
        Self {
            enabled: config.enabled,
            name: non_empty(config.name.as_deref()),
            account: config.account.as_deref(),
        }
    }
}

/// Key an override entry is matched on
trait OverrideKey<T> {
    fn matches(&self, entry: &T) -> bool;
}

struct PresetKey(u32);

impl OverrideKey<PresetConfig> for PresetKey {
    fn matches(&self, entry: &PresetConfig) -> bool {
        entry.index == self.0
    }
}

struct SourceKey<'a> {
    source: &'a str,
    account: Option<&'a str>,
}

impl OverrideKey<SourceConfig> for SourceKey<'_> {
    fn matches(&self, entry: &SourceConfig) -> bool {
        entry.source == self.source
            && match entry.account.as_deref() {
                Some(account) => Some(account) == self.account,
                None => true,
            }
    }
}

/// First matching entry of the accessory layer, else of the global layer
fn lookup<'a, T>(
    key: &impl OverrideKey<T>,
    accessory: Option<&'a [T]>,
    global: Option<&'a [T]>,
) -> Option<&'a T> {
    accessory
        .and_then(|entries| entries.iter().find(|e| key.matches(e)))
        .or_else(|| global.and_then(|entries| entries.iter().find(|e| key.matches(e))))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Resolve the presets to expose, in hardware order
pub fn resolve_presets(
    hardware: &[HardwarePreset],
    accessory: Option<&[PresetConfig]>,
    global: Option<&[PresetConfig]>,
) -> Vec<ResolvedPreset> {
    hardware
        .iter()
        .filter_map(|preset| {
            let resolved = lookup(&PresetKey(preset.id), accessory, global)
                .map(ResolvedOverride::from)
                .unwrap_or_else(ResolvedOverride::implicit);
            if !resolved.enabled {
                return None;
            }

            let name = match resolved.name.or(non_empty(Some(preset.label()))) {
                Some(name) => name.to_string(),
                None => format!("Preset {}", preset.id),
            };
            Some(ResolvedPreset {
                name,
                index: preset.id,
            })
        })
        .collect()
}

/// Resolve the local sources to expose, in hardware order
///
/// Non-local sources are never exposed.
pub fn resolve_sources(
    hardware: &[HardwareSource],
    device_name: &str,
    accessory: Option<&[SourceConfig]>,
    global: Option<&[SourceConfig]>,
) -> Vec<ResolvedSource> {
    hardware
        .iter()
        .filter(|source| source.is_local)
        .filter_map(|source| {
            let key = SourceKey {
                source: &source.source,
                account: source.account.as_deref(),
            };
            let resolved = lookup(&key, accessory, global)
                .map(ResolvedOverride::from)
                .unwrap_or_else(ResolvedOverride::implicit);
            if !resolved.enabled {
                return None;
            }

            let name = match resolved.name {
                Some(name) => name.to_string(),
                None => {
                    let label = match source.label.as_deref() {
                        Some(label) if !label.is_empty() => label.to_string(),
                        _ => title_case(&source.source),
                    };
                    format!("{} {}", device_name, label)
                }
            };
            Some(ResolvedSource {
                name,
                source: source.source.clone(),
                account: resolved.account.map(str::to_string),
                enabled: resolved.enabled,
                hardware_account: source.account.clone(),
            })
        })
        .collect()
}

/// Upper-case the first character and lower-case the rest (`SPOTIFY` -> `Spotify`)
pub fn title_case(value: &str) -> String {
    let lower = value.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Resolve the volume settings
///
/// Unlike the other settings, the global section is consulted before the
/// accessory one here. A zero value counts as unset.
pub fn resolve_volume_settings(
    global: Option<&VolumeConfig>,
    accessory: Option<&VolumeConfig>,
) -> VolumeSettings {
    let on_value = volume_field(global, accessory, |v| v.on_value);
    let max_value = volume_field(global, accessory, |v| v.max_value);
    let unmute_value = volume_field(global, accessory, |v| v.unmute_value);
    let mode = global
        .and_then(|v| v.mode)
        .or_else(|| accessory.and_then(|v| v.mode));

    VolumeSettings {
        on_value: on_value.unwrap_or(NO_ON_VALUE),
        max_value: max_value.unwrap_or(DEFAULT_MAX_VALUE),
        unmute_value: unmute_value.or(on_value).unwrap_or(DEFAULT_UNMUTE_VALUE),
        mode: mode.unwrap_or_default(),
    }
}

fn volume_field(
    global: Option<&VolumeConfig>,
    accessory: Option<&VolumeConfig>,
    get: fn(&VolumeConfig) -> Option<i32>,
) -> Option<i32> {
    let set = |value: Option<i32>| value.filter(|v| *v != 0);
    set(global.and_then(get)).or_else(|| set(accessory.and_then(get)))
}
