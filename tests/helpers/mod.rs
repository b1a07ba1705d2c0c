//! In-memory speakers and registry shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use soundtouch_bridge::{
    AccessoryHandle, AccessoryRegistry, BridgeError, ContentItem, DeviceApi, DeviceDiscovery,
    DeviceInfo, HardwarePreset, HardwareSource, Key, NowPlaying, Result, Volume,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Speaker whose state lives in memory
pub struct FakeSpeaker {
    pub host: String,
    pub info: DeviceInfo,
    pub presets: Vec<HardwarePreset>,
    pub sources: Vec<HardwareSource>,
    pub unreachable: bool,
    /// `now_playing` never answers
    pub stalled: bool,
    pub now_playing: Mutex<NowPlaying>,
    pub volume: Mutex<Volume>,
    pub keys: Mutex<Vec<Key>>,
    pub volume_writes: Mutex<Vec<i32>>,
    pub selected: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeSpeaker {
    pub fn new(host: &str, id: &str, name: &str) -> Self {
        Self {
            host: host.to_string(),
            info: DeviceInfo {
                id: Some(id.to_string()),
                name: Some(name.to_string()),
                model: "SoundTouch 10".to_string(),
                components: Vec::new(),
            },
            presets: vec![preset(1, "Radio", "/station/1"), preset(2, "Jazz", "/station/2")],
            sources: vec![
                source("AUX", Some("AUX"), Some("AUX IN"), true),
                source("BLUETOOTH", None, None, true),
                source("SPOTIFY", Some("alice"), Some("alice"), false),
            ],
            unreachable: false,
            stalled: false,
            now_playing: Mutex::new(standby()),
            volume: Mutex::new(Volume {
                target: 20,
                actual: 20,
                muted: false,
            }),
            keys: Mutex::new(Vec::new()),
            volume_writes: Mutex::new(Vec::new()),
            selected: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }

    pub fn playing(self, now_playing: NowPlaying) -> Self {
        *self.now_playing.lock().unwrap() = now_playing;
        self
    }

    pub fn with_volume(self, actual: i32) -> Self {
        *self.volume.lock().unwrap() = Volume {
            target: actual,
            actual,
            muted: false,
        };
        self
    }

    fn check(&self) -> Result<()> {
        if self.unreachable {
            return Err(BridgeError::HttpStatus {
                status: 503,
                url: format!("http://{}:8090/", self.host),
            });
        }
        Ok(())
    }
}

pub fn preset(id: u32, label: &str, location: &str) -> HardwarePreset {
    HardwarePreset {
        id,
        content: ContentItem {
            source: Some("TUNEIN".to_string()),
            source_account: None,
            location: Some(location.to_string()),
            item_name: Some(label.to_string()),
        },
    }
}

pub fn source(id: &str, account: Option<&str>, label: Option<&str>, is_local: bool) -> HardwareSource {
    HardwareSource {
        source: id.to_string(),
        account: account.map(str::to_string),
        label: label.map(str::to_string),
        status: Some("READY".to_string()),
        is_local,
    }
}

pub fn standby() -> NowPlaying {
    NowPlaying {
        source: "STANDBY".to_string(),
        source_account: None,
        content: None,
    }
}

#[async_trait]
impl DeviceApi for FakeSpeaker {
    fn host(&self) -> &str {
        &self.host
    }

    async fn info(&self) -> Result<DeviceInfo> {
        self.check()?;
        Ok(self.info.clone())
    }

    async fn presets(&self) -> Result<Vec<HardwarePreset>> {
        self.check()?;
        Ok(self.presets.clone())
    }

    async fn sources(&self) -> Result<Vec<HardwareSource>> {
        self.check()?;
        Ok(self.sources.clone())
    }

    async fn now_playing(&self) -> Result<NowPlaying> {
        self.check()?;
        if self.stalled {
            std::future::pending::<()>().await;
        }
        Ok(self.now_playing.lock().unwrap().clone())
    }

    async fn volume(&self) -> Result<Volume> {
        self.check()?;
        Ok(*self.volume.lock().unwrap())
    }

    async fn set_volume(&self, volume: i32) -> Result<()> {
        self.check()?;
        self.volume_writes.lock().unwrap().push(volume);
        let mut current = self.volume.lock().unwrap();
        current.target = volume;
        current.actual = volume;
        Ok(())
    }

    async fn press_key(&self, key: Key) -> Result<()> {
        self.check()?;
        self.keys.lock().unwrap().push(key);
        if key == Key::Power {
            let mut now_playing = self.now_playing.lock().unwrap();
            *now_playing = if now_playing.is_standby() {
                NowPlaying {
                    source: "AUX".to_string(),
                    source_account: Some("AUX".to_string()),
                    content: None,
                }
            } else {
                standby()
            };
        }
        Ok(())
    }

    async fn select_source(&self, source: &str, account: Option<&str>) -> Result<()> {
        self.check()?;
        self.selected
            .lock()
            .unwrap()
            .push((source.to_string(), account.map(str::to_string)));
        Ok(())
    }
}

/// Discovery over a fixed set of fake speakers
pub struct FakeDiscovery {
    pub speakers: Vec<Arc<FakeSpeaker>>,
}

impl FakeDiscovery {
    pub fn new(speakers: Vec<FakeSpeaker>) -> Self {
        Self {
            speakers: speakers.into_iter().map(Arc::new).collect(),
        }
    }
}

#[async_trait]
impl DeviceDiscovery for FakeDiscovery {
    async fn search(&self) -> Result<Vec<Arc<dyn DeviceApi>>> {
        Ok(self
            .speakers
            .iter()
            .map(|s| s.clone() as Arc<dyn DeviceApi>)
            .collect())
    }

    fn connect(&self, host: &str, _port: u16) -> Result<Arc<dyn DeviceApi>> {
        self.speakers
            .iter()
            .find(|s| s.host == host)
            .map(|s| s.clone() as Arc<dyn DeviceApi>)
            .ok_or_else(|| BridgeError::DeviceNotFound {
                name: host.to_string(),
            })
    }
}

/// Registry recording what the platform did
#[derive(Default)]
pub struct RecordingRegistry {
    pub cache: Mutex<BTreeMap<Uuid, AccessoryHandle>>,
    pub registered: Mutex<Vec<Uuid>>,
    pub updated: Mutex<Vec<Uuid>>,
    pub unregistered: Mutex<Vec<Uuid>>,
}

impl RecordingRegistry {
    pub fn with_cached(handles: Vec<AccessoryHandle>) -> Self {
        let registry = Self::default();
        {
            let mut cache = registry.cache.lock().unwrap();
            for handle in handles {
                cache.insert(handle.uuid, handle);
            }
        }
        registry
    }
}

impl AccessoryRegistry for RecordingRegistry {
    fn cached(&self, uuid: &Uuid) -> Option<AccessoryHandle> {
        self.cache.lock().unwrap().get(uuid).cloned()
    }

    fn cached_uuids(&self) -> Vec<Uuid> {
        self.cache.lock().unwrap().keys().copied().collect()
    }

    fn register(&self, _plugin: &str, _platform: &str, handle: AccessoryHandle) {
        self.registered.lock().unwrap().push(handle.uuid);
        self.cache.lock().unwrap().insert(handle.uuid, handle);
    }

    fn update(&self, handle: AccessoryHandle) {
        self.updated.lock().unwrap().push(handle.uuid);
        self.cache.lock().unwrap().insert(handle.uuid, handle);
    }

    fn unregister(&self, _plugin: &str, _platform: &str, uuids: &[Uuid]) {
        let mut cache = self.cache.lock().unwrap();
        for uuid in uuids {
            cache.remove(uuid);
            self.unregistered.lock().unwrap().push(*uuid);
        }
    }
}
