use crate::error::{BridgeError, Result};
use crate::protocol::{self, Endpoint, KeyState};
use crate::types::{DeviceInfo, HardwarePreset, HardwareSource, Key, NowPlaying, Volume};
use async_trait::async_trait;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Operations the bridge needs from a speaker
///
/// Every call is a single round trip; failures surface as errors and are
/// never retried here.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Host (ip or name) the speaker is reached at
    fn host(&self) -> &str;

    async fn info(&self) -> Result<DeviceInfo>;

    async fn presets(&self) -> Result<Vec<HardwarePreset>>;

    async fn sources(&self) -> Result<Vec<HardwareSource>>;

    async fn now_playing(&self) -> Result<NowPlaying>;

    async fn volume(&self) -> Result<Volume>;

    async fn set_volume(&self, volume: i32) -> Result<()>;

    /// Press and release a remote-control key
    async fn press_key(&self, key: Key) -> Result<()>;

    async fn select_source(&self, source: &str, account: Option<&str>) -> Result<()>;

    /// Recall the preset stored in the given slot
    async fn select_preset(&self, index: u32) -> Result<()> {
        self.press_key(Key::Preset(index)).await
    }
}

/// HTTP client for a SoundTouch speaker
///
/// Talks to the speaker's local web API (port 8090 by default).
///
/// # Example
///
/// ```no_run
/// use soundtouch_bridge::{DeviceApi, SoundTouchClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = SoundTouchClient::new("192.168.1.100", 8090)?;
///     let info = client.info().await?;
///     println!("{:?} ({})", info.name, info.model);
///     client.set_volume(20).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SoundTouchClient {
    host: String,
    port: u16,
    http: reqwest::Client,
}

impl SoundTouchClient {
    /// Create a client for the speaker at `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            host: host.into(),
            port,
            http,
        })
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("http://{}:{}{}", self.host, self.port, endpoint.path())
    }

    async fn get(&self, endpoint: Endpoint) -> Result<String> {
        let url = self.url(endpoint);
        tracing::debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(BridgeError::HttpStatus {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(response.text().await?)
    }

    async fn post(&self, endpoint: Endpoint, body: String) -> Result<()> {
        let url = self.url(endpoint);
        tracing::debug!("POST {}: {}", url, body);

        let response = self.http.post(&url).body(body).send().await?;
        if !response.status().is_success() {
            return Err(BridgeError::HttpStatus {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceApi for SoundTouchClient {
    fn host(&self) -> &str {
        &self.host
    }

    async fn info(&self) -> Result<DeviceInfo> {
        protocol::parse_info(&self.get(Endpoint::Info).await?)
    }

    async fn presets(&self) -> Result<Vec<HardwarePreset>> {
        protocol::parse_presets(&self.get(Endpoint::Presets).await?)
    }

    async fn sources(&self) -> Result<Vec<HardwareSource>> {
        protocol::parse_sources(&self.get(Endpoint::Sources).await?)
    }

    async fn now_playing(&self) -> Result<NowPlaying> {
        protocol::parse_now_playing(&self.get(Endpoint::NowPlaying).await?)
    }

    async fn volume(&self) -> Result<Volume> {
        protocol::parse_volume(&self.get(Endpoint::Volume).await?)
    }

    async fn set_volume(&self, volume: i32) -> Result<()> {
        self.post(Endpoint::Volume, protocol::volume_body(volume)).await
    }

    async fn press_key(&self, key: Key) -> Result<()> {
        self.post(Endpoint::Key, protocol::key_body(key, KeyState::Press))
            .await?;
        self.post(Endpoint::Key, protocol::key_body(key, KeyState::Release))
            .await
    }

    async fn select_source(&self, source: &str, account: Option<&str>) -> Result<()> {
        self.post(Endpoint::Select, protocol::select_body(source, account))
            .await
    }
}
