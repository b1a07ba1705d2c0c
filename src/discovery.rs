use crate::client::{DeviceApi, SoundTouchClient};
use crate::config::DEFAULT_PORT;
use crate::error::Result;
use async_trait::async_trait;
use futures_util::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};

const SSDP_ADDR: &str = "239.255.255.250:1900";
const SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:MediaRenderer:1";
const DEFAULT_SEARCH_WINDOW: Duration = Duration::from_secs(3);

/// Source of reachable speakers
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// Enumerate the speakers reachable right now
    async fn search(&self) -> Result<Vec<Arc<dyn DeviceApi>>>;

    /// Connect to a speaker at a known address
    fn connect(&self, host: &str, port: u16) -> Result<Arc<dyn DeviceApi>>;

    /// Find the speaker whose reported name is `room`
    async fn find(&self, room: &str) -> Result<Option<Arc<dyn DeviceApi>>> {
        for api in self.search().await? {
            match api.info().await {
                Ok(info) if info.name.as_deref() == Some(room) => return Ok(Some(api)),
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to query speaker at {}: {}", api.host(), e),
            }
        }
        Ok(None)
    }
}

/// SSDP discovery of SoundTouch speakers
///
/// Sends a single M-SEARCH, collects the hosts that answer within the search
/// window and keeps those that respond to the SoundTouch `/info` endpoint.
///
/// # Example
///
/// ```no_run
/// use soundtouch_bridge::{DeviceDiscovery, SsdpDiscovery};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let discovery = SsdpDiscovery::new();
///     for api in discovery.search().await? {
///         println!("Found speaker at {}", api.host());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SsdpDiscovery {
    window: Duration,
    port: u16,
}

impl SsdpDiscovery {
    pub fn new() -> Self {
        Self {
            window: DEFAULT_SEARCH_WINDOW,
            port: DEFAULT_PORT,
        }
    }

    /// Set how long to wait for SSDP answers
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Collect the hosts answering an M-SEARCH
    async fn search_hosts(&self) -> Result<BTreeSet<String>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_multicast_loop_v4(true)?;

        let request = format!(
            "M-SEARCH * HTTP/1.1\r\n\
             HOST: {}\r\n\
             MAN: \"ssdp:discover\"\r\n\
             MX: 2\r\n\
             ST: {}\r\n\
             \r\n",
            SSDP_ADDR, SEARCH_TARGET
        );
        socket.send_to(request.as_bytes(), SSDP_ADDR).await?;
        tracing::debug!("Sent M-SEARCH for {}", SEARCH_TARGET);

        let deadline = Instant::now() + self.window;
        let mut buffer = [0u8; 2048];
        let mut hosts = BTreeSet::new();

        loop {
            let (size, _) = match timeout_at(deadline, socket.recv_from(&mut buffer)).await {
                Ok(received) => received?,
                Err(_) => break,
            };
            let Ok(text) = std::str::from_utf8(&buffer[..size]) else {
                continue;
            };
            if let Some(host) = parse_location(text).as_deref().and_then(extract_host) {
                if hosts.insert(host.clone()) {
                    tracing::debug!("SSDP answer from {}", host);
                }
            }
        }

        Ok(hosts)
    }
}

impl Default for SsdpDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceDiscovery for SsdpDiscovery {
    async fn search(&self) -> Result<Vec<Arc<dyn DeviceApi>>> {
        let hosts = self.search_hosts().await?;
        tracing::info!("Found {} SSDP host(s)", hosts.len());

        let mut candidates = Vec::new();
        for host in hosts {
            candidates.push(self.connect(&host, self.port)?);
        }

        // Other media renderers answer the search too; keep SoundTouch speakers only
        let probes = join_all(candidates.into_iter().map(|api| async move {
            match api.info().await {
                Ok(_) => Some(api),
                Err(e) => {
                    tracing::debug!("{} is not a SoundTouch speaker: {}", api.host(), e);
                    None
                }
            }
        }))
        .await;

        Ok(probes.into_iter().flatten().collect())
    }

    fn connect(&self, host: &str, port: u16) -> Result<Arc<dyn DeviceApi>> {
        Ok(Arc::new(SoundTouchClient::new(host, port)?))
    }
}

/// Value of the LOCATION header of an SSDP answer
fn parse_location(response: &str) -> Option<String> {
    let mut lines = response.lines();
    let status = lines.next()?;
    if !status.contains("200") {
        return None;
    }

    lines.find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("location")
            .then(|| value.trim().to_string())
    })
}

/// Host part of a URL (`http://192.168.1.10:8091/XD/BO5EBO5E.xml` -> `192.168.1.10`)
fn extract_host(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()?
        .host_str()
        .map(|host| host.to_string())
}
