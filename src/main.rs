use anyhow::Context;
use clap::Parser;
use soundtouch_bridge::{
    next_update, AccessoryHandle, AccessoryRegistry, Platform, PlatformConfig, Poller,
    SsdpDiscovery, DEFAULT_POLLING_INTERVAL,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Expose SoundTouch speakers as accessories and print what gets exposed
#[derive(Parser, Debug)]
#[command(name = "soundtouch-bridge", version, about)]
struct Args {
    /// JSON file holding the platform block on its own
    #[arg(short, long, conflicts_with = "host_config")]
    config: Option<PathBuf>,

    /// Host config.json holding a "platforms" array
    #[arg(long)]
    host_config: Option<PathBuf>,

    /// Keep polling speakers and log state updates until interrupted
    #[arg(long)]
    poll: bool,

    /// Polling interval (ms) for speakers without a configured one [default: 5000]
    #[arg(long)]
    interval_ms: Option<u64>,

    /// How long to wait for SSDP answers (ms)
    #[arg(long, default_value_t = 3000)]
    search_window_ms: u64,
}

/// Registry standing in for the host's accessory cache
#[derive(Default)]
struct MemoryRegistry {
    accessories: Mutex<BTreeMap<Uuid, AccessoryHandle>>,
}

impl AccessoryRegistry for MemoryRegistry {
    fn cached(&self, uuid: &Uuid) -> Option<AccessoryHandle> {
        self.accessories.lock().ok()?.get(uuid).cloned()
    }

    fn cached_uuids(&self) -> Vec<Uuid> {
        self.accessories
            .lock()
            .map(|a| a.keys().copied().collect())
            .unwrap_or_default()
    }

    fn register(&self, plugin: &str, platform: &str, handle: AccessoryHandle) {
        tracing::info!("[{}/{}] register {}", plugin, platform, handle.display_name);
        if let Ok(mut accessories) = self.accessories.lock() {
            accessories.insert(handle.uuid, handle);
        }
    }

    fn update(&self, handle: AccessoryHandle) {
        if let Ok(mut accessories) = self.accessories.lock() {
            accessories.insert(handle.uuid, handle);
        }
    }

    fn unregister(&self, plugin: &str, platform: &str, uuids: &[Uuid]) {
        tracing::info!("[{}/{}] unregister {} accessory(ies)", plugin, platform, uuids.len());
        if let Ok(mut accessories) = self.accessories.lock() {
            for uuid in uuids {
                accessories.remove(uuid);
            }
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<Option<PlatformConfig>> {
    if let Some(path) = &args.config {
        let config = PlatformConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        return Ok(Some(config));
    }
    if let Some(path) = &args.host_config {
        return PlatformConfig::from_host_config_file(path)
            .with_context(|| format!("failed to load {}", path.display()));
    }
    Ok(None)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let discovery =
        SsdpDiscovery::new().with_window(Duration::from_millis(args.search_window_ms));
    let platform = Platform::new(config, Arc::new(discovery))?;

    let registry = MemoryRegistry::default();
    let accessories = platform.launch(&registry).await?;

    for accessory in &accessories {
        println!("{}", serde_json::to_string_pretty(accessory.device())?);
    }

    if !args.poll || accessories.is_empty() {
        return Ok(());
    }

    let mut poller = Poller::new();
    let mut updates = poller.subscribe();
    poller
        .start(
            accessories,
            args.interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_POLLING_INTERVAL),
        )
        .await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                break;
            }
            update = next_update(&mut updates) => {
                match update {
                    Ok(update) => tracing::info!("[{}] {:?}", update.name, update.state),
                    Err(e) => tracing::warn!("{}", e),
                }
            }
        }
    }

    poller.stop().await;
    Ok(())
}
