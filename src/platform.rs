use crate::accessory::{AccessoryRegistry, AccessoryState, SpeakerAccessory};
use crate::config::{PlatformConfig, PLATFORM_NAME, PLUGIN_NAME};
use crate::device::{resolve_configured_devices, search_all_devices, SoundTouchDevice};
use crate::discovery::DeviceDiscovery;
use crate::error::{BridgeError, Result};
use crate::resolve::resolve_verbosity;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

/// Polling cadence used when neither layer sets one
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(5000);

/// SoundTouch platform
///
/// Owns the validated configuration and turns discovered speakers into
/// registered accessories.
///
/// # Example
///
/// ```no_run
/// use soundtouch_bridge::{Platform, PlatformConfig, SsdpDiscovery};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = PlatformConfig::from_file("soundtouch.json")?;
///     let platform = Platform::new(Some(config), Arc::new(SsdpDiscovery::new()))?;
///     for device in platform.search_devices().await? {
///         println!("{} ({})", device.resolved.name, device.resolved.model);
///     }
///     Ok(())
/// }
/// ```
pub struct Platform {
    config: PlatformConfig,
    discovery: Arc<dyn DeviceDiscovery>,
}

impl Platform {
    /// Validate the configuration; an absent one falls back to the defaults
    pub fn new(config: Option<PlatformConfig>, discovery: Arc<dyn DeviceDiscovery>) -> Result<Self> {
        let config = PlatformConfig::validate_or_default(config)?;
        Ok(Self { config, discovery })
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    fn verbose(&self) -> bool {
        resolve_verbosity(&[&self.config.global()])
    }

    /// Resolve the speakers to expose
    pub async fn search_devices(&self) -> Result<Vec<SoundTouchDevice>> {
        let global = self.config.global();
        let accessories = self.config.accessories();

        if self.config.discovers_all() {
            search_all_devices(self.discovery.as_ref(), &global, &accessories).await
        } else {
            Ok(resolve_configured_devices(self.discovery.as_ref(), &global, &accessories).await)
        }
    }

    /// Resolve speakers and attach them to the host registry
    ///
    /// Cached accessories are reused, new ones registered, and cached
    /// accessories whose speaker was not found are unregistered.
    pub async fn launch(&self, registry: &dyn AccessoryRegistry) -> Result<Vec<SpeakerAccessory>> {
        if self.verbose() {
            tracing::info!("Searching accessories...");
        }

        let devices = self.search_devices().await?;
        let accessories: Vec<SpeakerAccessory> = devices
            .into_iter()
            .map(|device| attach_accessory(registry, device))
            .collect();

        clear_unreachable_accessories(registry, &accessories);

        if self.verbose() {
            tracing::info!("Finish searching accessories");
        }
        Ok(accessories)
    }
}

/// Attach a device to its cached accessory, or register a new one
fn attach_accessory(registry: &dyn AccessoryRegistry, device: SoundTouchDevice) -> SpeakerAccessory {
    let accessory = SpeakerAccessory::new(device);
    let handle = accessory.handle();

    if registry.cached(&handle.uuid).is_some() {
        tracing::debug!("Reusing cached accessory {}", handle.uuid);
        registry.update(handle);
    } else {
        tracing::info!("Registering accessory '{}'", handle.display_name);
        registry.register(PLUGIN_NAME, PLATFORM_NAME, handle);
    }

    accessory
}

fn clear_unreachable_accessories(registry: &dyn AccessoryRegistry, accessories: &[SpeakerAccessory]) {
    let reachable: BTreeSet<Uuid> = accessories.iter().map(|a| a.uuid()).collect();
    let unreachable: Vec<Uuid> = registry
        .cached_uuids()
        .into_iter()
        .filter(|uuid| !reachable.contains(uuid))
        .collect();

    if !unreachable.is_empty() {
        tracing::info!("Unregistering {} unreachable accessory(ies)", unreachable.len());
        registry.unregister(PLUGIN_NAME, PLATFORM_NAME, &unreachable);
    }
}

/// State update produced by the poller
#[derive(Debug, Clone)]
pub struct StateUpdate {
    pub uuid: Uuid,
    pub name: String,
    pub state: AccessoryState,
}

/// Periodic state synchronisation
///
/// Runs one background task per accessory and broadcasts every snapshot it
/// reads. Poll failures are logged and the loop keeps going.
pub struct Poller {
    update_tx: broadcast::Sender<StateUpdate>,
    stop_tx: Option<broadcast::Sender<()>>,
    task_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl Poller {
    pub fn new() -> Self {
        let (update_tx, _) = broadcast::channel(100);
        Self {
            update_tx,
            stop_tx: None,
            task_handles: Vec::new(),
        }
    }

    /// Subscribe to state updates
    pub fn subscribe(&self) -> broadcast::Receiver<StateUpdate> {
        self.update_tx.subscribe()
    }

    /// Start polling; a running poller is stopped first
    pub async fn start(&mut self, accessories: Vec<SpeakerAccessory>, default_interval: Duration) {
        self.stop().await;

        let (stop_tx, _) = broadcast::channel(1);
        self.stop_tx = Some(stop_tx.clone());

        for accessory in accessories {
            let period = accessory
                .device()
                .polling_interval
                .map(Duration::from_millis)
                .unwrap_or(default_interval);
            let update_tx = self.update_tx.clone();
            let mut stop_rx = stop_tx.subscribe();

            let handle = tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = stop_rx.recv() => {
                            tracing::debug!("Polling of {} stopped", accessory.device().name);
                            break;
                        }
                        _ = ticker.tick() => {
                            match accessory.poll().await {
                                Ok(state) => {
                                    let _ = update_tx.send(StateUpdate {
                                        uuid: accessory.uuid(),
                                        name: accessory.device().name.clone(),
                                        state,
                                    });
                                }
                                Err(e) => {
                                    tracing::warn!("Failed to poll {}: {}", accessory.device().name, e);
                                }
                            }
                        }
                    }
                }
            });
            self.task_handles.push(handle);
        }
    }

    /// Stop all polling tasks
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        for mut handle in self.task_handles.drain(..) {
            // Give it a moment to stop gracefully; a task stuck in a poll is aborted
            if tokio::time::timeout(Duration::from_millis(500), &mut handle)
                .await
                .is_err()
            {
                handle.abort();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive the next update, mapping channel errors
pub async fn next_update(rx: &mut broadcast::Receiver<StateUpdate>) -> Result<StateUpdate> {
    rx.recv().await.map_err(|e| match e {
        broadcast::error::RecvError::Closed => BridgeError::ChannelError("poller stopped".to_string()),
        broadcast::error::RecvError::Lagged(n) => {
            BridgeError::ChannelError(format!("Lagged by {} messages", n))
        }
    })
}
