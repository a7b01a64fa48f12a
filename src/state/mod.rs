pub mod hub;
pub mod round;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;

use crate::{config::GameConfig, dao::store::GameStore, error::ServiceError};

pub use self::hub::{EventHub, Topic, TopicHub, TopicSubscription};
pub use self::round::RoundPhase;

/// Shared handle to the central application state.
pub type SharedState = Arc<AppState>;

/// Capacity of each topic's broadcast channel.
const HUB_CHANNEL_CAPACITY: usize = 16;

/// Central application state storing the storage handle, the event hub, and
/// the pending regeneration task.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    hub: EventHub,
    degraded: watch::Sender<bool>,
    config: GameConfig,
    regeneration: Mutex<Option<JoinHandle<()>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: GameConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            hub: EventHub::new(HUB_CHANNEL_CAPACITY),
            degraded: degraded_tx,
            config,
            regeneration: Mutex::new(None),
        })
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the game store or fail with a degraded-mode error.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.game_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// Fan-out hub for realtime topics.
    pub fn event_hub(&self) -> &EventHub {
        &self.hub
    }

    /// Immutable game configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Track the pending regeneration task, replacing any finished predecessor.
    ///
    /// At most one regeneration is in flight at a time because each win closes
    /// its question before the next one can be claimed.
    pub async fn track_regeneration(&self, handle: JoinHandle<()>) {
        let mut slot = self.regeneration.lock().await;
        *slot = Some(handle);
    }

    /// Cancel the pending regeneration task, if any. Used on shutdown.
    pub async fn abort_regeneration(&self) {
        let mut slot = self.regeneration.lock().await;
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}
