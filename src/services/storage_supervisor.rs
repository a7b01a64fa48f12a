use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{storage::StorageError, store::GameStore},
    services::question_service,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the storage backend and keep the shared state in degraded mode
/// while it is unavailable. After each successful install the round is
/// recovered, so a regeneration timer lost to a restart is replayed.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_game_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                if let Err(err) = question_service::recover_round(&state).await {
                    warn!(error = %err, "round recovery after connect failed");
                }

                loop {
                    match store.health_check().await {
                        Ok(()) => {
                            state.update_degraded(false);
                            sleep(HEALTH_POLL_INTERVAL).await;
                        }
                        Err(_) => {
                            if !reconnect_with_backoff(&state, store.as_ref()).await {
                                warn!(
                                    "exhausted storage reconnect attempts; staying in degraded mode"
                                );
                                break;
                            }
                            state.update_degraded(false);
                            sleep(HEALTH_POLL_INTERVAL).await;
                        }
                    }
                }

                state.clear_game_store().await;
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Try to re-establish the backend connection a bounded number of times,
/// flipping the degraded flag on the first failure.
async fn reconnect_with_backoff(state: &SharedState, store: &dyn GameStore) -> bool {
    let mut attempt = 0;
    let mut reconnect_delay = INITIAL_DELAY;

    while attempt < MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!("storage reconnection succeeded after health check failure");
                return true;
            }
            Err(reconnect_err) => {
                if attempt == 0 {
                    warn!(
                        attempt, error = %reconnect_err,
                        "storage reconnect first attempt failed; entering degraded mode"
                    );
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                }
                attempt += 1;
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }

    false
}
