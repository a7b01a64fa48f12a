//! Global notification broadcasts persisted through the store.

use std::sync::Arc;

use tracing::warn;

use crate::dao::{models::NotificationEntity, store::GameStore};

/// Append a win notification naming the winner.
///
/// Best effort: the claim has already committed, so a failed broadcast is
/// logged and swallowed rather than failing the submission.
pub async fn broadcast_win(store: &Arc<dyn GameStore>, username: &str, points: u32) {
    let message = format!("{username} got it right! +{points} points");
    if let Err(err) = store.add_notification(NotificationEntity::new(message)).await {
        warn!(username, error = %err, "failed to broadcast win notification");
    }
}
