//! Topic feed relays: bridge store change feeds into hub broadcasts.
//!
//! A relay holds no history. On every change event it reloads the current
//! derived value for its topic and fans that out, so a slow listener simply
//! sees the latest value on its next receive.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    dao::store::GameStore,
    dto::sse::{ActiveQuestionEvent, NotificationEvent, ScoreboardEvent, ServerEvent},
    error::ServiceError,
    state::{SharedState, Topic},
};

const EVENT_QUESTION: &str = "question";
const EVENT_SCOREBOARD: &str = "scoreboard";
const EVENT_NOTIFICATION: &str = "notification";

/// Spawn the upstream relay task for `topic`.
///
/// The task waits out degraded mode, performs an initial full reload so the
/// first subscriber is caught up, then republishes the derived value on every
/// change event. It is aborted by the hub when the last subscriber leaves.
pub(crate) fn spawn_topic_feed(state: SharedState, topic: Topic) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Some(store) = state.game_store().await else {
                let mut watcher = state.degraded_watcher();
                if watcher.wait_for(|degraded| !*degraded).await.is_err() {
                    return;
                }
                continue;
            };

            let mut feed = store.watch(topic.table());
            publish_topic_snapshot(&state, topic).await;

            loop {
                match feed.recv().await {
                    Ok(_change) => publish_topic_snapshot(&state, topic).await,
                    Err(RecvError::Lagged(skipped)) => {
                        // Missed events are harmless: the snapshot we publish
                        // is always the latest value.
                        debug!(topic = topic.as_str(), skipped, "feed lagged; republishing");
                        publish_topic_snapshot(&state, topic).await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            // Feed closed means the store was replaced; reopen against the
            // new one.
        }
    })
}

/// Reload the derived value for `topic` and broadcast it to all listeners.
pub(crate) async fn publish_topic_snapshot(state: &SharedState, topic: Topic) {
    let Some(store) = state.game_store().await else {
        return;
    };

    match build_topic_event(&store, topic).await {
        Ok(Some(event)) => state.event_hub().topic(topic).broadcast(event),
        Ok(None) => {}
        Err(err) => {
            warn!(topic = topic.as_str(), error = %err, "failed to build topic snapshot");
        }
    }
}

async fn build_topic_event(
    store: &Arc<dyn GameStore>,
    topic: Topic,
) -> Result<Option<ServerEvent>, ServiceError> {
    match topic {
        Topic::Questions => {
            let question = store.find_active_question().await?;
            serialize_event(
                EVENT_QUESTION,
                &ActiveQuestionEvent {
                    question: question.map(Into::into),
                },
            )
        }
        Topic::Users => {
            let users = store.list_users().await?;
            serialize_event(
                EVENT_SCOREBOARD,
                &ScoreboardEvent {
                    users: users.into_iter().map(Into::into).collect(),
                },
            )
        }
        Topic::Notifications => match store.latest_notification().await? {
            // Nothing broadcast yet; new subscribers start empty.
            None => Ok(None),
            Some(notification) => {
                serialize_event(EVENT_NOTIFICATION, &NotificationEvent::from(notification))
            }
        },
    }
}

fn serialize_event(
    name: &str,
    payload: &impl Serialize,
) -> Result<Option<ServerEvent>, ServiceError> {
    match ServerEvent::json(Some(name.to_string()), payload) {
        Ok(event) => Ok(Some(event)),
        Err(err) => {
            warn!(event = name, error = %err, "failed to serialize SSE payload");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    use crate::{
        config::GameConfig,
        dao::{
            models::{NotificationEntity, QuestionEntity, UserEntity},
            store::memory::MemoryGameStore,
        },
        state::AppState,
    };

    async fn state_with_store() -> (SharedState, Arc<dyn GameStore>) {
        let state = AppState::new(GameConfig::default());
        let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
        state.install_game_store(store.clone()).await;
        (state, store)
    }

    async fn recv_event(
        receiver: &mut tokio::sync::broadcast::Receiver<ServerEvent>,
    ) -> ServerEvent {
        timeout(Duration::from_secs(1), receiver.recv())
            .await
            .expect("timed out waiting for event")
            .expect("hub channel closed")
    }

    #[tokio::test]
    async fn question_feed_delivers_initial_snapshot_and_updates() {
        let (state, store) = state_with_store().await;
        store
            .open_question(QuestionEntity::open("5 + 3".into(), 8))
            .await
            .unwrap()
            .unwrap();

        let hub = state.event_hub().topic(Topic::Questions);
        let (mut receiver, opened) =
            hub.subscribe_with(|| spawn_topic_feed(state.clone(), Topic::Questions));
        assert!(opened);

        let initial = recv_event(&mut receiver).await;
        assert_eq!(initial.event.as_deref(), Some("question"));
        assert!(initial.data.contains("5 + 3"));
        // The correct answer must never reach clients.
        assert!(!initial.data.contains("answer"));

        // Closing the question produces a null-question snapshot.
        let question = store.find_active_question().await.unwrap().unwrap();
        store
            .claim_question(question.id, uuid::Uuid::new_v4())
            .await
            .unwrap();

        let update = recv_event(&mut receiver).await;
        assert_eq!(update.event.as_deref(), Some("question"));
        assert!(update.data.contains("null"));

        hub.unsubscribe();
    }

    #[tokio::test]
    async fn scoreboard_feed_reacts_to_user_changes() {
        let (state, store) = state_with_store().await;

        let hub = state.event_hub().topic(Topic::Users);
        let (mut receiver, _) =
            hub.subscribe_with(|| spawn_topic_feed(state.clone(), Topic::Users));

        // Initial (empty) scoreboard.
        let initial = recv_event(&mut receiver).await;
        assert_eq!(initial.event.as_deref(), Some("scoreboard"));

        store
            .create_user_if_absent(UserEntity::new("alice".into()))
            .await
            .unwrap();

        let update = recv_event(&mut receiver).await;
        assert!(update.data.contains("alice"));

        hub.unsubscribe();
    }

    #[tokio::test]
    async fn notification_feed_skips_empty_history() {
        let (state, store) = state_with_store().await;

        let hub = state.event_hub().topic(Topic::Notifications);
        let (mut receiver, _) =
            hub.subscribe_with(|| spawn_topic_feed(state.clone(), Topic::Notifications));

        store
            .add_notification(NotificationEntity::new("alice got it right!".into()))
            .await
            .unwrap();

        // The first delivered event is the inserted notification, not an
        // initial empty snapshot.
        let event = recv_event(&mut receiver).await;
        assert_eq!(event.event.as_deref(), Some("notification"));
        assert!(event.data.contains("alice"));

        hub.unsubscribe();
    }
}
