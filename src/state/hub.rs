//! Fan-out hub for realtime topics.
//!
//! Each topic owns a broadcast channel plus one reference-counted upstream
//! store feed: the first subscriber opens the feed, the last one tears it
//! down. The hub never queues history; subscribers receive the latest derived
//! value published after they joined.

use std::sync::Mutex;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::dao::store::StoreTable;
use crate::dto::sse::ServerEvent;
use crate::state::SharedState;

/// Realtime topics exposed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// The currently active question.
    Questions,
    /// The full user list ordered by score.
    Users,
    /// Win broadcasts and other global messages.
    Notifications,
}

impl Topic {
    /// Store table whose change feed backs this topic.
    pub fn table(self) -> StoreTable {
        match self {
            Topic::Questions => StoreTable::Questions,
            Topic::Users => StoreTable::Users,
            Topic::Notifications => StoreTable::Notifications,
        }
    }

    /// Topic name used in logs and stream handshakes.
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Questions => "questions",
            Topic::Users => "users",
            Topic::Notifications => "notifications",
        }
    }
}

/// Per-topic hubs owned by the application state.
pub struct EventHub {
    questions: TopicHub,
    users: TopicHub,
    notifications: TopicHub,
}

impl EventHub {
    /// Build the hub with one broadcast channel of `capacity` per topic.
    pub fn new(capacity: usize) -> Self {
        Self {
            questions: TopicHub::new(capacity),
            users: TopicHub::new(capacity),
            notifications: TopicHub::new(capacity),
        }
    }

    /// Access the hub backing `topic`.
    pub fn topic(&self, topic: Topic) -> &TopicHub {
        match topic {
            Topic::Questions => &self.questions,
            Topic::Users => &self.users,
            Topic::Notifications => &self.notifications,
        }
    }
}

/// Broadcast hub for a single topic with reference-counted upstream feed.
pub struct TopicHub {
    sender: broadcast::Sender<ServerEvent>,
    upstream: Mutex<Upstream>,
}

struct Upstream {
    listeners: usize,
    feed: Option<JoinHandle<()>>,
}

impl TopicHub {
    fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self {
            sender,
            upstream: Mutex::new(Upstream {
                listeners: 0,
                feed: None,
            }),
        }
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    /// Register a subscriber. When this is the first listener, `open_feed` is
    /// invoked to spawn the upstream relay task; the returned flag tells the
    /// caller whether that happened.
    pub fn subscribe_with<F>(&self, open_feed: F) -> (broadcast::Receiver<ServerEvent>, bool)
    where
        F: FnOnce() -> JoinHandle<()>,
    {
        let receiver = self.sender.subscribe();

        let mut upstream = self.lock_upstream();
        upstream.listeners += 1;
        let opened = upstream.listeners == 1;
        if opened {
            upstream.feed = Some(open_feed());
        }

        (receiver, opened)
    }

    /// Deregister a subscriber, tearing the upstream feed down with the last
    /// listener.
    pub fn unsubscribe(&self) {
        let mut upstream = self.lock_upstream();
        upstream.listeners = upstream.listeners.saturating_sub(1);
        if upstream.listeners == 0 {
            if let Some(feed) = upstream.feed.take() {
                feed.abort();
            }
        }
    }

    /// Number of currently registered subscribers.
    pub fn listener_count(&self) -> usize {
        self.lock_upstream().listeners
    }

    /// Whether the upstream feed task is currently open.
    pub fn feed_open(&self) -> bool {
        self.lock_upstream().feed.is_some()
    }

    fn lock_upstream(&self) -> std::sync::MutexGuard<'_, Upstream> {
        match self.upstream.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Guard representing one topic subscription; dropping it releases the slot
/// and tears the upstream feed down when it was the last one.
pub struct TopicSubscription {
    state: SharedState,
    topic: Topic,
}

impl TopicSubscription {
    /// Bind a subscription guard to `topic` on the hub owned by `state`.
    pub fn new(state: SharedState, topic: Topic) -> Self {
        Self { state, topic }
    }

    /// Topic this subscription belongs to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

impl Drop for TopicSubscription {
    fn drop(&mut self) {
        self.state.event_hub().topic(self.topic).unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_task() -> JoinHandle<()> {
        tokio::spawn(async {
            std::future::pending::<()>().await;
        })
    }

    #[tokio::test]
    async fn first_subscriber_opens_feed_once() {
        let hub = TopicHub::new(8);

        let (_rx1, opened1) = hub.subscribe_with(idle_task);
        let (_rx2, opened2) = hub.subscribe_with(idle_task);

        assert!(opened1);
        assert!(!opened2);
        assert_eq!(hub.listener_count(), 2);
        assert!(hub.feed_open());
    }

    #[tokio::test]
    async fn last_unsubscribe_tears_feed_down() {
        let hub = TopicHub::new(8);

        let (_rx1, _) = hub.subscribe_with(idle_task);
        let (_rx2, _) = hub.subscribe_with(idle_task);

        hub.unsubscribe();
        assert!(hub.feed_open());

        hub.unsubscribe();
        assert_eq!(hub.listener_count(), 0);
        assert!(!hub.feed_open());
    }

    #[tokio::test]
    async fn resubscribe_after_teardown_reopens_feed() {
        let hub = TopicHub::new(8);

        let (_rx, _) = hub.subscribe_with(idle_task);
        hub.unsubscribe();

        let (_rx, opened) = hub.subscribe_with(idle_task);
        assert!(opened);
        assert!(hub.feed_open());
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let hub = TopicHub::new(8);
        let (mut receiver, _) = hub.subscribe_with(idle_task);

        hub.broadcast(ServerEvent::new(Some("info".to_string()), "hello".into()));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("info"));
        assert_eq!(event.data, "hello");
    }
}
