//! Topic subscription and SSE response plumbing.

use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    services::sse_events,
    state::{SharedState, Topic, TopicSubscription},
};

/// Register a subscriber on `topic`.
///
/// The first subscriber opens the topic's upstream store feed, which performs
/// the initial full reload. Later subscribers trigger a one-off republish of
/// the current derived value so they are caught up too.
pub fn subscribe_topic(
    state: &SharedState,
    topic: Topic,
) -> (broadcast::Receiver<ServerEvent>, TopicSubscription) {
    let hub = state.event_hub().topic(topic);
    let (receiver, opened) =
        hub.subscribe_with(|| sse_events::spawn_topic_feed(state.clone(), topic));

    if !opened {
        let snapshot_state = state.clone();
        tokio::spawn(async move {
            sse_events::publish_topic_snapshot(&snapshot_state, topic).await;
        });
    }

    (receiver, TopicSubscription::new(state.clone(), topic))
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// releasing the topic subscription once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    subscription: TopicSubscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!(topic = subscription.topic().as_str(), "SSE stream disconnected");
        // Dropping the subscription here releases the listener slot and tears
        // the upstream feed down when this was the last client.
        drop(subscription);
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Send the connection handshake onto a topic stream.
pub async fn broadcast_handshake(state: &SharedState, topic: Topic) {
    let payload = Handshake {
        stream: topic.as_str().to_string(),
        message: format!("{} stream connected", topic.as_str()),
        degraded: state.is_degraded().await,
    };

    if let Ok(event) = ServerEvent::json(Some("handshake".to_string()), &payload) {
        state.event_hub().topic(topic).broadcast(event);
    }
}
