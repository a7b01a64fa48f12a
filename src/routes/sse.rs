use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{
    services::sse_service,
    state::{SharedState, Topic},
};

#[utoipa::path(
    get,
    path = "/sse/questions",
    tag = "sse",
    responses((status = 200, description = "Active question stream", content_type = "text/event-stream", body = String))
)]
/// Stream the active question to connected clients.
pub async fn questions_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    topic_stream(state, Topic::Questions).await
}

#[utoipa::path(
    get,
    path = "/sse/users",
    tag = "sse",
    responses((status = 200, description = "Scoreboard stream", content_type = "text/event-stream", body = String))
)]
/// Stream the scoreboard to connected clients.
pub async fn users_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    topic_stream(state, Topic::Users).await
}

#[utoipa::path(
    get,
    path = "/sse/notifications",
    tag = "sse",
    responses((status = 200, description = "Notification stream", content_type = "text/event-stream", body = String))
)]
/// Stream win notifications to connected clients.
pub async fn notifications_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    topic_stream(state, Topic::Notifications).await
}

async fn topic_stream(
    state: SharedState,
    topic: Topic,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let (receiver, subscription) = sse_service::subscribe_topic(&state, topic);
    info!(topic = topic.as_str(), "new SSE connection");
    sse_service::broadcast_handshake(&state, topic).await;
    sse_service::to_sse_stream(receiver, subscription)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/questions", get(questions_stream))
        .route("/sse/users", get(users_stream))
        .route("/sse/notifications", get(notifications_stream))
}
