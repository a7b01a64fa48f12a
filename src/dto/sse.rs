use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::NotificationEntity,
    dto::{
        format_system_time,
        game::{QuestionSnapshot, UserSummary},
    },
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from a pre-rendered data string.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Topic the stream carries (`questions`, `users`, or `notifications`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever the active question changes; `None` between a win and
/// the regenerated question.
pub struct ActiveQuestionEvent {
    pub question: Option<QuestionSnapshot>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever any user row changes; carries the full ordered list.
pub struct ScoreboardEvent {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a notification row is appended. Clients expire it locally.
pub struct NotificationEvent {
    pub message: String,
    pub created_at: String,
}

impl From<NotificationEntity> for NotificationEvent {
    fn from(entity: NotificationEntity) -> Self {
        Self {
            message: entity.message,
            created_at: format_system_time(entity.created_at),
        }
    }
}
