use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// A single arithmetic question persisted by the storage layer.
///
/// At most one question row is active at any instant; the storage backend
/// enforces this when a new row is opened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Primary key of the question.
    pub id: Uuid,
    /// Display text shown to players (e.g. `"5 + 3"`).
    pub question_text: String,
    /// The correct integer answer. Never exposed to clients.
    pub answer: i64,
    /// Whether this question is currently open for submissions.
    pub is_active: bool,
    /// The user who claimed the win, set exactly once when the row closes.
    pub winner_id: Option<Uuid>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

impl QuestionEntity {
    /// Build a fresh active question row from generated text and answer.
    pub fn open(question_text: String, answer: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            question_text,
            answer,
            is_active: true,
            winner_id: None,
            created_at: SystemTime::now(),
        }
    }
}

/// A player record created on first join under a given display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Primary key of the user.
    pub id: Uuid,
    /// Unique display name chosen on join.
    pub username: String,
    /// Current score. Monotonically non-decreasing.
    pub score: i64,
    /// Last time the row was updated.
    pub updated_at: SystemTime,
}

impl UserEntity {
    /// Build a new user row with a zero score.
    pub fn new(username: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            score: 0,
            updated_at: SystemTime::now(),
        }
    }
}

/// Append-only audit record of one answer submission.
///
/// Every submission produces exactly one row, including race losses; rows are
/// never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerAttemptEntity {
    /// Primary key of the attempt.
    pub id: Uuid,
    /// Question the answer was submitted against.
    pub question_id: Uuid,
    /// Submitting user.
    pub user_id: Uuid,
    /// The submitted integer value.
    pub answer: i64,
    /// Whether the submitted value matched the question's answer.
    pub is_correct: bool,
    /// Submission timestamp.
    pub created_at: SystemTime,
}

impl AnswerAttemptEntity {
    /// Record a submission against `question_id` by `user_id`.
    pub fn record(question_id: Uuid, user_id: Uuid, answer: i64, is_correct: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            question_id,
            user_id,
            answer,
            is_correct,
            created_at: SystemTime::now(),
        }
    }
}

/// Best score ever achieved by a display name, retained independently of the
/// live user row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HighScoreEntity {
    /// Display name; unique within the high-score table.
    pub username: String,
    /// The recorded best score. Raise-only.
    pub score: i64,
    /// When the recorded score was achieved.
    pub achieved_at: SystemTime,
}

/// Broadcast message row. Append-only; clients expire it locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationEntity {
    /// Human-readable message text.
    pub message: String,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

impl NotificationEntity {
    /// Build a notification carrying `message`.
    pub fn new(message: String) -> Self {
        Self {
            message,
            created_at: SystemTime::now(),
        }
    }
}
