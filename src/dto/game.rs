use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{HighScoreEntity, QuestionEntity, UserEntity},
    dto::{format_system_time, validation::validate_username},
};

/// Payload used to join the game under a display name.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinGameRequest {
    /// Display name; reused names return the existing player.
    #[validate(
        length(min = 1, max = 24),
        custom(function = validate_username)
    )]
    pub username: String,
}

/// Public projection of a player exposed to REST/SSE clients.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub score: i64,
}

impl From<UserEntity> for UserSummary {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            username: entity.username,
            score: entity.score,
        }
    }
}

/// Scoreboard listing, ordered by score descending.
#[derive(Debug, Serialize, ToSchema)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

/// Answer submission payload. Non-numeric values are rejected at the JSON
/// boundary before reaching the arbiter.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    /// Identifier returned by the join endpoint.
    pub user_id: Uuid,
    /// Submitted integer answer.
    pub answer: i64,
}

/// Outcome classification of an answer submission. Wrong answers and race
/// losses are ordinary outcomes, distinguishable from transport-level faults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// The submission claimed the win.
    Winner,
    /// The submitted value did not match the answer.
    Incorrect,
    /// The value was correct but another submitter claimed the win first.
    AlreadyWon,
}

/// Result of an answer submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResponse {
    /// Whether the submission was accepted as the winning answer.
    pub accepted: bool,
    /// Whether the submitter won the question.
    pub won: bool,
    /// Machine-readable outcome classification.
    pub outcome: AnswerOutcome,
    /// Human-readable message for direct display.
    pub message: String,
}

impl AnswerResponse {
    /// Winning submission response.
    pub fn winner(points: u32) -> Self {
        Self {
            accepted: true,
            won: true,
            outcome: AnswerOutcome::Winner,
            message: format!("You won! +{points} points"),
        }
    }

    /// Wrong-answer response; the question stays open.
    pub fn incorrect() -> Self {
        Self {
            accepted: false,
            won: false,
            outcome: AnswerOutcome::Incorrect,
            message: "Wrong answer, try again!".to_string(),
        }
    }

    /// Race-loss response; another submitter already claimed the win.
    pub fn already_won() -> Self {
        Self {
            accepted: false,
            won: false,
            outcome: AnswerOutcome::AlreadyWon,
            message: "Someone else got it first!".to_string(),
        }
    }
}

/// Client-facing view of a question. The correct answer is deliberately
/// absent; checking happens server-side only.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct QuestionSnapshot {
    pub id: Uuid,
    /// Display text, e.g. `"5 + 3"`.
    pub question: String,
    pub created_at: String,
}

impl From<QuestionEntity> for QuestionSnapshot {
    fn from(entity: QuestionEntity) -> Self {
        Self {
            id: entity.id,
            question: entity.question_text,
            created_at: format_system_time(entity.created_at),
        }
    }
}

/// One retained best-score entry.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct HighScoreSummary {
    pub username: String,
    pub score: i64,
    pub achieved_at: String,
}

impl From<HighScoreEntity> for HighScoreSummary {
    fn from(entity: HighScoreEntity) -> Self {
        Self {
            username: entity.username,
            score: entity.score,
            achieved_at: format_system_time(entity.achieved_at),
        }
    }
}

/// High-score listing, best first, capped at the configured size.
#[derive(Debug, Serialize, ToSchema)]
pub struct HighScoresResponse {
    pub entries: Vec<HighScoreSummary>,
}
