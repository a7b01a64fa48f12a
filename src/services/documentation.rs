use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Math Rush Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::join_game,
        crate::routes::game::submit_answer,
        crate::routes::game::get_current_question,
        crate::routes::game::get_users,
        crate::routes::game::get_high_scores,
        crate::routes::sse::questions_stream,
        crate::routes::sse::users_stream,
        crate::routes::sse::notifications_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::JoinGameRequest,
            crate::dto::game::UserSummary,
            crate::dto::game::UsersResponse,
            crate::dto::game::SubmitAnswerRequest,
            crate::dto::game::AnswerOutcome,
            crate::dto::game::AnswerResponse,
            crate::dto::game::QuestionSnapshot,
            crate::dto::game::HighScoreSummary,
            crate::dto::game::HighScoresResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::ActiveQuestionEvent,
            crate::dto::sse::ScoreboardEvent,
            crate::dto::sse::NotificationEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Join, answer, and score operations"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
