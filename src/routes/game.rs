use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::game::{
        AnswerResponse, HighScoresResponse, JoinGameRequest, QuestionSnapshot,
        SubmitAnswerRequest, UserSummary, UsersResponse,
    },
    error::AppError,
    services::{answer_service, question_service, score_service, user_service},
    state::SharedState,
};

/// Routes for joining, answering, and reading scores.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/game/join", post(join_game))
        .route("/game/answer", post(submit_answer))
        .route("/game/question", get(get_current_question))
        .route("/game/users", get(get_users))
        .route("/game/high-scores", get(get_high_scores))
}

#[utoipa::path(
    post,
    path = "/game/join",
    tag = "game",
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Joined; returns the existing player for a reused name", body = UserSummary),
        (status = 400, description = "Invalid display name")
    )
)]
/// Join the game under a display name, ensuring a round is open.
pub async fn join_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JoinGameRequest>>,
) -> Result<Json<UserSummary>, AppError> {
    let user = user_service::join_game(&state, payload).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/game/answer",
    tag = "game",
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Submission processed; the body distinguishes win, wrong answer, and race loss", body = AnswerResponse),
        (status = 409, description = "No active question")
    )
)]
/// Submit an answer against the active question.
pub async fn submit_answer(
    State(state): State<SharedState>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let response = answer_service::submit_answer(&state, payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/game/question",
    tag = "game",
    responses(
        (status = 200, description = "The active question", body = QuestionSnapshot),
        (status = 404, description = "No active question")
    )
)]
/// Return the question currently open for submissions.
pub async fn get_current_question(
    State(state): State<SharedState>,
) -> Result<Json<QuestionSnapshot>, AppError> {
    let snapshot = question_service::current_question(&state).await?;
    match snapshot {
        Some(question) => Ok(Json(question)),
        None => Err(AppError::NotFound("no active question".into())),
    }
}

#[utoipa::path(
    get,
    path = "/game/users",
    tag = "game",
    responses((status = 200, description = "All players ordered by score", body = UsersResponse))
)]
/// Return the scoreboard: every player ordered by score descending.
pub async fn get_users(
    State(state): State<SharedState>,
) -> Result<Json<UsersResponse>, AppError> {
    let users = user_service::list_users(&state).await?;
    Ok(Json(UsersResponse { users }))
}

#[utoipa::path(
    get,
    path = "/game/high-scores",
    tag = "game",
    responses((status = 200, description = "Top retained scores", body = HighScoresResponse))
)]
/// Return the retained top scores, best first.
pub async fn get_high_scores(
    State(state): State<SharedState>,
) -> Result<Json<HighScoresResponse>, AppError> {
    let entries = score_service::high_scores(&state).await?;
    Ok(Json(HighScoresResponse { entries }))
}
