//! Round lifecycle: question activation, post-win regeneration, recovery.
//!
//! The authoritative round state is the question row itself; every path here
//! recomputes it from storage rather than trusting in-process state.

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::models::QuestionEntity,
    dto::game::QuestionSnapshot,
    error::ServiceError,
    services::question_generator,
    state::{RoundPhase, SharedState},
};

/// Return the active question, creating one when none exists.
///
/// Idempotent: concurrent callers converge on a single question because the
/// store refuses to open a second active row; a caller that loses that race
/// re-reads and returns the row the winner created.
pub async fn ensure_active_question(state: &SharedState) -> Result<QuestionEntity, ServiceError> {
    let store = state.require_game_store().await?;

    if let Some(active) = store.find_active_question().await? {
        return Ok(active);
    }

    let draft = {
        let mut rng = rand::rng();
        question_generator::generate(&mut rng)
    };
    let candidate = QuestionEntity::open(draft.question_text, draft.answer);

    match store.open_question(candidate).await? {
        Some(created) => {
            info!(id = %created.id, text = %created.question_text, "opened new question");
            Ok(created)
        }
        // Lost the creation race: another caller opened a question between our
        // read and our insert.
        None => store
            .find_active_question()
            .await?
            .ok_or(ServiceError::NoActiveQuestion),
    }
}

/// Client-facing snapshot of the active question, if any.
pub async fn current_question(
    state: &SharedState,
) -> Result<Option<QuestionSnapshot>, ServiceError> {
    let store = state.require_game_store().await?;
    Ok(store.find_active_question().await?.map(Into::into))
}

/// Schedule creation of the next question after a win.
///
/// The delay lets clients display the winner's name before the question
/// changes. The task is tracked in [`AppState`](crate::state::AppState) so
/// shutdown can cancel it; a crash during the delay window is healed by
/// [`recover_round`] on the next startup.
pub async fn schedule_regeneration(state: &SharedState) {
    let delay = state.config().regeneration_delay;
    let task_state = state.clone();

    let handle = tokio::spawn(async move {
        sleep(delay).await;
        match ensure_active_question(&task_state).await {
            Ok(question) => info!(id = %question.id, "regenerated question after win"),
            Err(err) => warn!(error = %err, "failed to regenerate question after win"),
        }
    });

    state.track_regeneration(handle).await;
}

/// Startup recovery: a closed latest question with no successor means the
/// original regeneration timer did not survive; regenerate immediately.
pub async fn recover_round(state: &SharedState) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    let latest = store.latest_question().await?;

    if RoundPhase::from_latest(latest.as_ref()).needs_regeneration() {
        info!("found closed question without successor; regenerating now");
        ensure_active_question(state).await?;
    }

    Ok(())
}
