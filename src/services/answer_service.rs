//! Answer arbitration: validates submissions against the active question and
//! performs the single-winner claim.
//!
//! Correctness under contention rests entirely on the store's conditional
//! update: the claim is a single compare-and-swap, never a read-then-write
//! pair, and nothing here retries internally. Score update, notification, and
//! regeneration run after the claim and are best effort; the win stands even
//! if they fail.

use tracing::{info, warn};

use crate::{
    dao::models::AnswerAttemptEntity,
    dto::game::{AnswerResponse, SubmitAnswerRequest},
    error::ServiceError,
    services::{notification_service, question_service, score_service},
    state::SharedState,
};

/// Fallback winner name when the user row cannot be read back.
const UNKNOWN_WINNER: &str = "Someone";

/// Submit an answer against the active question.
///
/// Every submission, win or lose, appends exactly one attempt to the audit
/// log before any outcome is returned. Exactly one of any number of
/// concurrent correct submissions observes a winning response.
pub async fn submit_answer(
    state: &SharedState,
    request: SubmitAnswerRequest,
) -> Result<AnswerResponse, ServiceError> {
    let store = state.require_game_store().await?;

    let Some(question) = store.find_active_question().await? else {
        return Err(ServiceError::NoActiveQuestion);
    };

    let is_correct = request.answer == question.answer;
    store
        .record_attempt(AnswerAttemptEntity::record(
            question.id,
            request.user_id,
            request.answer,
            is_correct,
        ))
        .await?;

    if !is_correct {
        return Ok(AnswerResponse::incorrect());
    }

    // The single-winner claim. Zero affected rows means another submitter got
    // there between our read and this write.
    if !store.claim_question(question.id, request.user_id).await? {
        return Ok(AnswerResponse::already_won());
    }

    info!(question_id = %question.id, user_id = %request.user_id, "win claimed");

    let points = state.config().win_points;
    let winner_name = match score_service::award_win(state, &store, request.user_id).await {
        Some(user) => user.username,
        None => {
            warn!(user_id = %request.user_id, "win stands but winner row was unreadable");
            UNKNOWN_WINNER.to_owned()
        }
    };

    notification_service::broadcast_win(&store, &winner_name, points).await;
    question_service::schedule_regeneration(state).await;

    Ok(AnswerResponse::winner(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};
    use uuid::Uuid;

    use crate::{
        config::GameConfig,
        dao::{
            models::{QuestionEntity, UserEntity},
            store::{GameStore, memory::MemoryGameStore},
        },
        dto::game::AnswerOutcome,
        state::AppState,
    };

    async fn game_with_question() -> (SharedState, Arc<dyn GameStore>, QuestionEntity) {
        // Long delay keeps the scheduled regeneration from opening a new
        // question while assertions run.
        let config = GameConfig {
            regeneration_delay: Duration::from_secs(60),
            ..GameConfig::default()
        };
        let state = AppState::new(config);
        let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
        state.install_game_store(store.clone()).await;

        let question = store
            .open_question(QuestionEntity::open("5 + 3".into(), 8))
            .await
            .unwrap()
            .unwrap();

        (state, store, question)
    }

    async fn join(store: &Arc<dyn GameStore>, name: &str) -> UserEntity {
        store
            .create_user_if_absent(UserEntity::new(name.into()))
            .await
            .unwrap()
    }

    fn submission(user: &UserEntity, answer: i64) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            user_id: user.id,
            answer,
        }
    }

    #[tokio::test]
    async fn winner_gets_points_and_question_closes() {
        let (state, store, question) = game_with_question().await;
        let alice = join(&store, "alice").await;

        let response = submit_answer(&state, submission(&alice, 8)).await.unwrap();

        assert!(response.accepted);
        assert!(response.won);
        assert_eq!(response.outcome, AnswerOutcome::Winner);

        let closed = store.latest_question().await.unwrap().unwrap();
        assert!(!closed.is_active);
        assert_eq!(closed.winner_id, Some(alice.id));

        let scored = store.find_user(alice.id).await.unwrap().unwrap();
        assert_eq!(scored.score, 10);

        let notification = store.latest_notification().await.unwrap().unwrap();
        assert!(notification.message.contains("alice"));

        let attempts = store.attempts_for_question(question.id).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].is_correct);
    }

    #[tokio::test]
    async fn wrong_answer_keeps_question_open() {
        let (state, store, question) = game_with_question().await;
        let alice = join(&store, "alice").await;

        let response = submit_answer(&state, submission(&alice, 7)).await.unwrap();

        assert!(!response.accepted);
        assert!(!response.won);
        assert_eq!(response.outcome, AnswerOutcome::Incorrect);

        let still_open = store.find_active_question().await.unwrap().unwrap();
        assert_eq!(still_open.id, question.id);

        let scored = store.find_user(alice.id).await.unwrap().unwrap();
        assert_eq!(scored.score, 0);

        let attempts = store.attempts_for_question(question.id).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(!attempts[0].is_correct);
    }

    #[tokio::test]
    async fn no_active_question_is_a_typed_error() {
        let state = AppState::new(GameConfig::default());
        let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
        state.install_game_store(store.clone()).await;
        let alice = join(&store, "alice").await;

        let err = submit_answer(&state, submission(&alice, 8)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoActiveQuestion));
    }

    #[tokio::test]
    async fn submission_after_close_sees_no_active_question() {
        let (state, store, _question) = game_with_question().await;
        let alice = join(&store, "alice").await;
        let bob = join(&store, "bob").await;

        submit_answer(&state, submission(&alice, 8)).await.unwrap();

        let err = submit_answer(&state, submission(&bob, 8)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoActiveQuestion));
    }

    /// Store wrapper that serves a stale active question, reproducing the
    /// window where the row closes between the arbiter's read and its claim.
    struct StaleReadStore {
        inner: Arc<dyn GameStore>,
        stale: QuestionEntity,
    }

    impl GameStore for StaleReadStore {
        fn find_active_question(
            &self,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<Option<QuestionEntity>>>
        {
            let stale = self.stale.clone();
            Box::pin(async move { Ok(Some(stale)) })
        }

        fn latest_question(
            &self,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<Option<QuestionEntity>>>
        {
            self.inner.latest_question()
        }

        fn open_question(
            &self,
            question: QuestionEntity,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<Option<QuestionEntity>>>
        {
            self.inner.open_question(question)
        }

        fn claim_question(
            &self,
            question_id: Uuid,
            winner_id: Uuid,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<bool>> {
            self.inner.claim_question(question_id, winner_id)
        }

        fn record_attempt(
            &self,
            attempt: crate::dao::models::AnswerAttemptEntity,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<()>> {
            self.inner.record_attempt(attempt)
        }

        fn attempts_for_question(
            &self,
            question_id: Uuid,
        ) -> futures::future::BoxFuture<
            'static,
            crate::dao::storage::StorageResult<Vec<crate::dao::models::AnswerAttemptEntity>>,
        > {
            self.inner.attempts_for_question(question_id)
        }

        fn create_user_if_absent(
            &self,
            user: UserEntity,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<UserEntity>>
        {
            self.inner.create_user_if_absent(user)
        }

        fn find_user(
            &self,
            id: Uuid,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<Option<UserEntity>>>
        {
            self.inner.find_user(id)
        }

        fn update_user_score(
            &self,
            id: Uuid,
            score: i64,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<bool>> {
            self.inner.update_user_score(id, score)
        }

        fn list_users(
            &self,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<Vec<UserEntity>>>
        {
            self.inner.list_users()
        }

        fn find_high_score(
            &self,
            username: &str,
        ) -> futures::future::BoxFuture<
            'static,
            crate::dao::storage::StorageResult<Option<crate::dao::models::HighScoreEntity>>,
        > {
            self.inner.find_high_score(username)
        }

        fn save_high_score(
            &self,
            entry: crate::dao::models::HighScoreEntity,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<()>> {
            self.inner.save_high_score(entry)
        }

        fn list_high_scores(
            &self,
            limit: usize,
        ) -> futures::future::BoxFuture<
            'static,
            crate::dao::storage::StorageResult<Vec<crate::dao::models::HighScoreEntity>>,
        > {
            self.inner.list_high_scores(limit)
        }

        fn trim_high_scores(
            &self,
            cap: usize,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<()>> {
            self.inner.trim_high_scores(cap)
        }

        fn add_notification(
            &self,
            notification: crate::dao::models::NotificationEntity,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<()>> {
            self.inner.add_notification(notification)
        }

        fn latest_notification(
            &self,
        ) -> futures::future::BoxFuture<
            'static,
            crate::dao::storage::StorageResult<Option<crate::dao::models::NotificationEntity>>,
        > {
            self.inner.latest_notification()
        }

        fn watch(
            &self,
            table: crate::dao::store::StoreTable,
        ) -> tokio::sync::broadcast::Receiver<crate::dao::store::StoreChange> {
            self.inner.watch(table)
        }

        fn health_check(
            &self,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(
            &self,
        ) -> futures::future::BoxFuture<'static, crate::dao::storage::StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    #[tokio::test]
    async fn stale_read_race_loser_gets_already_won() {
        let (state, store, question) = game_with_question().await;
        let alice = join(&store, "alice").await;
        let bob = join(&store, "bob").await;

        // Alice wins through the real store.
        submit_answer(&state, submission(&alice, 8)).await.unwrap();

        // Bob's arbiter read happened before the close: serve him the stale
        // row and let the conditional claim decide.
        let stale_state = AppState::new(GameConfig {
            regeneration_delay: Duration::from_secs(60),
            ..GameConfig::default()
        });
        stale_state
            .install_game_store(Arc::new(StaleReadStore {
                inner: store.clone(),
                stale: question.clone(),
            }))
            .await;

        let response = submit_answer(&stale_state, submission(&bob, 8)).await.unwrap();

        assert!(!response.accepted);
        assert!(!response.won);
        assert_eq!(response.outcome, AnswerOutcome::AlreadyWon);

        // No score change and no extra notification for the race loser.
        let scored = store.find_user(bob.id).await.unwrap().unwrap();
        assert_eq!(scored.score, 0);
        let notification = store.latest_notification().await.unwrap().unwrap();
        assert!(notification.message.contains("alice"));

        // Both correct submissions are in the audit log.
        let attempts = store.attempts_for_question(question.id).await.unwrap();
        assert_eq!(attempts.iter().filter(|a| a.is_correct).count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_correct_submissions_yield_one_winner() {
        let (state, store, _question) = game_with_question().await;

        let mut users = Vec::new();
        for i in 0..8 {
            users.push(join(&store, &format!("player{i}")).await);
        }

        let mut handles = Vec::new();
        for user in &users {
            let state = state.clone();
            let request = submission(user, 8);
            handles.push(tokio::spawn(async move {
                submit_answer(&state, request).await
            }));
        }

        let mut winners = 0;
        let mut losers = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(response) if response.won => winners += 1,
                Ok(response) => {
                    assert_eq!(response.outcome, AnswerOutcome::AlreadyWon);
                    losers += 1;
                }
                // A submitter that read after the close sees no active question.
                Err(ServiceError::NoActiveQuestion) => losers += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(winners + losers, users.len());

        // Exactly one increment was issued in total.
        let total: i64 = store
            .list_users()
            .await
            .unwrap()
            .iter()
            .map(|u| u.score)
            .sum();
        assert_eq!(total, 10);

        let closed = store.latest_question().await.unwrap().unwrap();
        assert!(!closed.is_active);
        assert!(closed.winner_id.is_some());
    }

    #[tokio::test]
    async fn audit_log_records_every_submission() {
        let (state, store, question) = game_with_question().await;
        let alice = join(&store, "alice").await;
        let bob = join(&store, "bob").await;

        submit_answer(&state, submission(&alice, 7)).await.unwrap();
        submit_answer(&state, submission(&alice, 8)).await.unwrap();
        // Bob races in after the close; the attempt is still recorded when the
        // question was read while open, but here the round is already over.
        let late = submit_answer(&state, submission(&bob, 8)).await;
        assert!(matches!(late, Err(ServiceError::NoActiveQuestion)));

        let attempts = store.attempts_for_question(question.id).await.unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts.iter().filter(|a| a.is_correct).count(), 1);
    }
}
