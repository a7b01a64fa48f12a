pub mod memory;

use futures::future::BoxFuture;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dao::{
    models::{
        AnswerAttemptEntity, HighScoreEntity, NotificationEntity, QuestionEntity, UserEntity,
    },
    storage::StorageResult,
};

/// Tables for which the store publishes a change-notification feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTable {
    /// The question rows (activation/winner transitions, new rounds).
    Questions,
    /// The user rows (joins, score updates).
    Users,
    /// The notification rows (win broadcasts).
    Notifications,
}

/// Kind of row mutation carried by a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    /// A new row was inserted.
    Insert,
    /// An existing row was updated.
    Update,
}

/// Change event delivered on a table feed. Carries only the affected table and
/// operation; consumers reload the current derived value on receipt.
#[derive(Debug, Clone, Copy)]
pub struct StoreChange {
    /// Table the change happened on.
    pub table: StoreTable,
    /// Kind of mutation.
    pub op: ChangeOp,
}

/// Abstraction over the persistence layer for questions, users, attempts,
/// high scores, and notifications.
///
/// The two contended operations carry the store's atomicity contract:
/// [`GameStore::claim_question`] is a single conditional update (concurrent
/// claims against the same row serialize so at most one succeeds), and
/// [`GameStore::open_question`] refuses to insert while another row is still
/// active, enforcing the single-active-question invariant at the store level.
pub trait GameStore: Send + Sync {
    /// Load the currently active question, if any.
    fn find_active_question(&self) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;

    /// Load the most recently created question regardless of state.
    fn latest_question(&self) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;

    /// Insert `question` as the active question. Returns `None` without
    /// writing anything when another question is still active.
    fn open_question(
        &self,
        question: QuestionEntity,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;

    /// Atomically close `question_id` and set its winner, only if the row is
    /// still active with no winner. Returns whether this call won the claim.
    fn claim_question(
        &self,
        question_id: Uuid,
        winner_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Append an answer attempt to the audit log.
    fn record_attempt(
        &self,
        attempt: AnswerAttemptEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// All attempts recorded against `question_id`, in insertion order.
    fn attempts_for_question(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerAttemptEntity>>>;

    /// Insert `user` unless a row with the same username already exists, in
    /// which case the existing row is returned untouched.
    fn create_user_if_absent(
        &self,
        user: UserEntity,
    ) -> BoxFuture<'static, StorageResult<UserEntity>>;

    /// Load a user by primary key.
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;

    /// Overwrite a user's score and updated-at timestamp. Returns whether the
    /// row existed.
    fn update_user_score(
        &self,
        id: Uuid,
        score: i64,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// All users ordered by score descending.
    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;

    /// Load the high-score entry for `username`, if recorded.
    fn find_high_score(
        &self,
        username: &str,
    ) -> BoxFuture<'static, StorageResult<Option<HighScoreEntity>>>;

    /// Insert or replace the high-score entry keyed by its username.
    fn save_high_score(&self, entry: HighScoreEntity) -> BoxFuture<'static, StorageResult<()>>;

    /// Up to `limit` high-score entries, score descending.
    fn list_high_scores(
        &self,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<HighScoreEntity>>>;

    /// Drop every entry ranked below the top `cap` by score descending.
    fn trim_high_scores(&self, cap: usize) -> BoxFuture<'static, StorageResult<()>>;

    /// Append a broadcast notification row.
    fn add_notification(
        &self,
        notification: NotificationEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// The most recently appended notification, if any.
    fn latest_notification(
        &self,
    ) -> BoxFuture<'static, StorageResult<Option<NotificationEntity>>>;

    /// Subscribe to the change feed for `table`. Events are delivered in the
    /// order the mutations committed; every open subscription receives every
    /// event.
    fn watch(&self, table: StoreTable) -> broadcast::Receiver<StoreChange>;

    /// Verify the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;

    /// Attempt to re-establish a dropped backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
