//! Reference in-memory storage backend.
//!
//! Question rows are the only contended resource; every question mutation
//! happens under a single lock, so concurrent conditional updates against the
//! same row serialize exactly as the [`GameStore`] contract requires.

use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use super::{ChangeOp, GameStore, StoreChange, StoreTable};
use crate::dao::{
    models::{
        AnswerAttemptEntity, HighScoreEntity, NotificationEntity, QuestionEntity, UserEntity,
    },
    storage::StorageResult,
};

/// Capacity of each table's change-feed channel.
const FEED_CAPACITY: usize = 64;

/// In-memory [`GameStore`] used for tests and single-process deployments.
#[derive(Clone)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    questions: Mutex<Vec<QuestionEntity>>,
    attempts: DashMap<Uuid, Vec<AnswerAttemptEntity>>,
    users: Mutex<IndexMap<Uuid, UserEntity>>,
    high_scores: Mutex<IndexMap<String, HighScoreEntity>>,
    notifications: Mutex<Vec<NotificationEntity>>,
    feeds: Feeds,
}

struct Feeds {
    questions: broadcast::Sender<StoreChange>,
    users: broadcast::Sender<StoreChange>,
    notifications: broadcast::Sender<StoreChange>,
}

impl Feeds {
    fn new() -> Self {
        let (questions, _) = broadcast::channel(FEED_CAPACITY);
        let (users, _) = broadcast::channel(FEED_CAPACITY);
        let (notifications, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            questions,
            users,
            notifications,
        }
    }

    fn sender(&self, table: StoreTable) -> &broadcast::Sender<StoreChange> {
        match table {
            StoreTable::Questions => &self.questions,
            StoreTable::Users => &self.users,
            StoreTable::Notifications => &self.notifications,
        }
    }

    /// Publish a change event, ignoring the no-subscriber case.
    fn publish(&self, table: StoreTable, op: ChangeOp) {
        let _ = self.sender(table).send(StoreChange { table, op });
    }
}

impl MemoryGameStore {
    /// Build an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                questions: Mutex::new(Vec::new()),
                attempts: DashMap::new(),
                users: Mutex::new(IndexMap::new()),
                high_scores: Mutex::new(IndexMap::new()),
                notifications: Mutex::new(Vec::new()),
                feeds: Feeds::new(),
            }),
        }
    }

    /// Connect entry point mirroring the shape of networked backends so the
    /// storage supervisor can treat every backend uniformly.
    pub async fn connect() -> StorageResult<Self> {
        Ok(Self::new())
    }

    async fn find_active_question(&self) -> StorageResult<Option<QuestionEntity>> {
        let questions = self.inner.questions.lock().await;
        Ok(questions.iter().find(|q| q.is_active).cloned())
    }

    async fn latest_question(&self) -> StorageResult<Option<QuestionEntity>> {
        let questions = self.inner.questions.lock().await;
        Ok(questions.last().cloned())
    }

    async fn open_question(
        &self,
        question: QuestionEntity,
    ) -> StorageResult<Option<QuestionEntity>> {
        let mut questions = self.inner.questions.lock().await;
        if questions.iter().any(|q| q.is_active) {
            return Ok(None);
        }

        questions.push(question.clone());
        drop(questions);

        self.inner.feeds.publish(StoreTable::Questions, ChangeOp::Insert);
        Ok(Some(question))
    }

    async fn claim_question(&self, question_id: Uuid, winner_id: Uuid) -> StorageResult<bool> {
        let mut questions = self.inner.questions.lock().await;
        let claimed = match questions
            .iter_mut()
            .find(|q| q.id == question_id && q.is_active && q.winner_id.is_none())
        {
            Some(question) => {
                question.is_active = false;
                question.winner_id = Some(winner_id);
                true
            }
            None => false,
        };
        drop(questions);

        if claimed {
            self.inner.feeds.publish(StoreTable::Questions, ChangeOp::Update);
        }
        Ok(claimed)
    }

    async fn record_attempt(&self, attempt: AnswerAttemptEntity) -> StorageResult<()> {
        self.inner
            .attempts
            .entry(attempt.question_id)
            .or_default()
            .push(attempt);
        Ok(())
    }

    async fn attempts_for_question(
        &self,
        question_id: Uuid,
    ) -> StorageResult<Vec<AnswerAttemptEntity>> {
        Ok(self
            .inner
            .attempts
            .get(&question_id)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn create_user_if_absent(&self, user: UserEntity) -> StorageResult<UserEntity> {
        let mut users = self.inner.users.lock().await;
        if let Some(existing) = users.values().find(|u| u.username == user.username) {
            return Ok(existing.clone());
        }

        users.insert(user.id, user.clone());
        drop(users);

        self.inner.feeds.publish(StoreTable::Users, ChangeOp::Insert);
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StorageResult<Option<UserEntity>> {
        let users = self.inner.users.lock().await;
        Ok(users.get(&id).cloned())
    }

    async fn update_user_score(&self, id: Uuid, score: i64) -> StorageResult<bool> {
        let mut users = self.inner.users.lock().await;
        let updated = match users.get_mut(&id) {
            Some(user) => {
                user.score = score;
                user.updated_at = SystemTime::now();
                true
            }
            None => false,
        };
        drop(users);

        if updated {
            self.inner.feeds.publish(StoreTable::Users, ChangeOp::Update);
        }
        Ok(updated)
    }

    async fn list_users(&self) -> StorageResult<Vec<UserEntity>> {
        let users = self.inner.users.lock().await;
        let mut listing: Vec<UserEntity> = users.values().cloned().collect();
        // Stable sort keeps join order among equal scores.
        listing.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(listing)
    }

    async fn find_high_score(&self, username: String) -> StorageResult<Option<HighScoreEntity>> {
        let high_scores = self.inner.high_scores.lock().await;
        Ok(high_scores.get(&username).cloned())
    }

    async fn save_high_score(&self, entry: HighScoreEntity) -> StorageResult<()> {
        let mut high_scores = self.inner.high_scores.lock().await;
        high_scores.insert(entry.username.clone(), entry);
        Ok(())
    }

    async fn list_high_scores(&self, limit: usize) -> StorageResult<Vec<HighScoreEntity>> {
        let high_scores = self.inner.high_scores.lock().await;
        let mut listing: Vec<HighScoreEntity> = high_scores.values().cloned().collect();
        listing.sort_by(|a, b| b.score.cmp(&a.score));
        listing.truncate(limit);
        Ok(listing)
    }

    async fn trim_high_scores(&self, cap: usize) -> StorageResult<()> {
        let mut high_scores = self.inner.high_scores.lock().await;
        if high_scores.len() <= cap {
            return Ok(());
        }

        let mut ranked: Vec<(String, i64)> = high_scores
            .iter()
            .map(|(name, entry)| (name.clone(), entry.score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        for (name, _) in ranked.into_iter().skip(cap) {
            high_scores.shift_remove(&name);
        }
        Ok(())
    }

    async fn add_notification(&self, notification: NotificationEntity) -> StorageResult<()> {
        let mut notifications = self.inner.notifications.lock().await;
        notifications.push(notification);
        drop(notifications);

        self.inner
            .feeds
            .publish(StoreTable::Notifications, ChangeOp::Insert);
        Ok(())
    }

    async fn latest_notification(&self) -> StorageResult<Option<NotificationEntity>> {
        let notifications = self.inner.notifications.lock().await;
        Ok(notifications.last().cloned())
    }
}

impl Default for MemoryGameStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStore for MemoryGameStore {
    fn find_active_question(&self) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_active_question().await })
    }

    fn latest_question(&self) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.latest_question().await })
    }

    fn open_question(
        &self,
        question: QuestionEntity,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.open_question(question).await })
    }

    fn claim_question(
        &self,
        question_id: Uuid,
        winner_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.claim_question(question_id, winner_id).await })
    }

    fn record_attempt(&self, attempt: AnswerAttemptEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.record_attempt(attempt).await })
    }

    fn attempts_for_question(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerAttemptEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.attempts_for_question(question_id).await })
    }

    fn create_user_if_absent(
        &self,
        user: UserEntity,
    ) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create_user_if_absent(user).await })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user(id).await })
    }

    fn update_user_score(&self, id: Uuid, score: i64) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.update_user_score(id, score).await })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_users().await })
    }

    fn find_high_score(
        &self,
        username: &str,
    ) -> BoxFuture<'static, StorageResult<Option<HighScoreEntity>>> {
        let store = self.clone();
        let username = username.to_owned();
        Box::pin(async move { store.find_high_score(username).await })
    }

    fn save_high_score(&self, entry: HighScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_high_score(entry).await })
    }

    fn list_high_scores(
        &self,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<HighScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_high_scores(limit).await })
    }

    fn trim_high_scores(&self, cap: usize) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.trim_high_scores(cap).await })
    }

    fn add_notification(
        &self,
        notification: NotificationEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.add_notification(notification).await })
    }

    fn latest_notification(&self) -> BoxFuture<'static, StorageResult<Option<NotificationEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.latest_notification().await })
    }

    fn watch(&self, table: StoreTable) -> broadcast::Receiver<StoreChange> {
        self.inner.feeds.sender(table).subscribe()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
