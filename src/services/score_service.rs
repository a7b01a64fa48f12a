//! Score ledger: win increments and the deduplicated top-N high-score table.

use std::sync::Arc;
use std::time::SystemTime;

use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::{
        models::{HighScoreEntity, UserEntity},
        store::GameStore,
    },
    dto::game::HighScoreSummary,
    error::ServiceError,
    state::SharedState,
};

/// Apply the win increment for `user_id` and refresh the high-score table.
///
/// Called only after a claim has committed, so at most one increment is issued
/// per question and no atomicity against concurrent increments is needed. The
/// win is never rolled back: failures here are logged and left to an
/// out-of-band reconciliation of the attempts log.
pub async fn award_win(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    user_id: Uuid,
) -> Option<UserEntity> {
    let delta = state.config().win_points;

    let user = match add_score(store, user_id, delta).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(%user_id, "winner row missing; score not applied");
            return None;
        }
        Err(err) => {
            warn!(%user_id, error = %err, "failed to apply win score");
            return None;
        }
    };

    if let Err(err) = refresh_high_score(state, store, &user.username, user.score).await {
        warn!(username = %user.username, error = %err, "failed to refresh high score");
    }

    Some(user)
}

/// Read-modify-write score increment. Returns the updated user, or `None`
/// when the row does not exist.
pub async fn add_score(
    store: &Arc<dyn GameStore>,
    user_id: Uuid,
    delta: u32,
) -> Result<Option<UserEntity>, ServiceError> {
    let Some(user) = store.find_user(user_id).await? else {
        return Ok(None);
    };

    let new_score = user.score + i64::from(delta);
    if !store.update_user_score(user_id, new_score).await? {
        return Ok(None);
    }

    Ok(Some(UserEntity {
        score: new_score,
        ..user
    }))
}

/// Upsert the high-score entry for `username`, raising it only when
/// `new_score` exceeds the stored value, then trim the table to the cap.
pub async fn refresh_high_score(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    username: &str,
    new_score: i64,
) -> Result<(), ServiceError> {
    let cap = state.config().high_score_cap;

    match store.find_high_score(username).await? {
        // Never lower a recorded high score.
        Some(existing) if new_score <= existing.score => return Ok(()),
        Some(existing) => {
            store
                .save_high_score(HighScoreEntity {
                    username: existing.username,
                    score: new_score,
                    achieved_at: SystemTime::now(),
                })
                .await?;
        }
        None => {
            let current = store.list_high_scores(cap).await?;
            let qualifies = current.len() < cap
                || current.last().is_none_or(|lowest| new_score >= lowest.score);
            if qualifies {
                store
                    .save_high_score(HighScoreEntity {
                        username: username.to_owned(),
                        score: new_score,
                        achieved_at: SystemTime::now(),
                    })
                    .await?;
            }
        }
    }

    store.trim_high_scores(cap).await
        .map_err(Into::into)
}

/// The retained top scores, best first.
pub async fn high_scores(state: &SharedState) -> Result<Vec<HighScoreSummary>, ServiceError> {
    let store = state.require_game_store().await?;
    let entries = store.list_high_scores(state.config().high_score_cap).await?;
    Ok(entries.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::GameConfig,
        dao::store::memory::MemoryGameStore,
        state::AppState,
    };

    async fn state_with_store() -> (SharedState, Arc<dyn GameStore>) {
        let state = AppState::new(GameConfig::default());
        let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
        state.install_game_store(store.clone()).await;
        (state, store)
    }

    async fn join(store: &Arc<dyn GameStore>, name: &str) -> UserEntity {
        store
            .create_user_if_absent(UserEntity::new(name.into()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn add_score_increments_by_exactly_delta() {
        let (_state, store) = state_with_store().await;
        let user = join(&store, "alice").await;

        let updated = add_score(&store, user.id, 10).await.unwrap().unwrap();
        assert_eq!(updated.score, 10);

        let updated = add_score(&store, user.id, 10).await.unwrap().unwrap();
        assert_eq!(updated.score, 20);

        let stored = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.score, 20);
    }

    #[tokio::test]
    async fn add_score_for_unknown_user_is_none() {
        let (_state, store) = state_with_store().await;
        assert!(add_score(&store, Uuid::new_v4(), 10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn high_score_is_raise_only() {
        let (state, store) = state_with_store().await;

        refresh_high_score(&state, &store, "alice", 30).await.unwrap();
        refresh_high_score(&state, &store, "alice", 20).await.unwrap();

        let entry = store.find_high_score("alice").await.unwrap().unwrap();
        assert_eq!(entry.score, 30);

        refresh_high_score(&state, &store, "alice", 40).await.unwrap();
        let entry = store.find_high_score("alice").await.unwrap().unwrap();
        assert_eq!(entry.score, 40);
    }

    #[tokio::test]
    async fn one_entry_per_name() {
        let (state, store) = state_with_store().await;

        refresh_high_score(&state, &store, "alice", 10).await.unwrap();
        refresh_high_score(&state, &store, "alice", 20).await.unwrap();

        let listing = store.list_high_scores(10).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].score, 20);
    }

    #[tokio::test]
    async fn full_table_evicts_lowest_when_new_entry_qualifies() {
        let config = GameConfig {
            high_score_cap: 10,
            ..GameConfig::default()
        };
        let state = AppState::new(config);
        let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
        state.install_game_store(store.clone()).await;

        // Ten entries, minimum score 5.
        for i in 0..10 {
            refresh_high_score(&state, &store, &format!("player{i}"), 5 + i).await.unwrap();
        }

        // A win raising a newcomer to 10 inserts them and evicts the lowest.
        refresh_high_score(&state, &store, "newcomer", 10).await.unwrap();

        let listing = store.list_high_scores(20).await.unwrap();
        assert_eq!(listing.len(), 10);
        assert!(listing.iter().any(|e| e.username == "newcomer"));
        assert!(!listing.iter().any(|e| e.username == "player0"));
    }

    #[tokio::test]
    async fn below_minimum_score_does_not_enter_full_table() {
        let config = GameConfig {
            high_score_cap: 3,
            ..GameConfig::default()
        };
        let state = AppState::new(config);
        let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
        state.install_game_store(store.clone()).await;

        for (name, score) in [("a", 20), ("b", 30), ("c", 40)] {
            refresh_high_score(&state, &store, name, score).await.unwrap();
        }

        refresh_high_score(&state, &store, "late", 10).await.unwrap();

        let listing = store.list_high_scores(10).await.unwrap();
        assert_eq!(listing.len(), 3);
        assert!(!listing.iter().any(|e| e.username == "late"));
    }

    #[tokio::test]
    async fn award_win_applies_points_and_high_score() {
        let (state, store) = state_with_store().await;
        let user = join(&store, "alice").await;

        let updated = award_win(&state, &store, user.id).await.unwrap();
        assert_eq!(updated.score, 10);

        let entry = store.find_high_score("alice").await.unwrap().unwrap();
        assert_eq!(entry.score, 10);
    }

    #[tokio::test]
    async fn award_win_for_missing_user_is_none() {
        let (state, store) = state_with_store().await;
        assert!(award_win(&state, &store, Uuid::new_v4()).await.is_none());
    }
}
