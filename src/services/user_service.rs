//! Player join and listing operations.

use crate::{
    dao::models::UserEntity,
    dto::game::{JoinGameRequest, UserSummary},
    error::ServiceError,
    services::question_service,
    state::SharedState,
};

/// Join the game under a display name.
///
/// Idempotent: a taken name returns the existing player. Joining also ensures
/// a round is open, since a client join is what pulls an idle game back into
/// play.
pub async fn join_game(
    state: &SharedState,
    request: JoinGameRequest,
) -> Result<UserSummary, ServiceError> {
    let store = state.require_game_store().await?;

    let username = request.username.trim().to_owned();
    if username.is_empty() {
        return Err(ServiceError::InvalidInput(
            "username must not be blank".into(),
        ));
    }

    let user = store.create_user_if_absent(UserEntity::new(username)).await?;

    question_service::ensure_active_question(state).await?;

    Ok(user.into())
}

/// All players ordered by score descending.
pub async fn list_users(state: &SharedState) -> Result<Vec<UserSummary>, ServiceError> {
    let store = state.require_game_store().await?;
    let users = store.list_users().await?;
    Ok(users.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::{
        config::GameConfig,
        dao::store::{GameStore, memory::MemoryGameStore},
        state::AppState,
    };

    fn join_request(username: &str) -> JoinGameRequest {
        JoinGameRequest {
            username: username.into(),
        }
    }

    #[tokio::test]
    async fn join_creates_user_and_opens_round() {
        let state = AppState::new(GameConfig::default());
        let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
        state.install_game_store(store.clone()).await;

        let user = join_game(&state, join_request("alice")).await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.score, 0);

        assert!(store.find_active_question().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rejoin_returns_existing_player() {
        let state = AppState::new(GameConfig::default());
        let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
        state.install_game_store(store).await;

        let first = join_game(&state, join_request("alice")).await.unwrap();
        let second = join_game(&state, join_request("alice")).await.unwrap();

        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn join_trims_surrounding_whitespace() {
        let state = AppState::new(GameConfig::default());
        let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
        state.install_game_store(store).await;

        let user = join_game(&state, join_request("  alice ")).await.unwrap();
        assert_eq!(user.username, "alice");
    }
}
