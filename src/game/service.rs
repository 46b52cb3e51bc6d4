use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::models::NewActiveGame;
use crate::auth::AuthContext;
use crate::shared::{AppError, ErrorCode};
use crate::stores::{ActiveGameStore, PuzzleStore};

/// Pass-through flows for starting, reading, saving and drilling games
pub struct GameService {
    active_games: Arc<dyn ActiveGameStore>,
    puzzles: Arc<dyn PuzzleStore>,
}

impl GameService {
    pub fn new(active_games: Arc<dyn ActiveGameStore>, puzzles: Arc<dyn PuzzleStore>) -> Self {
        Self {
            active_games,
            puzzles,
        }
    }

    /// Clears the caller's sessions, picks a puzzle near `closest_difficulty` and opens a session on it
    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    pub async fn start_game(
        &self,
        auth: &AuthContext,
        closest_difficulty: i64,
    ) -> Result<Value, AppError> {
        self.active_games
            .delete_active_games(auth)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to delete old active games");
                AppError::upstream(ErrorCode::StartGameDeleteOldActiveGamesFailed, &e)
            })?;

        let puzzle = self
            .puzzles
            .find_puzzle(auth, closest_difficulty)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to fetch a puzzle");
                AppError::upstream(ErrorCode::StartGamePuzzleFetchFailed, &e)
            })?;
        debug!(puzzle = %puzzle.puzzle, difficulty = puzzle.difficulty, "Picked puzzle");

        let game = NewActiveGame::for_puzzle(&auth.user_id, &puzzle);
        let created = self
            .active_games
            .create_active_game(auth, &game)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create active game");
                AppError::upstream(ErrorCode::StartGameCreateActiveGameFailed, &e)
            })?;

        info!(puzzle = %game.puzzle, "Game started");
        Ok(created)
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    pub async fn get_game(&self, auth: &AuthContext) -> Result<Value, AppError> {
        self.active_games
            .list_active_games(auth)
            .await
            .map_err(|e| AppError::upstream(ErrorCode::GetGameFetchFailed, &e))
    }

    #[instrument(skip(self, auth, patch), fields(user_id = %auth.user_id))]
    pub async fn save_game(
        &self,
        auth: &AuthContext,
        puzzle: &str,
        patch: &Value,
    ) -> Result<Value, AppError> {
        self.active_games
            .patch_active_game(auth, puzzle, patch)
            .await
            .map_err(|e| AppError::upstream(ErrorCode::SaveGamePatchFailed, &e))
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    pub async fn get_drill(&self, auth: &AuthContext, strategy: &str) -> Result<Value, AppError> {
        self.puzzles
            .find_drill(auth, strategy)
            .await
            .map_err(|e| AppError::upstream(ErrorCode::DrillFetchFailed, &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{
        ActiveGameOperation, InMemoryActiveGameStore, InMemoryPuzzleStore, UpstreamError,
    };
    use serde_json::json;

    fn auth() -> AuthContext {
        AuthContext {
            user_id: "auth0-5".to_string(),
            authorization: "Bearer token".to_string(),
        }
    }

    fn service(active_games: Arc<InMemoryActiveGameStore>) -> GameService {
        GameService::new(active_games, Arc::new(InMemoryPuzzleStore::with_sample_puzzles()))
    }

    #[tokio::test]
    async fn test_start_game_replaces_previous_sessions() {
        let active_games = Arc::new(InMemoryActiveGameStore::new());
        let service = service(active_games.clone());

        service.start_game(&auth(), 100).await.unwrap();
        let created = service.start_game(&auth(), 900).await.unwrap();

        assert_eq!(created[0]["difficulty"], 850);
        assert_eq!(created[0]["userID"], "auth0-5");
        assert_eq!(active_games.game_count().await, 1);
        assert_eq!(
            active_games.calls().await,
            vec![
                ActiveGameOperation::DeleteAll,
                ActiveGameOperation::Create,
                ActiveGameOperation::DeleteAll,
                ActiveGameOperation::Create,
            ]
        );
    }

    #[tokio::test]
    async fn test_start_game_stops_when_delete_fails() {
        let active_games = Arc::new(InMemoryActiveGameStore::new());
        active_games
            .fail_on(ActiveGameOperation::DeleteAll, UpstreamError::Status(502))
            .await;

        let result = service(active_games.clone()).start_game(&auth(), 500).await;

        assert_eq!(
            result,
            Err(AppError::Upstream {
                code: ErrorCode::StartGameDeleteOldActiveGamesFailed,
                status: 502
            })
        );
        assert_eq!(active_games.game_count().await, 0);
    }

    #[tokio::test]
    async fn test_start_game_with_empty_catalog() {
        let service = GameService::new(
            Arc::new(InMemoryActiveGameStore::new()),
            Arc::new(InMemoryPuzzleStore::new()),
        );

        let result = service.start_game(&auth(), 500).await;
        assert_eq!(
            result,
            Err(AppError::Upstream {
                code: ErrorCode::StartGamePuzzleFetchFailed,
                status: 404
            })
        );
    }

    #[tokio::test]
    async fn test_save_game_on_missing_session() {
        let service = service(Arc::new(InMemoryActiveGameStore::new()));
        let result = service
            .save_game(&auth(), "nope", &json!([{"currentTime": 3}]))
            .await;
        assert_eq!(result.unwrap_err().code(), ErrorCode::SaveGamePatchFailed);
    }

    #[tokio::test]
    async fn test_get_game_timeout_is_504() {
        let active_games = Arc::new(InMemoryActiveGameStore::new());
        active_games
            .fail_on(ActiveGameOperation::List, UpstreamError::Timeout)
            .await;

        let result = service(active_games).get_game(&auth()).await;
        assert_eq!(
            result,
            Err(AppError::Upstream {
                code: ErrorCode::GetGameFetchFailed,
                status: 504
            })
        );
    }
}
