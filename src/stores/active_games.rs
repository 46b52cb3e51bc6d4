use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{merge_patch, BackendClient, UpstreamError};
use crate::auth::AuthContext;
use crate::game::models::NewActiveGame;
use crate::stats::models::ActiveGameSession;

pub const ACTIVE_GAMES_PATH: &str = "/api/v1/user/activeGames";

/// Access to in-progress sessions, keyed by (user, puzzle)
#[async_trait]
pub trait ActiveGameStore: Send + Sync {
    /// The caller's session for one puzzle; an absent session is `Status(404)`
    async fn get_active_game(
        &self,
        auth: &AuthContext,
        puzzle: &str,
    ) -> Result<ActiveGameSession, UpstreamError>;

    /// All of the caller's sessions, as returned by the store
    async fn list_active_games(&self, auth: &AuthContext) -> Result<Value, UpstreamError>;

    async fn create_active_game(
        &self,
        auth: &AuthContext,
        game: &NewActiveGame,
    ) -> Result<Value, UpstreamError>;

    async fn patch_active_game(
        &self,
        auth: &AuthContext,
        puzzle: &str,
        patch: &Value,
    ) -> Result<Value, UpstreamError>;

    async fn delete_active_game(&self, auth: &AuthContext, puzzle: &str)
        -> Result<(), UpstreamError>;

    /// Removes every session the caller has
    async fn delete_active_games(&self, auth: &AuthContext) -> Result<(), UpstreamError>;
}

/// ActiveGameStore backed by the active-games HTTP service
pub struct HttpActiveGameStore {
    client: BackendClient,
}

impl HttpActiveGameStore {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActiveGameStore for HttpActiveGameStore {
    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    async fn get_active_game(
        &self,
        auth: &AuthContext,
        puzzle: &str,
    ) -> Result<ActiveGameSession, UpstreamError> {
        let request = self
            .client
            .request(Method::GET, ACTIVE_GAMES_PATH, auth)
            .query(&[("userID", auth.user_id.as_str()), ("puzzle", puzzle)]);
        let response = self.client.send_expecting(request, StatusCode::OK).await?;

        let mut sessions: Vec<ActiveGameSession> = BackendClient::records(response).await?;
        if sessions.is_empty() {
            warn!(puzzle = %puzzle, "Active game store returned an empty result");
            return Err(UpstreamError::Status(404));
        }
        Ok(sessions.swap_remove(0))
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    async fn list_active_games(&self, auth: &AuthContext) -> Result<Value, UpstreamError> {
        let request = self
            .client
            .request(Method::GET, ACTIVE_GAMES_PATH, auth)
            .query(&[("userID", auth.user_id.as_str())]);
        let response = self.client.send_expecting(request, StatusCode::OK).await?;
        BackendClient::body(response).await
    }

    #[instrument(skip(self, auth, game), fields(user_id = %auth.user_id, puzzle = %game.puzzle))]
    async fn create_active_game(
        &self,
        auth: &AuthContext,
        game: &NewActiveGame,
    ) -> Result<Value, UpstreamError> {
        let request = self
            .client
            .request(Method::POST, ACTIVE_GAMES_PATH, auth)
            .json(&[game]);
        let response = self
            .client
            .send_expecting(request, StatusCode::CREATED)
            .await?;
        BackendClient::body(response).await
    }

    #[instrument(skip(self, auth, patch), fields(user_id = %auth.user_id))]
    async fn patch_active_game(
        &self,
        auth: &AuthContext,
        puzzle: &str,
        patch: &Value,
    ) -> Result<Value, UpstreamError> {
        let request = self
            .client
            .request(Method::PATCH, ACTIVE_GAMES_PATH, auth)
            .query(&[("userID", auth.user_id.as_str()), ("puzzle", puzzle)])
            .json(patch);
        let response = self.client.send_expecting(request, StatusCode::OK).await?;
        BackendClient::body(response).await
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    async fn delete_active_game(
        &self,
        auth: &AuthContext,
        puzzle: &str,
    ) -> Result<(), UpstreamError> {
        let request = self
            .client
            .request(Method::DELETE, ACTIVE_GAMES_PATH, auth)
            .query(&[("userID", auth.user_id.as_str()), ("puzzle", puzzle)]);
        self.client.send_expecting(request, StatusCode::OK).await?;
        Ok(())
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    async fn delete_active_games(&self, auth: &AuthContext) -> Result<(), UpstreamError> {
        let request = self
            .client
            .request(Method::DELETE, ACTIVE_GAMES_PATH, auth)
            .query(&[("userID", auth.user_id.as_str())]);
        self.client.send_expecting(request, StatusCode::OK).await?;
        Ok(())
    }
}

/// Operations recorded and fault-injectable on the in-memory store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActiveGameOperation {
    Get,
    List,
    Create,
    Patch,
    Delete,
    DeleteAll,
}

/// In-memory implementation of ActiveGameStore for development and testing
///
/// Records are kept as raw JSON so in-play patches survive untouched. Deleting
/// an absent record succeeds, matching the HTTP store.
#[derive(Default)]
pub struct InMemoryActiveGameStore {
    games: RwLock<HashMap<(String, String), Value>>,
    faults: RwLock<HashMap<ActiveGameOperation, UpstreamError>>,
    calls: RwLock<Vec<ActiveGameOperation>>,
}

impl InMemoryActiveGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_session(&self, session: &ActiveGameSession) {
        let record = json!({
            "userID": session.user_id,
            "puzzle": session.puzzle,
            "puzzleSolution": session.puzzle_solution,
            "difficulty": session.difficulty,
            "currentTime": session.elapsed_time,
            "numHintsUsed": session.num_hints_used,
            "numWrongCellsPlayed": session.num_wrong_cells_played,
        });
        self.games
            .write()
            .await
            .insert((session.user_id.clone(), session.puzzle.clone()), record);
    }

    pub async fn record(&self, user_id: &str, puzzle: &str) -> Option<Value> {
        self.games
            .read()
            .await
            .get(&(user_id.to_string(), puzzle.to_string()))
            .cloned()
    }

    pub async fn game_count(&self) -> usize {
        self.games.read().await.len()
    }

    /// Every later call to `operation` fails with `error`
    pub async fn fail_on(&self, operation: ActiveGameOperation, error: UpstreamError) {
        self.faults.write().await.insert(operation, error);
    }

    pub async fn calls(&self) -> Vec<ActiveGameOperation> {
        self.calls.read().await.clone()
    }

    async fn enter(&self, operation: ActiveGameOperation) -> Result<(), UpstreamError> {
        self.calls.write().await.push(operation);
        match self.faults.read().await.get(&operation) {
            Some(error) => {
                debug!(?operation, %error, "Injected active game store failure");
                Err(error.clone())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ActiveGameStore for InMemoryActiveGameStore {
    async fn get_active_game(
        &self,
        auth: &AuthContext,
        puzzle: &str,
    ) -> Result<ActiveGameSession, UpstreamError> {
        self.enter(ActiveGameOperation::Get).await?;
        let record = self
            .record(&auth.user_id, puzzle)
            .await
            .ok_or(UpstreamError::Status(404))?;
        serde_json::from_value(record).map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    async fn list_active_games(&self, auth: &AuthContext) -> Result<Value, UpstreamError> {
        self.enter(ActiveGameOperation::List).await?;
        let games = self.games.read().await;
        let records: Vec<Value> = games
            .iter()
            .filter(|((user_id, _), _)| user_id == &auth.user_id)
            .map(|(_, record)| record.clone())
            .collect();

        if records.is_empty() {
            return Err(UpstreamError::Status(404));
        }
        Ok(Value::Array(records))
    }

    async fn create_active_game(
        &self,
        auth: &AuthContext,
        game: &NewActiveGame,
    ) -> Result<Value, UpstreamError> {
        self.enter(ActiveGameOperation::Create).await?;
        let key = (auth.user_id.clone(), game.puzzle.clone());
        let mut games = self.games.write().await;
        if games.contains_key(&key) {
            return Err(UpstreamError::Status(409));
        }

        let record = json!({
            "userID": game.user_id,
            "puzzle": game.puzzle,
            "puzzleSolution": game.puzzle_solution,
            "difficulty": game.difficulty,
            "currentTime": 0,
            "numHintsUsed": 0,
            "numWrongCellsPlayed": 0,
        });
        games.insert(key, record.clone());
        Ok(Value::Array(vec![record]))
    }

    async fn patch_active_game(
        &self,
        auth: &AuthContext,
        puzzle: &str,
        patch: &Value,
    ) -> Result<Value, UpstreamError> {
        self.enter(ActiveGameOperation::Patch).await?;
        let mut games = self.games.write().await;
        let record = games
            .get_mut(&(auth.user_id.clone(), puzzle.to_string()))
            .ok_or(UpstreamError::Status(404))?;
        merge_patch(record, patch);
        Ok(Value::Array(vec![record.clone()]))
    }

    async fn delete_active_game(
        &self,
        auth: &AuthContext,
        puzzle: &str,
    ) -> Result<(), UpstreamError> {
        self.enter(ActiveGameOperation::Delete).await?;
        self.games
            .write()
            .await
            .remove(&(auth.user_id.clone(), puzzle.to_string()));
        Ok(())
    }

    async fn delete_active_games(&self, auth: &AuthContext) -> Result<(), UpstreamError> {
        self.enter(ActiveGameOperation::DeleteAll).await?;
        self.games
            .write()
            .await
            .retain(|(user_id, _), _| user_id != &auth.user_id);
        Ok(())
    }
}
