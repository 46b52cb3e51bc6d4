use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{instrument, warn};

use super::{BackendClient, UpstreamError};
use crate::auth::AuthContext;
use crate::game::models::Puzzle;

pub const PUZZLES_PATH: &str = "/api/v1/puzzles";

/// Read access to the puzzle catalog
#[async_trait]
pub trait PuzzleStore: Send + Sync {
    /// The puzzle whose difficulty is nearest `closest_difficulty`; an empty catalog is `Status(404)`
    async fn find_puzzle(
        &self,
        auth: &AuthContext,
        closest_difficulty: i64,
    ) -> Result<Puzzle, UpstreamError>;

    /// One puzzle exercising `strategy`, as returned by the store
    async fn find_drill(&self, auth: &AuthContext, strategy: &str) -> Result<Value, UpstreamError>;
}

/// PuzzleStore backed by the puzzle catalog HTTP service
pub struct HttpPuzzleStore {
    client: BackendClient,
}

impl HttpPuzzleStore {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PuzzleStore for HttpPuzzleStore {
    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    async fn find_puzzle(
        &self,
        auth: &AuthContext,
        closest_difficulty: i64,
    ) -> Result<Puzzle, UpstreamError> {
        let request = self
            .client
            .request(Method::GET, PUZZLES_PATH, auth)
            .query(&[
                ("closestDifficulty", closest_difficulty.to_string()),
                ("count", "1".to_string()),
            ]);
        let response = self.client.send_expecting(request, StatusCode::OK).await?;

        let mut puzzles: Vec<Puzzle> = BackendClient::records(response).await?;
        if puzzles.is_empty() {
            warn!(closest_difficulty, "Puzzle catalog returned no puzzles");
            return Err(UpstreamError::Status(404));
        }
        Ok(puzzles.swap_remove(0))
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    async fn find_drill(&self, auth: &AuthContext, strategy: &str) -> Result<Value, UpstreamError> {
        let request = self
            .client
            .request(Method::GET, PUZZLES_PATH, auth)
            .query(&[("drillStrategies[]", strategy), ("count", "1")]);
        let response = self.client.send_expecting(request, StatusCode::OK).await?;
        BackendClient::body(response).await
    }
}

/// In-memory puzzle catalog for development and testing
#[derive(Default)]
pub struct InMemoryPuzzleStore {
    puzzles: RwLock<Vec<Puzzle>>,
}

const SAMPLE_SOLUTION: &str =
    "534678912672195348198342567859761423426853791713924856961537284287419635345286179";

impl InMemoryPuzzleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small catalog over one solution, used by `stores.mode = memory`
    pub fn with_sample_puzzles() -> Self {
        let sample = |puzzle: &str, difficulty: i64, strategies: &[&str]| Puzzle {
            puzzle: puzzle.to_string(),
            puzzle_solution: SAMPLE_SOLUTION.to_string(),
            difficulty,
            drill_strategies: strategies.iter().map(|s| s.to_string()).collect(),
        };

        Self {
            puzzles: RwLock::new(vec![
                sample(
                    "530070000600195000098000060800060003400803001700020006060000280000419005000080079",
                    150,
                    &["NAKED_SINGLE"],
                ),
                sample(
                    "530070000600095000098000060000060000400803001700020006000000280000419005000080079",
                    500,
                    &["HIDDEN_SINGLE", "NAKED_PAIR"],
                ),
                sample(
                    "500070000600095000008000060800060000400803001000000006060000280000419000000080070",
                    850,
                    &["HIDDEN_PAIR", "POINTING_PAIR"],
                ),
            ]),
        }
    }

    pub async fn insert(&self, puzzle: Puzzle) {
        self.puzzles.write().await.push(puzzle);
    }
}

#[async_trait]
impl PuzzleStore for InMemoryPuzzleStore {
    async fn find_puzzle(
        &self,
        _auth: &AuthContext,
        closest_difficulty: i64,
    ) -> Result<Puzzle, UpstreamError> {
        self.puzzles
            .read()
            .await
            .iter()
            .min_by_key(|p| (p.difficulty - closest_difficulty).abs())
            .cloned()
            .ok_or(UpstreamError::Status(404))
    }

    async fn find_drill(&self, _auth: &AuthContext, strategy: &str) -> Result<Value, UpstreamError> {
        let puzzles = self.puzzles.read().await;
        let drill = puzzles
            .iter()
            .find(|p| p.drill_strategies.iter().any(|s| s == strategy))
            .ok_or(UpstreamError::Status(404))?;

        serde_json::to_value(vec![drill]).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn auth() -> AuthContext {
        AuthContext {
            user_id: "auth0-1".to_string(),
            authorization: "Bearer token".to_string(),
        }
    }

    #[rstest]
    #[case(0, 150)]
    #[case(320, 150)]
    #[case(330, 500)]
    #[case(1000, 850)]
    #[tokio::test]
    async fn find_puzzle_picks_nearest_difficulty(#[case] requested: i64, #[case] expected: i64) {
        let store = InMemoryPuzzleStore::with_sample_puzzles();
        let puzzle = store.find_puzzle(&auth(), requested).await.unwrap();
        assert_eq!(puzzle.difficulty, expected);
    }

    #[tokio::test]
    async fn empty_catalog_is_404() {
        let store = InMemoryPuzzleStore::new();
        let result = store.find_puzzle(&auth(), 500).await;
        assert_eq!(result, Err(UpstreamError::Status(404)));
    }

    #[tokio::test]
    async fn drill_matches_strategy() {
        let store = InMemoryPuzzleStore::with_sample_puzzles();
        let drill = store.find_drill(&auth(), "NAKED_PAIR").await.unwrap();
        assert_eq!(drill[0]["difficulty"], 500);
        assert_eq!(drill[0]["drillStrategies"][1], "NAKED_PAIR");
    }

    #[tokio::test]
    async fn unknown_drill_strategy_is_404() {
        let store = InMemoryPuzzleStore::with_sample_puzzles();
        let result = store.find_drill(&auth(), "SWORDFISH").await;
        assert_eq!(result, Err(UpstreamError::Status(404)));
    }
}
