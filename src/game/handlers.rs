use axum::{
    extract::State,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

use super::service::GameService;
use crate::auth::AuthContext;
use crate::shared::{AppError, AppJson, AppQuery, AppState, ErrorCode};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGameQuery {
    pub closest_difficulty: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PuzzleQuery {
    pub puzzle: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillQuery {
    pub drill_strategies: Option<String>,
}

impl PuzzleQuery {
    /// The puzzle id, rejecting a missing or blank parameter
    pub fn require(self) -> Result<String, AppError> {
        self.puzzle
            .filter(|p| !p.trim().is_empty())
            .ok_or(AppError::Validation(ErrorCode::InvalidPuzzle))
    }
}

fn game_service(state: &AppState) -> GameService {
    GameService::new(Arc::clone(&state.active_games), Arc::clone(&state.puzzles))
}

/// GET /api/v1/newGame?closestDifficulty=N
#[instrument(name = "start_game", skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn start_game(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<NewGameQuery>,
) -> Result<Json<Value>, AppError> {
    let closest_difficulty = query
        .closest_difficulty
        .and_then(|d| d.trim().parse::<i64>().ok())
        .ok_or(AppError::Validation(ErrorCode::InvalidDifficulty))?;

    let game = game_service(&state)
        .start_game(&auth, closest_difficulty)
        .await?;

    info!(closest_difficulty, "New game created");
    Ok(Json(game))
}

/// GET /api/v1/activeGames
#[instrument(name = "get_game", skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn get_game(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let games = game_service(&state).get_game(&auth).await?;
    Ok(Json(games))
}

/// PATCH /api/v1/activeGames?puzzle=P
#[instrument(name = "save_game", skip(state, auth, patch), fields(user_id = %auth.user_id))]
pub async fn save_game(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<PuzzleQuery>,
    AppJson(patch): AppJson<Value>,
) -> Result<Json<Value>, AppError> {
    let puzzle = query.require()?;
    let saved = game_service(&state)
        .save_game(&auth, &puzzle, &patch)
        .await?;
    Ok(Json(saved))
}

/// GET /api/v1/drillGame?drillStrategies=S
#[instrument(name = "get_drill", skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn get_drill(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<DrillQuery>,
) -> Result<Json<Value>, AppError> {
    let strategy = query
        .drill_strategies
        .filter(|s| !s.trim().is_empty())
        .ok_or(AppError::Validation(ErrorCode::InvalidDrillStrategies))?;

    let drill = game_service(&state).get_drill(&auth, &strategy).await?;
    Ok(Json(drill))
}
