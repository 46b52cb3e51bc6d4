use axum::{
    extract::State,
    Extension, Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

use super::finalizer::Finalizer;
use super::lessons::LessonsService;
use super::models::FinalizationResult;
use crate::auth::AuthContext;
use crate::game::handlers::PuzzleQuery;
use crate::shared::{AppError, AppJson, AppQuery, AppState};

/// DELETE /api/v1/activeGames?puzzle=P
///
/// Finalizes the session: scores it, updates the lifetime and daily statistics
/// and deletes it.
#[instrument(name = "end_game", skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn end_game(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<PuzzleQuery>,
) -> Result<Json<FinalizationResult>, AppError> {
    let puzzle = query.require()?;

    let finalizer = Finalizer::new(
        Arc::clone(&state.active_games),
        Arc::clone(&state.statistics),
        Arc::clone(&state.clock),
    );
    let result = finalizer.finalize(&auth, &puzzle).await?;

    info!(puzzle = %puzzle, score = result.score, "Game ended");
    Ok(Json(result))
}

/// GET /api/v1/learnedLessons
#[instrument(name = "get_learned_lessons", skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn get_learned_lessons(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let service = LessonsService::new(Arc::clone(&state.statistics));
    let lessons = service.get_learned_lessons(&auth).await?;
    Ok(Json(lessons))
}

/// PATCH /api/v1/learnedLessons
#[instrument(name = "patch_learned_lessons", skip(state, auth, patch), fields(user_id = %auth.user_id))]
pub async fn patch_learned_lessons(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(patch): AppJson<Value>,
) -> Result<Json<Value>, AppError> {
    let service = LessonsService::new(Arc::clone(&state.statistics));
    let updated = service.patch_learned_lessons(&auth, &patch).await?;
    Ok(Json(updated))
}
