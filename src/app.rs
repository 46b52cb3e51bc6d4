use axum::{
    middleware,
    routing::get,
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth;
use crate::game::handlers::{get_drill, get_game, save_game, start_game};
use crate::shared::{handle_panic, AppError, AppState, ErrorCode};
use crate::stats::handlers::{end_game, get_learned_lessons, patch_learned_lessons};

/// Builds the full HTTP surface: authenticated `/api/v1` routes plus `/health`
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/newGame", get(start_game))
        .route(
            "/activeGames",
            get(get_game).patch(save_game).delete(end_game),
        )
        .route("/drillGame", get(get_drill))
        .route(
            "/learnedLessons",
            get(get_learned_lessons).patch(patch_learned_lessons),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::jwt_auth));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .fallback(invalid_path)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn invalid_path() -> AppError {
    AppError::NotFound(ErrorCode::InvalidPath)
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
