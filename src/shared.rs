use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use strum_macros::Display;
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::TokenConfig;
use crate::config::{AppConfig, StoreMode};
use crate::stats::clock::{Clock, LocalClock};
use crate::stores::{
    ActiveGameStore, BackendClient, HttpActiveGameStore, HttpPuzzleStore, HttpStatisticsStore,
    InMemoryActiveGameStore, InMemoryPuzzleStore, InMemoryStatisticsStore, PuzzleStore,
    StatisticsStore, UpstreamError,
};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub active_games: Arc<dyn ActiveGameStore>,
    pub statistics: Arc<dyn StatisticsStore>,
    pub puzzles: Arc<dyn PuzzleStore>,
    pub clock: Arc<dyn Clock>,
    pub token_config: TokenConfig,
}

impl AppState {
    pub fn new(
        active_games: Arc<dyn ActiveGameStore>,
        statistics: Arc<dyn StatisticsStore>,
        puzzles: Arc<dyn PuzzleStore>,
        clock: Arc<dyn Clock>,
        token_config: TokenConfig,
    ) -> Self {
        Self {
            active_games,
            statistics,
            puzzles,
            clock,
            token_config,
        }
    }

    /// Wires the store implementations selected by `stores.mode`
    pub fn from_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        let token_config = TokenConfig::from_config(&config.auth);
        let clock: Arc<dyn Clock> = Arc::new(LocalClock);

        let state = match config.stores.mode {
            StoreMode::Http => {
                let timeout = config.stores.request_timeout();
                Self::new(
                    Arc::new(HttpActiveGameStore::new(BackendClient::new(
                        &config.stores.active_games_url,
                        timeout,
                    )?)),
                    Arc::new(HttpStatisticsStore::new(BackendClient::new(
                        &config.stores.statistics_url,
                        timeout,
                    )?)),
                    Arc::new(HttpPuzzleStore::new(BackendClient::new(
                        &config.stores.puzzles_url,
                        timeout,
                    )?)),
                    clock,
                    token_config,
                )
            }
            StoreMode::Memory => Self::new(
                Arc::new(InMemoryActiveGameStore::new()),
                Arc::new(InMemoryStatisticsStore::new()),
                Arc::new(InMemoryPuzzleStore::with_sample_puzzles()),
                clock,
                token_config,
            ),
        };

        Ok(state)
    }
}

/// Caller-facing error identifiers, rendered verbatim as `errorMessage`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorCode {
    NoTokenProvided,
    InvalidToken,
    InvalidPath,
    MethodNotAllowed,
    InvalidQuery,
    InvalidBody,
    InvalidDifficulty,
    InvalidPuzzle,
    InvalidDrillStrategies,
    StartGameDeleteOldActiveGamesFailed,
    StartGamePuzzleFetchFailed,
    StartGameCreateActiveGameFailed,
    GetGameFetchFailed,
    SaveGamePatchFailed,
    DrillFetchFailed,
    LearnedLessonsFetchFailed,
    LearnedLessonsCreateFailed,
    LearnedLessonsUpdateFailed,
    ActiveGameFetchFailed,
    LifetimeAggregateReadFailed,
    LifetimeAggregateWriteFailed,
    DailyAggregateReadFailed,
    DailyAggregateWriteFailed,
    ActiveGameDeleteFailed,
    UnknownError,
}

#[derive(Error, Debug, PartialEq)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(ErrorCode),

    #[error("Unauthorized: {0}")]
    Unauthorized(ErrorCode),

    #[error("Not found: {0}")]
    NotFound(ErrorCode),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{code} (status {status})")]
    Upstream { code: ErrorCode, status: u16 },

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// Tags an upstream failure with the flow step it happened in
    pub fn upstream(code: ErrorCode, error: &UpstreamError) -> Self {
        AppError::Upstream {
            code,
            status: error.status(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(code)
            | AppError::Unauthorized(code)
            | AppError::NotFound(code)
            | AppError::Upstream { code, .. } => *code,
            AppError::MethodNotAllowed => ErrorCode::MethodNotAllowed,
            AppError::Internal => ErrorCode::UnknownError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "errorMessage": self.code().to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        debug!(reason = %rejection.body_text(), "Rejected query string");
        AppError::Validation(ErrorCode::InvalidQuery)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(reason = %rejection.body_text(), "Rejected JSON body");
        AppError::Validation(ErrorCode::InvalidBody)
    }
}

/// `Query` whose rejections render as the JSON error body
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// `Json` whose rejections render as the JSON error body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Panic handler for `CatchPanicLayer`
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(detail, "Handler panicked");
    AppError::Internal.into_response()
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::stats::clock::FixedClock;
    use chrono::NaiveDate;

    pub const TEST_SECRET: &str = "test-secret";

    /// Builder for creating AppState with overrides for testing
    pub struct AppStateBuilder {
        active_games: Option<Arc<dyn ActiveGameStore>>,
        statistics: Option<Arc<dyn StatisticsStore>>,
        puzzles: Option<Arc<dyn PuzzleStore>>,
        clock: Option<Arc<dyn Clock>>,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                active_games: None,
                statistics: None,
                puzzles: None,
                clock: None,
            }
        }

        pub fn with_active_games(mut self, store: Arc<dyn ActiveGameStore>) -> Self {
            self.active_games = Some(store);
            self
        }

        pub fn with_statistics(mut self, store: Arc<dyn StatisticsStore>) -> Self {
            self.statistics = Some(store);
            self
        }

        pub fn with_puzzles(mut self, store: Arc<dyn PuzzleStore>) -> Self {
            self.puzzles = Some(store);
            self
        }

        pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
            self.clock = Some(clock);
            self
        }

        pub fn build(self) -> AppState {
            AppState {
                active_games: self
                    .active_games
                    .unwrap_or_else(|| Arc::new(InMemoryActiveGameStore::new())),
                statistics: self
                    .statistics
                    .unwrap_or_else(|| Arc::new(InMemoryStatisticsStore::new())),
                puzzles: self
                    .puzzles
                    .unwrap_or_else(|| Arc::new(InMemoryPuzzleStore::new())),
                clock: self.clock.unwrap_or_else(|| {
                    Arc::new(FixedClock::new(
                        NaiveDate::from_ymd_opt(2024, 11, 23).unwrap(),
                    ))
                }),
                token_config: TokenConfig::new(TEST_SECRET),
            }
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
