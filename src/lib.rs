// Library crate for the puzzle game BFF
// This file exposes the public API for the binary and integration tests

pub mod app;
pub mod auth;
pub mod config;
pub mod game;
pub mod shared;
pub mod stats;
pub mod stores;

// Re-export commonly used types for easier access in tests
pub use app::build_router;
pub use auth::{AuthContext, TokenConfig};
pub use config::{AppConfig, ConfigLoader};
pub use shared::{AppError, AppState, ErrorCode};
pub use stats::{FinalizationResult, FinalizeError, FinalizeStep, Finalizer};
