// Public API
pub use models::{NewActiveGame, Puzzle};
pub use service::GameService;

pub mod handlers;
pub mod models;

// Internal modules
mod service;
