// Public API
pub use errors::{FinalizeError, FinalizeStep};
pub use finalizer::{FinalizePhase, Finalizer};
pub use lessons::LessonsService;
pub use models::{
    ActiveGameSession, AggregateKey, DateRange, FinalizationResult, StatisticsAggregate,
    LIFETIME_SENTINEL,
};
pub use score::compute_score;

pub mod clock;
pub mod handlers;
pub mod merger;
pub mod models;
pub mod score;

// Internal modules
mod errors;
mod finalizer;
mod lessons;
