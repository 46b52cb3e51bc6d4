// Backend store clients: one trait per store, an HTTP implementation and an in-memory one
pub mod active_games;
pub mod client;
pub mod errors;
pub mod puzzles;
pub mod statistics;

pub use active_games::{
    ActiveGameOperation, ActiveGameStore, HttpActiveGameStore, InMemoryActiveGameStore,
};
pub use client::BackendClient;
pub use errors::UpstreamError;
pub use puzzles::{HttpPuzzleStore, InMemoryPuzzleStore, PuzzleStore};
pub use statistics::{
    HttpStatisticsStore, InMemoryStatisticsStore, StatisticsOperation, StatisticsStore,
};

use serde_json::Value;

/// Applies a store-style patch body (an object, or a one-element array holding one) to a record
pub(crate) fn merge_patch(record: &mut Value, patch: &Value) {
    let fields = match patch {
        Value::Array(items) => items.first(),
        other => Some(other),
    };

    if let (Some(Value::Object(fields)), Value::Object(target)) = (fields, record) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
}
