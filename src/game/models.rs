use serde::{Deserialize, Serialize};

/// Catalog entry returned by the puzzle store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Puzzle {
    pub puzzle: String,
    pub puzzle_solution: String,
    pub difficulty: i64,
    #[serde(default)]
    pub drill_strategies: Vec<String>,
}

/// Body of the create call that opens a session for a freshly picked puzzle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActiveGame {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub puzzle: String,
    pub puzzle_solution: String,
    pub difficulty: i64,
}

impl NewActiveGame {
    pub fn for_puzzle(user_id: &str, puzzle: &Puzzle) -> Self {
        Self {
            user_id: user_id.to_string(),
            puzzle: puzzle.puzzle.clone(),
            puzzle_solution: puzzle.puzzle_solution.clone(),
            difficulty: puzzle.difficulty,
        }
    }
}
