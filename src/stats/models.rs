use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date-range key of the all-time aggregate
pub const LIFETIME_SENTINEL: &str = "1111-11-11";

/// Which rolling window an aggregate summarizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateRange {
    Lifetime,
    Day(NaiveDate),
}

impl DateRange {
    /// Store-facing key: the sentinel, or the day as zero-padded `YYYY-MM-DD`
    pub fn key(&self) -> String {
        match self {
            DateRange::Lifetime => LIFETIME_SENTINEL.to_string(),
            DateRange::Day(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// One in-progress puzzle attempt as held by the active-game store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGameSession {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub puzzle: String,
    #[serde(default)]
    pub puzzle_solution: String,
    pub difficulty: i64,
    /// Seconds spent on the puzzle so far
    #[serde(rename = "currentTime", default)]
    pub elapsed_time: f64,
    #[serde(default)]
    pub num_hints_used: i64,
    #[serde(default)]
    pub num_wrong_cells_played: i64,
}

/// Rolling statistics for one (user, date range) key.
///
/// Records created by the learned-lessons flow only carry the key, so every
/// counter defaults to zero and `fastest_solve_time` to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsAggregate {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub date_range: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub average_solve_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_solve_time: Option<f64>,
    #[serde(default)]
    pub total_solve_time: f64,
    #[serde(default)]
    pub num_hints_used: i64,
    #[serde(default)]
    pub num_wrong_cells_played: i64,
    #[serde(default)]
    pub num_games_played: i64,
    /// Owned by the learned-lessons flow; finalization never writes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategies_learned: Option<serde_json::Value>,
}

/// Key-only record used to bootstrap a lifetime aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateKey {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub date_range: String,
}

/// What the caller gets back from finalizing a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizationResult {
    pub score: i64,
    pub solve_time: f64,
    pub num_hints_used: i64,
    pub num_wrong_cells_played: i64,
}

impl FinalizationResult {
    pub fn from_session(session: &ActiveGameSession, score: i64) -> Self {
        Self {
            score,
            solve_time: session.elapsed_time,
            num_hints_used: session.num_hints_used,
            num_wrong_cells_played: session.num_wrong_cells_played,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(2024, 1, 5, "2024-01-05")]
    #[case(2024, 10, 9, "2024-10-09")]
    #[case(2024, 3, 17, "2024-03-17")]
    #[case(2024, 12, 31, "2024-12-31")]
    #[case(987, 6, 1, "0987-06-01")]
    fn test_day_key_is_zero_padded(
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
        #[case] expected: &str,
    ) {
        let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        assert_eq!(DateRange::Day(date).key(), expected);
    }

    #[test]
    fn test_lifetime_key_is_sentinel() {
        assert_eq!(DateRange::Lifetime.key(), "1111-11-11");
        assert_eq!(DateRange::Lifetime.to_string(), "1111-11-11");
    }

    #[test]
    fn test_session_decodes_store_payload_and_ignores_extra_fields() {
        let payload = json!({
            "userID": "auth0-123",
            "puzzle": "310084002",
            "puzzleSolution": "312784562",
            "difficulty": 800,
            "currentTime": 10,
            "numHintsUsed": 1,
            "numWrongCellsPlayed": 0,
            "moves": [{"cell": 3}]
        });

        let session: ActiveGameSession = serde_json::from_value(payload).unwrap();
        assert_eq!(session.user_id, "auth0-123");
        assert_eq!(session.difficulty, 800);
        assert_eq!(session.elapsed_time, 10.0);
        assert_eq!(session.num_hints_used, 1);
    }

    #[test]
    fn test_key_only_aggregate_decodes_with_defaults() {
        let aggregate: StatisticsAggregate = serde_json::from_value(json!({
            "userID": "auth0-123",
            "dateRange": "1111-11-11",
            "strategiesLearned": ["NAKED_SINGLE"]
        }))
        .unwrap();

        assert_eq!(aggregate.num_games_played, 0);
        assert_eq!(aggregate.score, 0);
        assert!(aggregate.fastest_solve_time.is_none());
        assert_eq!(aggregate.strategies_learned, Some(json!(["NAKED_SINGLE"])));
    }

    #[test]
    fn test_aggregate_write_payload_omits_strategies() {
        let aggregate = StatisticsAggregate {
            user_id: "u".into(),
            date_range: "1111-11-11".into(),
            score: 92,
            average_solve_time: 10.0,
            fastest_solve_time: Some(10.0),
            total_solve_time: 10.0,
            num_hints_used: 1,
            num_wrong_cells_played: 0,
            num_games_played: 1,
            strategies_learned: None,
        };

        let value = serde_json::to_value(&aggregate).unwrap();
        assert_eq!(value["userID"], "u");
        assert_eq!(value["numGamesPlayed"], 1);
        assert!(value.get("strategiesLearned").is_none());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = FinalizationResult {
            score: 92,
            solve_time: 10.0,
            num_hints_used: 1,
            num_wrong_cells_played: 0,
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({"score": 92, "solveTime": 10.0, "numHintsUsed": 1, "numWrongCellsPlayed": 0})
        );
    }
}
