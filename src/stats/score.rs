use super::models::ActiveGameSession;

/// Difficulty is reported on a 0..=1000 scale
pub const MAX_DIFFICULTY: f64 = 1000.0;
/// Points available for difficulty
pub const DIFFICULTY_WEIGHT: f64 = 35.0;
/// Points available before hint deductions
pub const HINT_ALLOWANCE: f64 = 10.0;
/// Points available before wrong-cell deductions
pub const WRONG_CELL_ALLOWANCE: f64 = 30.0;
/// Points available before one-per-second time deductions
pub const TIME_ALLOWANCE: f64 = 35.0;

/// Scores a finished attempt.
///
/// Evaluated in `f64` in a fixed operand order and rounded half away from
/// zero, so the same telemetry always produces the same integer. Inputs are
/// not clamped: slow or error-heavy play produces a negative score.
pub fn compute_score(difficulty: i64, hints_used: i64, wrong_cells: i64, elapsed_time: f64) -> i64 {
    let raw = (difficulty as f64 / MAX_DIFFICULTY * DIFFICULTY_WEIGHT)
        + (HINT_ALLOWANCE - hints_used as f64)
        + (WRONG_CELL_ALLOWANCE - wrong_cells as f64)
        + (TIME_ALLOWANCE - elapsed_time);

    // f64::round rounds half-way cases away from zero
    raw.round() as i64
}

pub fn score_session(session: &ActiveGameSession) -> i64 {
    compute_score(
        session.difficulty,
        session.num_hints_used,
        session.num_wrong_cells_played,
        session.elapsed_time,
    )
}
