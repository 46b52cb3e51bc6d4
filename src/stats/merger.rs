use super::models::{ActiveGameSession, DateRange, StatisticsAggregate};

/// First aggregate for a key: a single game's worth of statistics
pub fn initialize(
    user_id: &str,
    date_range: &DateRange,
    session: &ActiveGameSession,
    score: i64,
) -> StatisticsAggregate {
    StatisticsAggregate {
        user_id: user_id.to_string(),
        date_range: date_range.key(),
        score,
        average_solve_time: session.elapsed_time,
        fastest_solve_time: Some(session.elapsed_time),
        total_solve_time: session.elapsed_time,
        num_hints_used: session.num_hints_used,
        num_wrong_cells_played: session.num_wrong_cells_played,
        num_games_played: 1,
        strategies_learned: None,
    }
}

/// Folds one more finished session into an existing aggregate.
///
/// Score, total time, hints and wrong cells are sums; the fastest time is a
/// running minimum; the average is always recomputed from the new total and
/// game count. `strategies_learned` is left out of the result so a write
/// never touches it.
pub fn merge(
    existing: &StatisticsAggregate,
    session: &ActiveGameSession,
    new_score: i64,
) -> StatisticsAggregate {
    let num_games_played = existing.num_games_played + 1;
    let total_solve_time = existing.total_solve_time + session.elapsed_time;

    // A key-only record has no games behind its minimum
    let fastest_solve_time = match existing.fastest_solve_time {
        Some(fastest) if existing.num_games_played > 0 => fastest.min(session.elapsed_time),
        _ => session.elapsed_time,
    };

    StatisticsAggregate {
        user_id: existing.user_id.clone(),
        date_range: existing.date_range.clone(),
        score: existing.score + new_score,
        average_solve_time: total_solve_time / num_games_played as f64,
        fastest_solve_time: Some(fastest_solve_time),
        total_solve_time,
        num_hints_used: existing.num_hints_used + session.num_hints_used,
        num_wrong_cells_played: existing.num_wrong_cells_played + session.num_wrong_cells_played,
        num_games_played,
        strategies_learned: None,
    }
}

/// Create-or-merge in one call: `existing` is the result of the existence lookup
pub fn apply(
    existing: Option<&StatisticsAggregate>,
    user_id: &str,
    date_range: &DateRange,
    session: &ActiveGameSession,
    score: i64,
) -> StatisticsAggregate {
    match existing {
        Some(existing) => merge(existing, session, score),
        None => initialize(user_id, date_range, session, score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;
    use serde_json::json;

    fn session(elapsed: f64, hints: i64, wrong: i64) -> ActiveGameSession {
        ActiveGameSession {
            user_id: "auth0-1".into(),
            puzzle: "puzzle".into(),
            puzzle_solution: "solution".into(),
            difficulty: 500,
            elapsed_time: elapsed,
            num_hints_used: hints,
            num_wrong_cells_played: wrong,
        }
    }

    #[test]
    fn initialize_seeds_single_game() {
        let day = DateRange::Day(NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
        let aggregate = initialize("auth0-1", &day, &session(10.0, 1, 0), 92);

        assert_eq!(aggregate.user_id, "auth0-1");
        assert_eq!(aggregate.date_range, "2024-02-03");
        assert_eq!(aggregate.score, 92);
        assert_eq!(aggregate.num_games_played, 1);
        assert_eq!(aggregate.total_solve_time, 10.0);
        assert_eq!(aggregate.average_solve_time, 10.0);
        assert_eq!(aggregate.fastest_solve_time, Some(10.0));
        assert_eq!(aggregate.num_hints_used, 1);
        assert_eq!(aggregate.num_wrong_cells_played, 0);
    }

    #[test]
    fn merge_sums_counters_and_recomputes_average() {
        let existing = initialize("auth0-1", &DateRange::Lifetime, &session(30.0, 2, 4), 40);
        let merged = merge(&existing, &session(15.0, 1, 1), 60);

        assert_eq!(merged.score, 100);
        assert_eq!(merged.total_solve_time, 45.0);
        assert_eq!(merged.num_games_played, 2);
        assert_eq!(merged.average_solve_time, 22.5);
        assert_eq!(merged.num_hints_used, 3);
        assert_eq!(merged.num_wrong_cells_played, 5);
        assert_eq!(merged.date_range, "1111-11-11");
    }

    #[test]
    fn merge_keeps_negative_scores() {
        let existing = initialize("auth0-1", &DateRange::Lifetime, &session(500.0, 0, 0), -390);
        let merged = merge(&existing, &session(400.0, 0, 0), -290);
        assert_eq!(merged.score, -680);
    }

    #[rstest]
    #[case(vec![20.0, 10.0, 30.0], 10.0)]
    #[case(vec![5.0, 50.0, 7.5, 6.0], 5.0)]
    #[case(vec![12.0, 12.0], 12.0)]
    #[case(vec![42.0], 42.0)]
    fn fastest_is_running_minimum_not_sum(#[case] times: Vec<f64>, #[case] fastest: f64) {
        let sessions: Vec<_> = times.iter().map(|t| session(*t, 0, 0)).collect();
        let mut aggregate = initialize("auth0-1", &DateRange::Lifetime, &sessions[0], 1);
        for s in &sessions[1..] {
            aggregate = merge(&aggregate, s, 1);
        }

        let total: f64 = times.iter().sum();
        assert_eq!(aggregate.fastest_solve_time, Some(fastest));
        assert_eq!(aggregate.total_solve_time, total);
        assert_eq!(aggregate.num_games_played, times.len() as i64);
        assert_eq!(
            aggregate.average_solve_time,
            aggregate.total_solve_time / aggregate.num_games_played as f64
        );
    }

    #[test]
    fn average_invariant_holds_after_every_merge() {
        let mut aggregate = initialize("auth0-1", &DateRange::Lifetime, &session(7.3, 0, 0), 0);
        for elapsed in [11.1, 0.7, 93.25, 4.0, 18.9] {
            let before = aggregate.clone();
            aggregate = merge(&aggregate, &session(elapsed, 0, 0), 0);

            assert_eq!(aggregate.total_solve_time, before.total_solve_time + elapsed);
            assert_eq!(aggregate.num_games_played, before.num_games_played + 1);
            assert_eq!(
                aggregate.average_solve_time,
                aggregate.total_solve_time / aggregate.num_games_played as f64
            );
        }
    }

    #[test]
    fn merge_into_key_only_record_ignores_missing_minimum() {
        let existing: StatisticsAggregate = serde_json::from_value(json!({
            "userID": "auth0-1",
            "dateRange": "1111-11-11",
            "strategiesLearned": ["X_WING"]
        }))
        .unwrap();

        let merged = merge(&existing, &session(25.0, 0, 2), 50);

        assert_eq!(merged.num_games_played, 1);
        assert_eq!(merged.fastest_solve_time, Some(25.0));
        assert_eq!(merged.average_solve_time, 25.0);
        assert!(merged.strategies_learned.is_none());
    }

    #[test]
    fn apply_chooses_create_or_merge() {
        let s = session(10.0, 0, 0);
        let created = apply(None, "auth0-1", &DateRange::Lifetime, &s, 5);
        assert_eq!(created.num_games_played, 1);

        let merged = apply(Some(&created), "auth0-1", &DateRange::Lifetime, &s, 5);
        assert_eq!(merged.num_games_played, 2);
        assert_eq!(merged.score, 10);
    }
}
