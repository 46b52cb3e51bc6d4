use std::sync::Arc;
use strum_macros::Display;
use tracing::{debug, info, instrument, warn};

use super::clock::Clock;
use super::errors::{FinalizeError, FinalizeStep};
use super::merger;
use super::models::{ActiveGameSession, DateRange, FinalizationResult};
use super::score::score_session;
use crate::auth::AuthContext;
use crate::stores::{ActiveGameStore, StatisticsStore, UpstreamError};

/// Where a finalize run currently is; logged as it advances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FinalizePhase {
    Fetching,
    Scoring,
    MergingLifetime,
    MergingDaily,
    Deleting,
    Done,
}

/// Ends an active session: scores it, folds it into the lifetime and daily
/// aggregates and finally deletes it.
///
/// Steps run strictly in order and the first failure aborts the run. Nothing
/// is rolled back: a failure while merging the daily aggregate leaves the
/// lifetime aggregate already updated, and the session is kept so the caller
/// can retry. A retry after such a failure counts the session twice in the
/// lifetime aggregate.
///
/// Each aggregate is read, merged in process and written back with no
/// transaction around the pair. Two finalizes for the same user racing on the
/// same key can both read the same snapshot, in which case the later write
/// wins and one game is lost from that aggregate.
pub struct Finalizer {
    active_games: Arc<dyn ActiveGameStore>,
    statistics: Arc<dyn StatisticsStore>,
    clock: Arc<dyn Clock>,
}

impl Finalizer {
    pub fn new(
        active_games: Arc<dyn ActiveGameStore>,
        statistics: Arc<dyn StatisticsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            active_games,
            statistics,
            clock,
        }
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    pub async fn finalize(
        &self,
        auth: &AuthContext,
        puzzle: &str,
    ) -> Result<FinalizationResult, FinalizeError> {
        debug!(phase = %FinalizePhase::Fetching);
        let session = self
            .active_games
            .get_active_game(auth, puzzle)
            .await
            .map_err(|e| Self::failed(FinalizeStep::ActiveGameFetch, e))?;

        debug!(phase = %FinalizePhase::Scoring);
        let score = score_session(&session);
        debug!(score, elapsed_time = session.elapsed_time, "Session scored");

        debug!(phase = %FinalizePhase::MergingLifetime);
        self.merge_into(
            auth,
            &DateRange::Lifetime,
            &session,
            score,
            FinalizeStep::LifetimeAggregateRead,
            FinalizeStep::LifetimeAggregateWrite,
        )
        .await?;

        debug!(phase = %FinalizePhase::MergingDaily);
        let today = DateRange::Day(self.clock.today());
        self.merge_into(
            auth,
            &today,
            &session,
            score,
            FinalizeStep::DailyAggregateRead,
            FinalizeStep::DailyAggregateWrite,
        )
        .await?;

        debug!(phase = %FinalizePhase::Deleting);
        self.active_games
            .delete_active_game(auth, puzzle)
            .await
            .map_err(|e| Self::failed(FinalizeStep::ActiveGameDelete, e))?;

        debug!(phase = %FinalizePhase::Done);
        info!(score, "Session finalized");
        Ok(FinalizationResult::from_session(&session, score))
    }

    /// Look up the aggregate for `date_range`, then create it or write back the merge
    #[instrument(skip_all, fields(date_range = %date_range))]
    async fn merge_into(
        &self,
        auth: &AuthContext,
        date_range: &DateRange,
        session: &ActiveGameSession,
        score: i64,
        read_step: FinalizeStep,
        write_step: FinalizeStep,
    ) -> Result<(), FinalizeError> {
        let existing = self
            .statistics
            .get_aggregate(auth, date_range)
            .await
            .map_err(|e| Self::failed(read_step, e))?;

        let aggregate = merger::apply(existing.as_ref(), &auth.user_id, date_range, session, score);

        let written = match existing {
            Some(_) => {
                debug!(games = aggregate.num_games_played, "Updating aggregate");
                self.statistics
                    .update_aggregate(auth, date_range, &aggregate)
                    .await
            }
            None => {
                debug!("Creating aggregate");
                self.statistics.create_aggregate(auth, &aggregate).await
            }
        };

        written.map_err(|e| Self::failed(write_step, e))
    }

    fn failed(step: FinalizeStep, cause: UpstreamError) -> FinalizeError {
        let error = FinalizeError::at(step, cause);
        warn!(step = %step, status = error.status(), error = %error, "Finalize step failed");
        error
    }
}
