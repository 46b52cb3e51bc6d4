use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::models::DateRange;
use crate::auth::AuthContext;
use crate::shared::{AppError, ErrorCode};
use crate::stores::StatisticsStore;

/// Reads and updates the strategies a player has learned, kept on the lifetime aggregate
pub struct LessonsService {
    statistics: Arc<dyn StatisticsStore>,
}

impl LessonsService {
    pub fn new(statistics: Arc<dyn StatisticsStore>) -> Self {
        Self { statistics }
    }

    /// Returns `strategiesLearned`, creating a key-only lifetime aggregate on first use
    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    pub async fn get_learned_lessons(&self, auth: &AuthContext) -> Result<Value, AppError> {
        let existing = self
            .statistics
            .get_aggregate(auth, &DateRange::Lifetime)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to read lifetime aggregate");
                AppError::upstream(ErrorCode::LearnedLessonsFetchFailed, &e)
            })?;

        let aggregate = match existing {
            Some(aggregate) => Some(aggregate),
            None => {
                info!("No lifetime aggregate yet, creating one");
                self.statistics
                    .create_key_only(auth, &DateRange::Lifetime)
                    .await
                    .map_err(|e| {
                        warn!(error = %e, "Failed to create lifetime aggregate");
                        AppError::upstream(ErrorCode::LearnedLessonsCreateFailed, &e)
                    })?
            }
        };

        Ok(aggregate
            .and_then(|a| a.strategies_learned)
            .unwrap_or_else(|| json!([])))
    }

    #[instrument(skip(self, auth, patch), fields(user_id = %auth.user_id))]
    pub async fn patch_learned_lessons(
        &self,
        auth: &AuthContext,
        patch: &Value,
    ) -> Result<Value, AppError> {
        self.statistics
            .patch_aggregate(auth, &DateRange::Lifetime, patch)
            .await
            .map_err(|e| AppError::upstream(ErrorCode::LearnedLessonsUpdateFailed, &e))
    }
}
