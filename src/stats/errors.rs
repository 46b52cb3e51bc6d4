use strum_macros::{Display, EnumIter};
use thiserror::Error;

use crate::shared::{AppError, ErrorCode};
use crate::stores::UpstreamError;

/// Backend call within the finalize workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum FinalizeStep {
    ActiveGameFetch,
    LifetimeAggregateRead,
    LifetimeAggregateWrite,
    DailyAggregateRead,
    DailyAggregateWrite,
    ActiveGameDelete,
}

impl FinalizeStep {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            FinalizeStep::ActiveGameFetch => ErrorCode::ActiveGameFetchFailed,
            FinalizeStep::LifetimeAggregateRead => ErrorCode::LifetimeAggregateReadFailed,
            FinalizeStep::LifetimeAggregateWrite => ErrorCode::LifetimeAggregateWriteFailed,
            FinalizeStep::DailyAggregateRead => ErrorCode::DailyAggregateReadFailed,
            FinalizeStep::DailyAggregateWrite => ErrorCode::DailyAggregateWriteFailed,
            FinalizeStep::ActiveGameDelete => ErrorCode::ActiveGameDeleteFailed,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FinalizeError {
    #[error("{step} failed: {cause}")]
    UpstreamCallFailed {
        step: FinalizeStep,
        cause: UpstreamError,
    },

    #[error("{step} timed out")]
    UpstreamTimeout { step: FinalizeStep },
}

impl FinalizeError {
    pub fn at(step: FinalizeStep, cause: UpstreamError) -> Self {
        if cause.is_timeout() {
            FinalizeError::UpstreamTimeout { step }
        } else {
            FinalizeError::UpstreamCallFailed { step, cause }
        }
    }

    pub fn step(&self) -> FinalizeStep {
        match self {
            FinalizeError::UpstreamCallFailed { step, .. }
            | FinalizeError::UpstreamTimeout { step } => *step,
        }
    }

    /// HTTP status surfaced for this failure
    pub fn status(&self) -> u16 {
        match self {
            FinalizeError::UpstreamCallFailed { cause, .. } => cause.status(),
            FinalizeError::UpstreamTimeout { .. } => UpstreamError::Timeout.status(),
        }
    }
}

impl From<FinalizeError> for AppError {
    fn from(error: FinalizeError) -> Self {
        AppError::Upstream {
            code: error.step().error_code(),
            status: error.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_step_reports_its_own_code() {
        let steps: Vec<FinalizeStep> = FinalizeStep::iter().collect();
        assert_eq!(steps.len(), 6);

        for step in steps {
            assert_eq!(step.error_code().to_string(), format!("{step}Failed"));
        }
    }

    #[test]
    fn test_timeout_becomes_upstream_timeout() {
        let error = FinalizeError::at(FinalizeStep::DailyAggregateRead, UpstreamError::Timeout);
        assert_eq!(
            error,
            FinalizeError::UpstreamTimeout {
                step: FinalizeStep::DailyAggregateRead
            }
        );
        assert_eq!(error.status(), 504);
    }

    #[test]
    fn test_transport_failure_defaults_to_500() {
        let error = FinalizeError::at(
            FinalizeStep::ActiveGameFetch,
            UpstreamError::Transport("connection refused".into()),
        );
        assert_eq!(error.status(), 500);
        assert_eq!(error.step(), FinalizeStep::ActiveGameFetch);
    }

    #[test]
    fn test_app_error_keeps_step_identity() {
        let app_error: AppError =
            FinalizeError::at(FinalizeStep::ActiveGameDelete, UpstreamError::Status(503)).into();
        assert_eq!(
            app_error,
            AppError::Upstream {
                code: ErrorCode::ActiveGameDeleteFailed,
                status: 503
            }
        );
    }
}
