use thiserror::Error;

/// Failure of a single call to a backend store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Upstream responded with status {0}")]
    Status(u16),

    #[error("Upstream call timed out")]
    Timeout,

    #[error("Upstream transport error: {0}")]
    Transport(String),

    #[error("Upstream payload could not be decoded: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Status surfaced to the caller for this failure.
    ///
    /// Backend error statuses pass through unchanged. A success-class status in
    /// the wrong place (e.g. 204 where 200 was expected) is not an error status
    /// the caller can act on and resolves to 500, as do transport and decode
    /// failures. Timeouts resolve to 504.
    pub fn status(&self) -> u16 {
        match self {
            UpstreamError::Status(status) if (400..=599).contains(status) => *status,
            UpstreamError::Status(_) => 500,
            UpstreamError::Timeout => 504,
            UpstreamError::Transport(_) | UpstreamError::Decode(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::Status(404))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Timeout)
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            UpstreamError::Timeout
        } else if error.is_decode() {
            UpstreamError::Decode(error.to_string())
        } else {
            UpstreamError::Transport(error.to_string())
        }
    }
}
