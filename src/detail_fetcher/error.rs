use thiserror::Error;

/// Ways a detail lookup can fail. None of them abort a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The source has no record for this identifier.
    #[error("detail unavailable: {0}")]
    DetailUnavailable(String),

    /// Network failure, timeout, throttling or a server-side error.
    #[error("transient fetch error: {0}")]
    TransientFetchError(String),

    /// The source answered, but the payload could not be decoded.
    #[error("invalid detail response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Returns true if this error type should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::TransientFetchError(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchError::DetailUnavailable(_) => "detail_unavailable",
            FetchError::TransientFetchError(_) => "transient",
            FetchError::InvalidResponse(_) => "invalid_response",
        }
    }
}
