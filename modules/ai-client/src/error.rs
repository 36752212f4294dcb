use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Failures surfaced by provider adapters. This layer performs no retries;
/// backoff policy belongs to the caller.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("quota exhausted: {0}")]
    Quota(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed provider payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}
