//! Error types for easel-gen

use thiserror::Error;

/// Generation error type
#[derive(Debug, Error)]
pub enum Error {
    /// Backend not configured
    #[error("generation backend not configured: {0}")]
    NotConfigured(String),

    /// API error
    #[error("api error: {0}")]
    Api(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimit,

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),
}

impl Error {
    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "not_configured",
            Self::Api(_) => "api_error",
            Self::RateLimit => "rate_limit",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Network(_) => "network_error",
            Self::Timeout(_) => "timeout",
        }
    }
}

impl From<Error> for easel_canvas::Error {
    fn from(err: Error) -> Self {
        easel_canvas::Error::Upstream(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_to_upstream() {
        let err: easel_canvas::Error = Error::RateLimit.into();
        assert_eq!(err, easel_canvas::Error::Upstream("rate limit exceeded".to_string()));
        assert_eq!(Error::Timeout(500).code(), "timeout");
    }
}
