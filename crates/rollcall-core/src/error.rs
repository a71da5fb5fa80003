use thiserror::Error;

/// Top-level error type for rollcall.
#[derive(Debug, Error)]
pub enum CheckinError {
    /// Credential or session rejected by the remote side. Never retried.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Network or protocol failure talking to the remote agent.
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// The requested affordance is not offered by the reply or the transport.
    #[error("affordance unavailable: {0}")]
    AffordanceUnavailable(String),

    /// The run deadline fired while waiting.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Notification delivery failed.
    #[error("notify error: {0}")]
    Notify(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CheckinError {
    /// Whether the orchestrator may spend another attempt on this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_errors_are_retryable() {
        assert!(CheckinError::Transport("reset".into()).is_retryable());
        assert!(!CheckinError::Unauthorized("bad token".into()).is_retryable());
        assert!(!CheckinError::Cancelled("deadline".into()).is_retryable());
        assert!(!CheckinError::Config("missing".into()).is_retryable());
    }
}
