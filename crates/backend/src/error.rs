use thiserror::Error;

/// Errors raised by a ticketing provider adapter.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection, TLS or timeout failure before a response arrived.
    #[error("request to {provider} failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    /// The provider answered with a non-OK status.
    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The provider answered OK but the payload could not be interpreted.
    #[error("malformed {provider} payload: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
    },

    #[error("invalid backend configuration: {0}")]
    Config(String),

    #[error("fixture error: {0}")]
    Fixture(String),
}

impl BackendError {
    /// Transient failures worth another attempt: transport errors, 429 and
    /// 5xx statuses.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Transport { .. } => true,
            BackendError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub(crate) fn transport(provider: &'static str, err: reqwest::Error) -> Self {
        BackendError::Transport {
            provider,
            message: err.to_string(),
        }
    }

    pub(crate) fn malformed(provider: &'static str, message: impl std::fmt::Display) -> Self {
        BackendError::Malformed {
            provider,
            message: message.to_string(),
        }
    }
}
