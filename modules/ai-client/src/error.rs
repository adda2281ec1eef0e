use thiserror::Error;

use crate::util::ExtractError;

pub type Result<T> = std::result::Result<T, AiError>;

/// Failure talking to the model service.
///
/// `Transport` and `BadResponse` are kept apart so callers can tell a flaky
/// network from a service that answered with something unusable.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network/transport failure talking to the model service: {0}")]
    Transport(String),

    #[error("Model service error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model service returned an unexpected response: {0}")]
    BadResponse(String),

    #[error("Model service blocked the prompt: {0}")]
    Blocked(String),
}

impl AiError {
    /// Whether retrying the same call later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AiError::Transport(_) => true,
            AiError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AiError::BadResponse(e.to_string())
        } else {
            AiError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AiError {
    fn from(e: serde_json::Error) -> Self {
        AiError::BadResponse(e.to_string())
    }
}

impl From<ExtractError> for AiError {
    fn from(e: ExtractError) -> Self {
        AiError::BadResponse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(AiError::Transport("reset".into()).is_transient());
        assert!(AiError::Api { status: 503, message: String::new() }.is_transient());
        assert!(AiError::Api { status: 429, message: String::new() }.is_transient());
        assert!(!AiError::Api { status: 400, message: String::new() }.is_transient());
        assert!(!AiError::BadResponse("x".into()).is_transient());
    }

    #[test]
    fn messages_distinguish_transport_from_shape() {
        let transport = AiError::Transport("connection refused".into()).to_string();
        let shape = AiError::BadResponse("missing field `title`".into()).to_string();
        assert!(transport.contains("Network/transport"));
        assert!(shape.contains("unexpected response"));
    }
}
