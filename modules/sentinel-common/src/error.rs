use std::fmt::Display;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Collector '{source_name}' failed: {message}")]
    Collector {
        source_name: String,
        message: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl SentinelError {
    pub fn collector(source_name: impl Display, error: impl Display) -> Self {
        SentinelError::Collector {
            source_name: source_name.to_string(),
            message: error.to_string(),
        }
    }
}

impl From<std::io::Error> for SentinelError {
    fn from(e: std::io::Error) -> Self {
        SentinelError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for SentinelError {
    fn from(e: serde_json::Error) -> Self {
        SentinelError::Storage(e.to_string())
    }
}
