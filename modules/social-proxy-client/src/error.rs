use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProxyError>;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Network error: {message}")]
    Network { message: String, unreachable: bool },

    #[error("Proxy error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Upstream search API returned errors: {0}")]
    Upstream(String),
}

impl ProxyError {
    /// The proxy could not be reached at all (not deployed, wrong host, refused).
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ProxyError::Network { unreachable: true, .. })
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ProxyError::Parse(err.to_string());
        }
        ProxyError::Network {
            unreachable: err.is_connect(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Parse(err.to_string())
    }
}
