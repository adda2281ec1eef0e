use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::info;

use crate::error::SentinelError;

/// How the enrichment fan-out is scheduled. A run holds one policy throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnrichmentPolicy {
    /// Launch every enrichment call at once; narratives resolve in completion order.
    #[default]
    Concurrent,
    /// One call at a time, in detection order. Gentler on the model quota.
    Sequential,
}

impl FromStr for EnrichmentPolicy {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concurrent" | "parallel" => Ok(EnrichmentPolicy::Concurrent),
            "sequential" => Ok(EnrichmentPolicy::Sequential),
            other => Err(SentinelError::Config(format!(
                "ENRICHMENT_POLICY must be 'concurrent' or 'sequential', got '{other}'"
            ))),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Model service
    pub gemini_api_key: String,
    pub gemini_base_url: Option<String>,
    pub detection_model: String,
    pub enrichment_model: String,
    pub search_model: String,
    pub enrichment_thinking_budget: i32,

    // Collectors
    pub social_proxy_url: Option<String>,

    // Pipeline
    pub enrichment_policy: EnrichmentPolicy,

    // Run history
    pub history_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, SentinelError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SentinelError> {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = optional("GEMINI_API_KEY").ok_or_else(|| {
            SentinelError::Config("GEMINI_API_KEY environment variable is required".to_string())
        })?;

        let enrichment_thinking_budget = match optional("ENRICHMENT_THINKING_BUDGET") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                SentinelError::Config(format!(
                    "ENRICHMENT_THINKING_BUDGET must be a number, got '{raw}'"
                ))
            })?,
            None => 32_768,
        };

        let enrichment_policy = match optional("ENRICHMENT_POLICY") {
            Some(raw) => raw.parse()?,
            None => EnrichmentPolicy::default(),
        };

        Ok(Self {
            gemini_api_key,
            gemini_base_url: optional("GEMINI_BASE_URL"),
            detection_model: optional("DETECTION_MODEL")
                .unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            enrichment_model: optional("ENRICHMENT_MODEL")
                .unwrap_or_else(|| "gemini-2.5-pro".to_string()),
            search_model: optional("SEARCH_MODEL")
                .unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            enrichment_thinking_budget,
            social_proxy_url: optional("SOCIAL_PROXY_URL"),
            enrichment_policy,
            history_dir: optional("HISTORY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".sentinel/history")),
        })
    }

    /// Log the loaded configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            gemini_api_key = %redact(&self.gemini_api_key),
            gemini_base_url = self.gemini_base_url.as_deref().unwrap_or("default"),
            detection_model = self.detection_model.as_str(),
            enrichment_model = self.enrichment_model.as_str(),
            search_model = self.search_model.as_str(),
            thinking_budget = self.enrichment_thinking_budget,
            social_proxy_url = self.social_proxy_url.as_deref().unwrap_or("disabled"),
            enrichment_policy = ?self.enrichment_policy,
            history_dir = %self.history_dir.display(),
            "Configuration loaded"
        );
    }
}

fn redact(secret: &str) -> String {
    if secret.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{tail}")
}
