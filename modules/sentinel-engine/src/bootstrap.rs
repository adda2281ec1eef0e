//! Wiring from `Config` to a ready pipeline. Clients are constructed here,
//! once, and injected; nothing downstream reads the environment.

use std::sync::Arc;

use tracing::info;

use ai_client::Gemini;
use sentinel_common::Config;
use social_proxy_client::SocialProxyClient;

use crate::analyst::GeminiAnalyst;
use crate::collectors::{DemoCollector, SocialProxyCollector, WebSearchCollector};
use crate::history::{FileStore, RunHistory};
use crate::pipeline::AnalysisPipeline;

/// Pipeline with every collector the configuration supports.
///
/// The social collector is only registered when `SOCIAL_PROXY_URL` is set;
/// runs that ask for it otherwise get a warning notice.
pub fn build_pipeline(config: &Config) -> AnalysisPipeline {
    let analyst = Arc::new(GeminiAnalyst::from_config(config));

    let mut search = Gemini::new(&config.gemini_api_key, &config.search_model);
    if let Some(url) = &config.gemini_base_url {
        search = search.with_base_url(url);
    }

    let mut pipeline = AnalysisPipeline::new(analyst)
        .with_policy(config.enrichment_policy)
        .with_collector(Arc::new(WebSearchCollector::new(Arc::new(search))))
        .with_collector(Arc::new(DemoCollector::new()));

    if let Some(url) = &config.social_proxy_url {
        pipeline = pipeline.with_collector(Arc::new(SocialProxyCollector::new(
            SocialProxyClient::new(url.as_str()),
        )));
    }

    info!(policy = ?pipeline.policy(), "Pipeline ready");
    pipeline
}

pub fn file_history(config: &Config) -> RunHistory<FileStore> {
    RunHistory::new(FileStore::new(&config.history_dir))
}
