use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use ai_client::parse_json;
use sentinel_common::{
    AnalysisInput, Post, PostSource, SearchSource, SentinelError, SourceKind, TimeFrame,
};

use crate::traits::{CollectedBatch, GroundedSearcher, PostCollector};

/// One item the search-grounded model reports. Search grounding cannot be
/// combined with a response schema, so every field is optional and the
/// mapping fills gaps.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebFinding {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    author_handle: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

/// News and web coverage found through Google-Search-grounded generation.
pub struct WebSearchCollector {
    searcher: Arc<dyn GroundedSearcher>,
}

impl WebSearchCollector {
    pub fn new(searcher: Arc<dyn GroundedSearcher>) -> Self {
        Self { searcher }
    }
}

pub(crate) fn search_prompt(input: &AnalysisInput) -> String {
    format!(
        "Search the web for recent news articles, blog posts, and public social media posts \
         about \"{topic}\" in {country} published between {start} and {end}.\n\
         Focus on claims, stories, and messages that are circulating widely or being debated.\n\
         Return ONLY a JSON array (no commentary) where each item has:\n\
         - \"author\": the outlet or person who published it\n\
         - \"authorHandle\": their social handle or site domain\n\
         - \"content\": a faithful one-to-three sentence summary of what the item claims\n\
         - \"timestamp\": publication date as YYYY-MM-DD\n\
         - \"link\": the URL of the item\n\
         - \"source\": \"Google News\" for news outlets, otherwise \"Web\"\n\
         Return between 10 and 30 items.",
        topic = input.topic,
        country = input.country,
        start = input.time_frame.start,
        end = input.time_frame.end,
    )
}

fn parse_timestamp(raw: Option<&str>, time_frame: &TimeFrame) -> DateTime<Utc> {
    let fallback = || time_frame.end.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let Some(raw) = raw.map(str::trim) else {
        return fallback();
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Utc);
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(),
        Err(_) => fallback(),
    }
}

fn into_post(finding: WebFinding, time_frame: &TimeFrame) -> Option<Post> {
    let content = finding.content.trim().to_string();
    if content.is_empty() {
        return None;
    }

    let source = match finding.source.as_deref().map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("google news") => PostSource::GoogleNews,
        _ => PostSource::Web,
    };
    let author = finding
        .author
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| "Unknown Source".to_string());
    let author_handle = finding
        .author_handle
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| author.clone());

    Some(Post {
        id: format!("web_{}", Uuid::new_v4().simple()),
        source,
        timestamp: parse_timestamp(finding.timestamp.as_deref(), time_frame),
        author,
        author_handle,
        content,
        engagement: Default::default(),
        image_url: None,
        link: finding.link.unwrap_or_default(),
    })
}

#[async_trait]
impl PostCollector for WebSearchCollector {
    fn kind(&self) -> SourceKind {
        SourceKind::WebSearch
    }

    async fn collect(&self, input: &AnalysisInput) -> Result<CollectedBatch> {
        let answer = self
            .searcher
            .grounded_search(&search_prompt(input))
            .await
            .map_err(|e| {
                SentinelError::collector(self.kind(), format!("grounded web search failed: {e}"))
            })?;
        debug!(chars = answer.text.len(), sources = answer.sources.len(), "Grounded answer received");

        let findings: Vec<WebFinding> = parse_json(&answer.text).map_err(|e| {
            SentinelError::collector(self.kind(), format!("web search returned unusable JSON: {e}"))
        })?;

        let posts: Vec<Post> = findings
            .into_iter()
            .filter_map(|f| into_post(f, &input.time_frame))
            .collect();
        let sources = answer
            .sources
            .into_iter()
            .map(|s| SearchSource { uri: s.uri, title: s.title })
            .collect();

        info!(posts = posts.len(), "Web search collection complete");
        Ok(CollectedBatch::new(posts, sources))
    }
}
