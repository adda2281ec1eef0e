// Trait seams for the analysis pipeline.
//
// PostCollector: one per source kind (web search, social proxy, demo).
// NarrativeModel: every remote model call the pipeline and derived actions make.
// GroundedSearcher: the search-grounded generation the web collector relies on.
//
// The pipeline only sees these traits, so tests swap in MockCollector and
// MockModel: no network, no API key.

use anyhow::Result;
use async_trait::async_trait;

use ai_client::{AiError, GenerateOptions, Gemini, GroundedAnswer, TextStream};
use sentinel_common::{
    AnalysisInput, ChatMessage, CounterOpportunity, Narrative, Post, SearchSource,
    SimulationResult, SourceKind,
};

use crate::pipeline::detector::DetectedCluster;
use crate::pipeline::enricher::Enrichment;

// ---------------------------------------------------------------------------
// PostCollector
// ---------------------------------------------------------------------------

/// Posts and citations one collector produced for a run.
#[derive(Debug, Clone, Default)]
pub struct CollectedBatch {
    pub posts: Vec<Post>,
    pub sources: Vec<SearchSource>,
}

impl CollectedBatch {
    pub fn new(posts: Vec<Post>, sources: Vec<SearchSource>) -> Self {
        Self { posts, sources }
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

#[async_trait]
pub trait PostCollector: Send + Sync {
    /// Which `SourceKind` this collector serves.
    fn kind(&self) -> SourceKind;

    /// Fetch posts matching the analyst's filters.
    async fn collect(&self, input: &AnalysisInput) -> Result<CollectedBatch>;
}

// ---------------------------------------------------------------------------
// NarrativeModel
// ---------------------------------------------------------------------------

#[async_trait]
pub trait NarrativeModel: Send + Sync {
    /// Cluster posts into narratives. One call per run.
    async fn detect(
        &self,
        posts: &[Post],
        context: &str,
    ) -> std::result::Result<Vec<DetectedCluster>, AiError>;

    /// DMMI classification, origin attribution, and counter-opportunities for one narrative.
    async fn enrich(
        &self,
        narrative: &Narrative,
        posts: &[Post],
    ) -> std::result::Result<Enrichment, AiError>;

    /// Markdown briefing for allied organizations.
    async fn brief(&self, narrative: &Narrative) -> std::result::Result<String, AiError>;

    /// Step-by-step plan for executing one counter-opportunity.
    async fn counter_plan(
        &self,
        narrative: &Narrative,
        counter: &CounterOpportunity,
    ) -> std::result::Result<String, AiError>;

    /// Red-team wargame of a generated plan.
    async fn simulate(
        &self,
        narrative: &Narrative,
        counter: &CounterOpportunity,
        plan: &str,
    ) -> std::result::Result<SimulationResult, AiError>;

    /// Short tasking note for the response team.
    async fn assignment_brief(
        &self,
        narrative: &Narrative,
        posts: &[Post],
    ) -> std::result::Result<String, AiError>;

    /// Streamed reply to the latest user turn in `history`.
    async fn chat(
        &self,
        narrative: &Narrative,
        history: &[ChatMessage],
    ) -> std::result::Result<TextStream, AiError>;
}

// ---------------------------------------------------------------------------
// GroundedSearcher
// ---------------------------------------------------------------------------

#[async_trait]
pub trait GroundedSearcher: Send + Sync {
    async fn grounded_search(&self, prompt: &str) -> std::result::Result<GroundedAnswer, AiError>;
}

#[async_trait]
impl GroundedSearcher for Gemini {
    async fn grounded_search(&self, prompt: &str) -> std::result::Result<GroundedAnswer, AiError> {
        let options = GenerateOptions::new().temperature(0.3);
        Gemini::grounded_search(self, prompt, &options).await
    }
}
