// Test mocks for the analysis pipeline.
//
// Two mocks matching the two trait boundaries:
// - MockCollector (PostCollector): canned batch or failure, optional delay
// - MockModel (NarrativeModel): canned clusters/enrichments, per-title failures, call counts
//
// Plus fixture helpers for posts, inputs, and complete narratives.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use futures::stream::{self, StreamExt};

use ai_client::{AiError, TextStream};
use sentinel_common::{
    AnalysisInput, Attribution, ChatMessage, Classification, Confidence, CounterOpportunity,
    CounterStrategy, DmmiReport, Engagement, Intent, Narrative, NarrativeStatus, OriginReport,
    Post, PostSource, SearchSource, SimulationResult, SimulationTurn, SourceKind, TimeFrame,
    Veracity,
};

use crate::pipeline::detector::DetectedCluster;
use crate::pipeline::enricher::Enrichment;
use crate::traits::{CollectedBatch, NarrativeModel, PostCollector};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A post dated 2025-03-05 12:00 UTC.
pub fn post(id: &str, content: &str) -> Post {
    Post {
        content: content.to_string(),
        ..post_at(id, Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap())
    }
}

pub fn post_at(id: &str, timestamp: DateTime<Utc>) -> Post {
    Post {
        id: id.to_string(),
        source: PostSource::Demo,
        author: "Test Author".to_string(),
        author_handle: "@tester".to_string(),
        content: format!("content of {id}"),
        timestamp,
        engagement: Engagement::default(),
        image_url: None,
        link: format!("https://example.com/post/{id}"),
    }
}

pub fn source(uri: &str, title: &str) -> SearchSource {
    SearchSource {
        uri: uri.to_string(),
        title: title.to_string(),
    }
}

/// Moldova, "elections", first week of March 2025.
pub fn input(sources: &[SourceKind]) -> AnalysisInput {
    AnalysisInput {
        country: "Moldova".to_string(),
        topic: "elections".to_string(),
        time_frame: TimeFrame {
            start: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(),
        },
        sources: sources.to_vec(),
    }
}

pub fn input_about(topic: &str) -> AnalysisInput {
    AnalysisInput {
        topic: topic.to_string(),
        ..input(&[SourceKind::Demo])
    }
}

pub fn cluster(title: &str, post_ids: &[&str], risk_score: i64) -> DetectedCluster {
    DetectedCluster {
        title: title.to_string(),
        summary: format!("Summary of {title}"),
        post_ids: post_ids.iter().map(|s| s.to_string()).collect(),
        risk_score,
    }
}

pub fn enrichment() -> Enrichment {
    Enrichment {
        dmmi_report: DmmiReport {
            classification: Classification::Disinformation,
            intent: Intent::Harmful,
            veracity: Veracity::False,
            success_probability: 65,
            rationale: "Fabricated claim pushed by coordinated accounts.".to_string(),
        },
        origin_report: OriginReport {
            attribution: Attribution::BotNetwork,
            confidence: Confidence::Medium,
            evidence: "Identical phrasing posted within minutes.".to_string(),
        },
        counter_opportunities: vec![CounterOpportunity {
            strategy: CounterStrategy::PreBunking,
            title: "Explain the tactic".to_string(),
            description: "Show audiences how the claim is manufactured.".to_string(),
            example_content: "Seeing the same post from 50 new accounts? That's not news.".to_string(),
        }],
    }
}

pub fn simulation() -> SimulationResult {
    SimulationResult {
        turns: vec![SimulationTurn {
            turn: 1,
            adversary_move: "Shift to video clips".to_string(),
            counter_response: "Partner with local broadcasters".to_string(),
            projected_risk_change: -2,
        }],
        final_outcome: "Narrative loses reach within a week.".to_string(),
        strategic_adjustment: "Prepare video assets in advance.".to_string(),
    }
}

/// A narrative already through enrichment.
pub fn complete_narrative(title: &str, post_ids: &[&str]) -> Narrative {
    let e = enrichment();
    let mut narrative = Narrative::pending(
        title.to_string(),
        format!("Summary of {title}"),
        post_ids.iter().map(|s| s.to_string()).collect(),
        7,
    );
    narrative.status = NarrativeStatus::Complete;
    narrative.dmmi_report = Some(e.dmmi_report);
    narrative.origin_report = Some(e.origin_report);
    narrative.counter_opportunities = Some(e.counter_opportunities);
    narrative
}

// ---------------------------------------------------------------------------
// MockCollector
// ---------------------------------------------------------------------------

/// Returns a fixed batch, or fails, for one source kind.
pub struct MockCollector {
    kind: SourceKind,
    batch: CollectedBatch,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockCollector {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            batch: CollectedBatch::default(),
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_posts(mut self, posts: Vec<Post>) -> Self {
        self.batch.posts = posts;
        self
    }

    pub fn with_sources(mut self, sources: Vec<SearchSource>) -> Self {
        self.batch.sources = sources;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostCollector for MockCollector {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn collect(&self, _input: &AnalysisInput) -> Result<CollectedBatch> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            bail!("MockCollector: {message}");
        }
        Ok(self.batch.clone())
    }
}

// ---------------------------------------------------------------------------
// MockModel
// ---------------------------------------------------------------------------

/// Scripted `NarrativeModel`. Every method counts its calls.
#[derive(Default)]
pub struct MockModel {
    clusters: Vec<DetectedCluster>,
    fail_detection: bool,
    fail_enrichment: HashSet<String>,
    enrich_delays: HashMap<String, Duration>,
    brief: Option<String>,
    fail_plan: bool,
    fail_assignment: bool,
    chat_chunks: Vec<String>,
    fail_chat: bool,
    chat_error_after_chunks: bool,
    calls: Mutex<HashMap<&'static str, usize>>,
    enrich_order: Mutex<Vec<String>>,
    last_chat: Mutex<Vec<ChatMessage>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clusters(mut self, clusters: Vec<DetectedCluster>) -> Self {
        self.clusters = clusters;
        self
    }

    pub fn fail_detection(mut self) -> Self {
        self.fail_detection = true;
        self
    }

    pub fn fail_enrichment_for(mut self, title: &str) -> Self {
        self.fail_enrichment.insert(title.to_string());
        self
    }

    /// Hold the enrichment call for `title` before answering.
    pub fn delay_enrichment_for(mut self, title: &str, delay: Duration) -> Self {
        self.enrich_delays.insert(title.to_string(), delay);
        self
    }

    pub fn with_brief(mut self, brief: &str) -> Self {
        self.brief = Some(brief.to_string());
        self
    }

    pub fn fail_plan(mut self) -> Self {
        self.fail_plan = true;
        self
    }

    pub fn fail_assignment(mut self) -> Self {
        self.fail_assignment = true;
        self
    }

    pub fn with_chat_chunks(mut self, chunks: &[&str]) -> Self {
        self.chat_chunks = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Refuse to open the chat stream.
    pub fn fail_chat(mut self) -> Self {
        self.fail_chat = true;
        self
    }

    /// Yield the configured chunks, then a transport error.
    pub fn chat_error_after_chunks(mut self) -> Self {
        self.chat_error_after_chunks = true;
        self
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    /// Titles in the order their enrichment calls returned.
    pub fn enrich_order(&self) -> Vec<String> {
        self.enrich_order.lock().unwrap().clone()
    }

    pub fn last_chat(&self) -> Vec<ChatMessage> {
        self.last_chat.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
    }
}

fn mock_error(what: &str) -> AiError {
    AiError::Api {
        status: 500,
        message: format!("MockModel: {what} failed"),
    }
}

#[async_trait]
impl NarrativeModel for MockModel {
    async fn detect(
        &self,
        _posts: &[Post],
        _context: &str,
    ) -> std::result::Result<Vec<DetectedCluster>, AiError> {
        self.record("detect");
        if self.fail_detection {
            return Err(AiError::BadResponse("MockModel: invalid detection JSON".into()));
        }
        Ok(self.clusters.clone())
    }

    async fn enrich(
        &self,
        narrative: &Narrative,
        _posts: &[Post],
    ) -> std::result::Result<Enrichment, AiError> {
        self.record("enrich");
        if let Some(delay) = self.enrich_delays.get(&narrative.title) {
            tokio::time::sleep(*delay).await;
        }
        self.enrich_order
            .lock()
            .unwrap()
            .push(narrative.title.clone());
        if self.fail_enrichment.contains(&narrative.title) {
            return Err(mock_error("enrichment"));
        }
        Ok(enrichment())
    }

    async fn brief(&self, narrative: &Narrative) -> std::result::Result<String, AiError> {
        self.record("brief");
        Ok(self
            .brief
            .clone()
            .unwrap_or_else(|| format!("# Brief: {}", narrative.title)))
    }

    async fn counter_plan(
        &self,
        narrative: &Narrative,
        counter: &CounterOpportunity,
    ) -> std::result::Result<String, AiError> {
        self.record("counter_plan");
        if self.fail_plan {
            return Err(mock_error("plan"));
        }
        Ok(format!("## Plan: {} against {}", counter.title, narrative.title))
    }

    async fn simulate(
        &self,
        _narrative: &Narrative,
        _counter: &CounterOpportunity,
        _plan: &str,
    ) -> std::result::Result<SimulationResult, AiError> {
        self.record("simulate");
        Ok(simulation())
    }

    async fn assignment_brief(
        &self,
        narrative: &Narrative,
        posts: &[Post],
    ) -> std::result::Result<String, AiError> {
        self.record("assignment_brief");
        if self.fail_assignment {
            return Err(mock_error("assignment"));
        }
        Ok(format!(
            "Monitor \"{}\" ({} example posts).",
            narrative.title,
            posts.len()
        ))
    }

    async fn chat(
        &self,
        _narrative: &Narrative,
        history: &[ChatMessage],
    ) -> std::result::Result<TextStream, AiError> {
        self.record("chat");
        *self.last_chat.lock().unwrap() = history.to_vec();
        if self.fail_chat {
            return Err(AiError::Transport("MockModel: connection refused".into()));
        }

        let mut items: Vec<std::result::Result<String, AiError>> =
            self.chat_chunks.iter().cloned().map(Ok).collect();
        if self.chat_error_after_chunks {
            items.push(Err(AiError::Transport("MockModel: stream reset".into())));
        }
        Ok(stream::iter(items).boxed())
    }
}
