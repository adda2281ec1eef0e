pub mod board;
pub mod detector;
pub mod enricher;
pub mod events;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;
use tracing::{error, info, warn};

use ai_client::AiError;
use sentinel_common::{
    AnalysisInput, EnrichmentPolicy, Narrative, NarrativeStatus, Post, SearchSource, SourceKind,
};

use crate::collectors::merge_batches;
use crate::traits::{CollectedBatch, NarrativeModel, PostCollector};

use board::{NarrativeBoard, Resolution};
use enricher::compute_trend;
use events::{EventSink, Notice, RunEvent, RunStage, RunSummary};

const NO_DATA_MESSAGE: &str =
    "No relevant posts were found for the selected criteria. Try broadening your search.";
const NO_NARRATIVES_MESSAGE: &str =
    "The AI could not identify any distinct narratives from the collected data.";

/// Why a run stopped before producing results.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to detect narratives. The AI model may have returned an invalid response: {0}")]
    Detection(#[source] AiError),

    #[error("Analysis run was cancelled")]
    Cancelled,

    #[error("Analysis task failed: {0}")]
    Task(String),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No collector returned a post; detection was never called.
    NoData,
    /// Detection found nothing worth enriching.
    NoNarratives,
    Completed(RunSummary),
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub posts: Vec<Post>,
    pub sources: Vec<SearchSource>,
    pub board: NarrativeBoard,
}

impl RunReport {
    fn empty(outcome: RunOutcome, collected: CollectedBatch) -> Self {
        Self {
            outcome,
            posts: collected.posts,
            sources: collected.sources,
            board: NarrativeBoard::new(),
        }
    }

    pub fn narratives(&self) -> &[Narrative] {
        self.board.narratives()
    }

    /// Posts that belong to one narrative, in the narrative's order.
    pub fn posts_for(&self, narrative: &Narrative) -> Vec<Post> {
        let by_id = index_posts(&self.posts);
        member_posts(narrative, &by_id)
    }
}

/// Collect, detect, and enrich. One instance serves many runs.
pub struct AnalysisPipeline {
    collectors: Vec<Arc<dyn PostCollector>>,
    model: Arc<dyn NarrativeModel>,
    policy: EnrichmentPolicy,
}

impl AnalysisPipeline {
    pub fn new(model: Arc<dyn NarrativeModel>) -> Self {
        Self {
            collectors: Vec::new(),
            model,
            policy: EnrichmentPolicy::default(),
        }
    }

    /// Register a collector. A later collector of the same kind replaces the earlier one.
    pub fn with_collector(mut self, collector: Arc<dyn PostCollector>) -> Self {
        self.collectors.retain(|c| c.kind() != collector.kind());
        self.collectors.push(collector);
        self
    }

    pub fn with_policy(mut self, policy: EnrichmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> EnrichmentPolicy {
        self.policy
    }

    pub fn model(&self) -> Arc<dyn NarrativeModel> {
        self.model.clone()
    }

    pub async fn run(
        &self,
        input: &AnalysisInput,
        events: &EventSink,
    ) -> Result<RunReport, AnalysisError> {
        info!(
            country = input.country.as_str(),
            topic = input.topic.as_str(),
            sources = ?input.sources,
            policy = ?self.policy,
            "Starting analysis run"
        );

        // 1. Collection
        events.stage(RunStage::Collecting);
        let collected = self.collect(input, events).await;
        events.emit(RunEvent::PostsCollected {
            posts: collected.posts.len(),
            sources: collected.sources.clone(),
        });

        if collected.posts.is_empty() {
            info!("No posts collected, skipping detection");
            events.notice(Notice::info(NO_DATA_MESSAGE));
            return Ok(RunReport::empty(RunOutcome::NoData, collected));
        }

        // 2. Detection
        events.stage(RunStage::Detecting);
        let clusters = match self.model.detect(&collected.posts, &input.context()).await {
            Ok(clusters) => clusters,
            Err(e) => {
                error!(error = %e, "Narrative detection failed");
                let err = AnalysisError::Detection(e);
                events.notice(Notice::error(err.to_string()));
                return Err(err);
            }
        };
        info!(clusters = clusters.len(), "Detection returned clusters");

        let materialized = detector::materialize(clusters, &collected.posts);
        if materialized.narratives.is_empty() {
            events.notice(Notice::info(NO_NARRATIVES_MESSAGE));
            return Ok(RunReport::empty(RunOutcome::NoNarratives, collected));
        }

        // 3. Materialization
        let mut board = NarrativeBoard::new();
        {
            let by_id = index_posts(&collected.posts);
            for narrative in materialized.narratives {
                let posts = member_posts(&narrative, &by_id);
                let snapshot = narrative.clone();
                if let Err(e) = board.insert(narrative) {
                    warn!(error = %e, "Skipped narrative");
                    continue;
                }
                events.emit(RunEvent::NarrativeDetected {
                    narrative: snapshot,
                    posts,
                });
            }
        }

        // 4. Enrichment
        events.stage(RunStage::Enriching);
        self.enrich_all(&mut board, &collected.posts, events).await;

        let summary = board.summary();
        info!(
            total = summary.total,
            complete = summary.complete,
            failed = summary.failed,
            "Analysis run complete"
        );
        events.emit(RunEvent::Completed { summary });

        Ok(RunReport {
            outcome: RunOutcome::Completed(summary),
            posts: collected.posts,
            sources: collected.sources,
            board,
        })
    }

    /// Run every enabled collector concurrently. Failures are isolated.
    async fn collect(&self, input: &AnalysisInput, events: &EventSink) -> CollectedBatch {
        let mut kinds: Vec<SourceKind> = Vec::new();
        for kind in &input.sources {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }

        let mut calls = Vec::new();
        for kind in kinds {
            match self.collectors.iter().find(|c| c.kind() == kind) {
                Some(collector) => {
                    calls.push(async move { (kind, collector.collect(input).await) });
                }
                None => {
                    warn!(source = %kind, "No collector configured for source");
                    events.notice(Notice::warning(format!(
                        "No collector is configured for {kind}; it was skipped."
                    )));
                }
            }
        }

        let mut batches = Vec::new();
        for (kind, result) in join_all(calls).await {
            match result {
                Ok(batch) => {
                    info!(source = %kind, posts = batch.posts.len(), "Collector finished");
                    batches.push(batch);
                }
                Err(e) => {
                    warn!(source = %kind, error = %e, "Collector failed");
                    events.notice(Notice::warning(format!(
                        "Failed to fetch posts from {kind}: {e}"
                    )));
                }
            }
        }

        merge_batches(batches)
    }

    async fn enrich_all(&self, board: &mut NarrativeBoard, posts: &[Post], events: &EventSink) {
        let by_id = index_posts(posts);
        let jobs: Vec<(Narrative, Vec<Post>)> = board
            .pending()
            .map(|n| (n.clone(), member_posts(n, &by_id)))
            .collect();

        match self.policy {
            EnrichmentPolicy::Concurrent => {
                let mut in_flight: FuturesUnordered<_> = jobs
                    .into_iter()
                    .map(|(narrative, members)| self.enrich_one(narrative, members))
                    .collect();
                while let Some((id, resolution)) = in_flight.next().await {
                    apply(board, &id, resolution, events);
                }
            }
            EnrichmentPolicy::Sequential => {
                for (narrative, members) in jobs {
                    let (id, resolution) = self.enrich_one(narrative, members).await;
                    apply(board, &id, resolution, events);
                }
            }
        }
    }

    async fn enrich_one(&self, narrative: Narrative, posts: Vec<Post>) -> (String, Resolution) {
        match self.model.enrich(&narrative, &posts).await {
            Ok(enrichment) => {
                let trend = compute_trend(&posts);
                (narrative.id, Resolution::Complete { enrichment, trend })
            }
            Err(e) => {
                warn!(narrative = narrative.title.as_str(), error = %e, "Enrichment failed");
                (narrative.id, Resolution::Failed(e.to_string()))
            }
        }
    }
}

fn apply(board: &mut NarrativeBoard, id: &str, resolution: Resolution, events: &EventSink) {
    match board.resolve(id, resolution) {
        Ok(narrative) => {
            if narrative.status == NarrativeStatus::Error {
                events.notice(Notice::warning(format!(
                    "Could not enrich narrative \"{}\".",
                    narrative.title
                )));
            }
            events.emit(RunEvent::NarrativeResolved {
                narrative: narrative.clone(),
            });
        }
        Err(e) => warn!(error = %e, "Discarded enrichment result"),
    }
}

fn index_posts(posts: &[Post]) -> HashMap<&str, &Post> {
    posts.iter().map(|p| (p.id.as_str(), p)).collect()
}

fn member_posts(narrative: &Narrative, by_id: &HashMap<&str, &Post>) -> Vec<Post> {
    narrative
        .post_ids
        .iter()
        .filter_map(|id| by_id.get(id.as_str()).map(|p| (*p).clone()))
        .collect()
}
