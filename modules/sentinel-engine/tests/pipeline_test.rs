//! End-to-end runs of the analysis pipeline against mock collectors and a
//! scripted model. No network.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sentinel_common::{EnrichmentPolicy, NarrativeStatus, SourceKind};
use sentinel_engine::pipeline::events::EventSink;
use sentinel_engine::testing::{cluster, input, post, source, MockCollector, MockModel};
use sentinel_engine::{AnalysisError, AnalysisPipeline, NoticeLevel, RunEvent, RunOutcome};
use tokio::sync::mpsc::UnboundedReceiver;

fn drain(mut rx: UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn notices(events: &[RunEvent], level: NoticeLevel) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            RunEvent::Notice(n) if n.level == level => Some(n.message.clone()),
            _ => None,
        })
        .collect()
}

fn three_post_collector() -> MockCollector {
    MockCollector::new(SourceKind::Demo).with_posts(vec![
        post("p1", "The grid will be shut down on election day"),
        post("p2", "Officials confirm grid shutdown rumor is false"),
        post("p3", "Foreign bots amplify the grid story"),
    ])
}

#[tokio::test]
async fn all_collectors_failing_ends_with_no_data() {
    let model = Arc::new(MockModel::new().with_clusters(vec![cluster("A", &["p1"], 5)]));
    let pipeline = AnalysisPipeline::new(model.clone())
        .with_collector(Arc::new(MockCollector::new(SourceKind::Twitter).failing("proxy 502")))
        .with_collector(Arc::new(MockCollector::new(SourceKind::WebSearch).failing("quota")));
    let (sink, rx) = EventSink::channel();

    let report = pipeline
        .run(&input(&[SourceKind::Twitter, SourceKind::WebSearch]), &sink)
        .await
        .unwrap();
    drop(sink);
    let events = drain(rx);

    assert_eq!(report.outcome, RunOutcome::NoData);
    assert!(report.narratives().is_empty());
    assert_eq!(model.calls("detect"), 0);
    assert_eq!(notices(&events, NoticeLevel::Warning).len(), 2);
    assert!(notices(&events, NoticeLevel::Info)[0].contains("No relevant posts"));
}

#[tokio::test]
async fn zero_posts_never_reach_detection() {
    let model = Arc::new(MockModel::new());
    let collector = Arc::new(MockCollector::new(SourceKind::Demo));
    let pipeline = AnalysisPipeline::new(model.clone()).with_collector(collector.clone());

    let report = pipeline
        .run(&input(&[SourceKind::Demo, SourceKind::Demo]), &EventSink::none())
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::NoData);
    assert_eq!(collector.calls(), 1);
    assert_eq!(model.calls("detect"), 0);
}

#[tokio::test]
async fn empty_detection_skips_enrichment() {
    let model = Arc::new(MockModel::new());
    let pipeline =
        AnalysisPipeline::new(model.clone()).with_collector(Arc::new(three_post_collector()));

    let report = pipeline.run(&input(&[SourceKind::Demo]), &EventSink::none()).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::NoNarratives);
    assert_eq!(model.calls("detect"), 1);
    assert_eq!(model.calls("enrich"), 0);
    assert_eq!(report.posts.len(), 3);
}

#[tokio::test]
async fn detection_failure_is_fatal() {
    let model = Arc::new(MockModel::new().fail_detection());
    let pipeline =
        AnalysisPipeline::new(model.clone()).with_collector(Arc::new(three_post_collector()));
    let (sink, rx) = EventSink::channel();

    let err = pipeline.run(&input(&[SourceKind::Demo]), &sink).await.unwrap_err();
    drop(sink);

    assert!(matches!(err, AnalysisError::Detection(_)));
    assert_eq!(model.calls("enrich"), 0);
    let errors = notices(&drain(rx), NoticeLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Failed to detect narratives"));
}

#[tokio::test]
async fn one_failed_enrichment_only_marks_that_narrative() {
    let model = Arc::new(
        MockModel::new()
            .with_clusters(vec![
                cluster("Grid shutdown", &["p1", "p2"], 8),
                cluster("Bot amplification", &["p3"], 6),
                cluster("Official denial", &["p2"], 2),
            ])
            .fail_enrichment_for("Bot amplification"),
    );
    let pipeline =
        AnalysisPipeline::new(model.clone()).with_collector(Arc::new(three_post_collector()));
    let (sink, rx) = EventSink::channel();

    let report = pipeline.run(&input(&[SourceKind::Demo]), &sink).await.unwrap();
    drop(sink);
    let events = drain(rx);

    let RunOutcome::Completed(summary) = report.outcome else {
        panic!("expected completed run, got {:?}", report.outcome);
    };
    assert_eq!((summary.total, summary.complete, summary.failed), (3, 2, 1));

    let statuses: Vec<_> = report.narratives().iter().map(|n| n.status).collect();
    assert_eq!(
        statuses,
        vec![NarrativeStatus::Complete, NarrativeStatus::Error, NarrativeStatus::Complete]
    );
    let failed = &report.narratives()[1];
    assert!(failed.error.as_deref().unwrap().contains("enrichment failed"));
    assert!(failed.dmmi_report.is_none());

    let done = &report.narratives()[0];
    assert_eq!(done.trend_data.as_ref().unwrap().len(), 7);
    assert_eq!(done.risk_score, 8);

    let detected = events
        .iter()
        .filter(|e| matches!(e, RunEvent::NarrativeDetected { .. }))
        .count();
    let resolved = events
        .iter()
        .filter(|e| matches!(e, RunEvent::NarrativeResolved { .. }))
        .count();
    assert_eq!((detected, resolved), (3, 3));
    assert!(matches!(events.last(), Some(RunEvent::Completed { .. })));
    assert_eq!(notices(&events, NoticeLevel::Warning).len(), 1);
}

#[tokio::test]
async fn detected_event_carries_member_posts() {
    let model = Arc::new(MockModel::new().with_clusters(vec![cluster("A", &["p3", "p1"], 5)]));
    let pipeline =
        AnalysisPipeline::new(model).with_collector(Arc::new(three_post_collector()));
    let (sink, rx) = EventSink::channel();

    pipeline.run(&input(&[SourceKind::Demo]), &sink).await.unwrap();
    drop(sink);

    let posts = drain(rx)
        .into_iter()
        .find_map(|e| match e {
            RunEvent::NarrativeDetected { narrative, posts } => {
                assert_eq!(narrative.status, NarrativeStatus::Pending);
                Some(posts)
            }
            _ => None,
        })
        .unwrap();
    let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p3", "p1"]);
}

#[tokio::test]
async fn sources_dedupe_across_collectors_first_seen_wins() {
    let twitter = MockCollector::new(SourceKind::Twitter)
        .with_posts(vec![post("t1", "a")])
        .with_sources(vec![source("https://shared.test/story", "from twitter")]);
    let web = MockCollector::new(SourceKind::WebSearch)
        .with_posts(vec![post("w1", "b")])
        .with_sources(vec![
            source("https://shared.test/story", "from web"),
            source("https://web.test/only", "web only"),
        ]);
    let pipeline = AnalysisPipeline::new(Arc::new(MockModel::new()))
        .with_collector(Arc::new(twitter))
        .with_collector(Arc::new(web));

    let report = pipeline
        .run(&input(&[SourceKind::Twitter, SourceKind::WebSearch]), &EventSink::none())
        .await
        .unwrap();

    assert_eq!(report.sources.len(), 2);
    assert_eq!(report.sources[0].title, "from twitter");
    let ids: Vec<_> = report.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "w1"]);
}

#[tokio::test]
async fn one_failing_collector_does_not_sink_the_run() {
    let model = Arc::new(MockModel::new().with_clusters(vec![cluster("A", &["p1", "p2"], 5)]));
    let pipeline = AnalysisPipeline::new(model.clone())
        .with_collector(Arc::new(MockCollector::new(SourceKind::Twitter).failing("boom")))
        .with_collector(Arc::new(three_post_collector()));

    let report = pipeline
        .run(&input(&[SourceKind::Twitter, SourceKind::Demo]), &EventSink::none())
        .await
        .unwrap();

    assert!(matches!(report.outcome, RunOutcome::Completed(_)));
    assert_eq!(model.calls("detect"), 1);
}

#[tokio::test]
async fn unregistered_source_is_skipped_with_warning() {
    let pipeline = AnalysisPipeline::new(Arc::new(MockModel::new()))
        .with_collector(Arc::new(three_post_collector()));
    let (sink, rx) = EventSink::channel();

    pipeline
        .run(&input(&[SourceKind::Twitter, SourceKind::Demo]), &sink)
        .await
        .unwrap();
    drop(sink);

    let warnings = notices(&drain(rx), NoticeLevel::Warning);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("twitter"));
}

#[tokio::test]
async fn unknown_post_ids_are_dropped_from_narratives() {
    let model = Arc::new(MockModel::new().with_clusters(vec![
        cluster("Real", &["p1", "hallucinated", "p2"], 5),
        cluster("Imaginary", &["nope"], 9),
    ]));
    let pipeline =
        AnalysisPipeline::new(model.clone()).with_collector(Arc::new(three_post_collector()));

    let report = pipeline.run(&input(&[SourceKind::Demo]), &EventSink::none()).await.unwrap();

    assert_eq!(report.narratives().len(), 1);
    assert_eq!(report.narratives()[0].post_ids, vec!["p1", "p2"]);
    assert_eq!(model.calls("enrich"), 1);
    let members = report.posts_for(&report.narratives()[0]);
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn sequential_policy_enriches_in_board_order() {
    let model = Arc::new(
        MockModel::new()
            .with_clusters(vec![cluster("Slow", &["p1"], 5), cluster("Fast", &["p2"], 5)])
            .delay_enrichment_for("Slow", Duration::from_millis(150)),
    );
    let pipeline = AnalysisPipeline::new(model.clone())
        .with_policy(EnrichmentPolicy::Sequential)
        .with_collector(Arc::new(three_post_collector()));

    pipeline.run(&input(&[SourceKind::Demo]), &EventSink::none()).await.unwrap();

    assert_eq!(model.enrich_order(), vec!["Slow", "Fast"]);
}

#[tokio::test]
async fn concurrent_policy_resolves_in_completion_order() {
    let model = Arc::new(
        MockModel::new()
            .with_clusters(vec![cluster("Slow", &["p1"], 5), cluster("Fast", &["p2"], 5)])
            .delay_enrichment_for("Slow", Duration::from_millis(150)),
    );
    let pipeline = AnalysisPipeline::new(model.clone())
        .with_policy(EnrichmentPolicy::Concurrent)
        .with_collector(Arc::new(three_post_collector()));
    let (sink, rx) = EventSink::channel();

    let report = pipeline.run(&input(&[SourceKind::Demo]), &sink).await.unwrap();
    drop(sink);

    assert_eq!(model.enrich_order(), vec!["Fast", "Slow"]);
    let resolved: Vec<_> = drain(rx)
        .into_iter()
        .filter_map(|e| match e {
            RunEvent::NarrativeResolved { narrative } => Some(narrative.title),
            _ => None,
        })
        .collect();
    assert_eq!(resolved, vec!["Fast", "Slow"]);
    // Board order is detection order regardless of completion order.
    assert_eq!(report.narratives()[0].title, "Slow");
}

#[tokio::test]
async fn collectors_run_concurrently() {
    let delay = Duration::from_millis(300);
    let pipeline = AnalysisPipeline::new(Arc::new(MockModel::new()))
        .with_collector(Arc::new(
            MockCollector::new(SourceKind::Twitter)
                .with_posts(vec![post("t1", "a")])
                .with_delay(delay),
        ))
        .with_collector(Arc::new(
            MockCollector::new(SourceKind::WebSearch)
                .with_posts(vec![post("w1", "b")])
                .with_delay(delay),
        ));

    let started = Instant::now();
    let report = pipeline
        .run(&input(&[SourceKind::Twitter, SourceKind::WebSearch]), &EventSink::none())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.posts.len(), 2);
    assert!(elapsed >= delay, "finished too early: {elapsed:?}");
    assert!(elapsed < delay * 2, "collectors ran one after another: {elapsed:?}");
}
