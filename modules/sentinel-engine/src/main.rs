use std::io::Read;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sentinel_common::{AnalysisInput, Config};
use sentinel_engine::bootstrap::{build_pipeline, file_history};
use sentinel_engine::{Analyzer, NoticeLevel, RunEvent, RunOutcome};

/// Headless runner: reads one `AnalysisInput` as JSON (from the file named by
/// `ANALYSIS_INPUT`, else stdin), runs it, and prints the narratives as JSON.
#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("narrative_sentinel=info".parse()?)
        .add_directive("sentinel=info".parse()?)
        .add_directive("ai_client=info".parse()?)
        .add_directive("social_proxy_client=info".parse()?);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Narrative Sentinel starting...");

    let config = Config::from_env()?;
    config.log_redacted();

    let input = read_input()?;
    let user_id = std::env::var("SENTINEL_USER").unwrap_or_else(|_| "local".to_string());
    if let Err(e) = file_history(&config).record(&user_id, &input) {
        warn!(error = %e, "Could not record run history");
    }

    let analyzer = Analyzer::new(build_pipeline(&config));
    let mut run = analyzer.start(input);

    while let Some(event) = run.events.recv().await {
        match event {
            RunEvent::Stage { stage } => info!(?stage, "Stage"),
            RunEvent::Notice(notice) => match notice.level {
                NoticeLevel::Info => info!(message = notice.message.as_str(), "Notice"),
                NoticeLevel::Warning | NoticeLevel::Error => {
                    warn!(level = ?notice.level, message = notice.message.as_str(), "Notice")
                }
            },
            RunEvent::PostsCollected { posts, sources } => {
                info!(posts, sources = sources.len(), "Posts collected")
            }
            RunEvent::NarrativeDetected { narrative, posts } => info!(
                title = narrative.title.as_str(),
                risk = narrative.risk_score,
                posts = posts.len(),
                "Narrative detected"
            ),
            RunEvent::NarrativeResolved { narrative } => info!(
                title = narrative.title.as_str(),
                status = %narrative.status,
                "Narrative resolved"
            ),
            RunEvent::Completed { summary } => info!(
                total = summary.total,
                complete = summary.complete,
                failed = summary.failed,
                "Run completed"
            ),
        }
    }

    let report = run.join().await?;
    match report.outcome {
        RunOutcome::NoData => info!("No posts found"),
        RunOutcome::NoNarratives => info!("No narratives found"),
        RunOutcome::Completed(_) => {}
    }

    println!("{}", serde_json::to_string_pretty(report.narratives())?);
    Ok(())
}

fn read_input() -> Result<AnalysisInput> {
    let raw = match std::env::var("ANALYSIS_INPUT") {
        Ok(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading analysis input from {path}"))?,
        Err(_) => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    serde_json::from_str(&raw).context("analysis input must be an AnalysisInput JSON object")
}
