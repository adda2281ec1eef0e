use serde::Serialize;
use tokio::sync::mpsc;

use sentinel_common::{Narrative, Post, SearchSource};

/// Phase a run has entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Collecting,
    Detecting,
    Enriching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing message, the equivalent of a dashboard toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub complete: usize,
    pub failed: usize,
}

/// Incremental update published while a run progresses.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    Stage { stage: RunStage },
    Notice(Notice),
    PostsCollected { posts: usize, sources: Vec<SearchSource> },
    NarrativeDetected { narrative: Narrative, posts: Vec<Post> },
    NarrativeResolved { narrative: Narrative },
    Completed { summary: RunSummary },
}

/// Sending half of a run's event channel. Publishing never blocks and never
/// fails the run; a dropped receiver just means nobody is watching.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<RunEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that discards everything.
    pub fn none() -> Self {
        Self { tx: None }
    }

    /// Create a sink and the receiver that drains it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn notice(&self, notice: Notice) {
        self.emit(RunEvent::Notice(notice));
    }

    pub fn stage(&self, stage: RunStage) {
        self.emit(RunEvent::Stage { stage });
    }
}
