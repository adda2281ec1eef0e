use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::info;

use sentinel_common::AnalysisInput;

use crate::pipeline::events::{EventSink, RunEvent};
use crate::pipeline::{AnalysisError, AnalysisPipeline, RunReport};

/// A run in flight: its event stream and its eventual report.
pub struct RunHandle {
    pub events: mpsc::UnboundedReceiver<RunEvent>,
    task: JoinHandle<Result<RunReport, AnalysisError>>,
}

impl RunHandle {
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the run to finish. An aborted run yields `AnalysisError::Cancelled`.
    pub async fn join(self) -> Result<RunReport, AnalysisError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(AnalysisError::Cancelled),
            Err(e) => Err(AnalysisError::Task(e.to_string())),
        }
    }
}

/// Runs the pipeline on the tokio runtime, one run at a time: starting a new
/// run aborts the previous one along with its in-flight requests.
pub struct Analyzer {
    pipeline: Arc<AnalysisPipeline>,
    current: Mutex<Option<AbortHandle>>,
}

impl Analyzer {
    pub fn new(pipeline: AnalysisPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            current: Mutex::new(None),
        }
    }

    pub fn pipeline(&self) -> &AnalysisPipeline {
        &self.pipeline
    }

    pub fn start(&self, input: AnalysisInput) -> RunHandle {
        let (sink, events) = EventSink::channel();
        let pipeline = self.pipeline.clone();
        let task = tokio::spawn(async move { pipeline.run(&input, &sink).await });

        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.replace(task.abort_handle()) {
            if !previous.is_finished() {
                info!("Cancelling previous analysis run");
            }
            previous.abort();
        }

        RunHandle { events, task }
    }

    /// Abort whatever run is in flight.
    pub fn cancel(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = current.take() {
            handle.abort();
        }
    }
}
