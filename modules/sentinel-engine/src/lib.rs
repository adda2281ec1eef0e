pub mod analyst;
pub mod analyzer;
pub mod bootstrap;
pub mod collectors;
pub mod derived;
pub mod history;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use analyzer::{Analyzer, RunHandle};
pub use pipeline::events::{EventSink, Notice, NoticeLevel, RunEvent, RunStage, RunSummary};
pub use pipeline::{AnalysisError, AnalysisPipeline, RunOutcome, RunReport};
