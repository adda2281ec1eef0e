//! Actions an analyst takes on a finished narrative: briefs, counter-plans
//! with wargaming, the copilot chat, and taskforce assignment.

pub mod brief;
pub mod copilot;
pub mod counter_plan;
pub mod taskforce;

use thiserror::Error;

use ai_client::AiError;
use sentinel_common::NarrativeStatus;

pub use brief::generate_brief;
pub use copilot::CopilotSession;
pub use counter_plan::CounterPlanSession;
pub use taskforce::TaskforceBoard;

/// Failure of a derived action. Reported to the caller only; never touches
/// the narrative board.
#[derive(Debug, Error)]
pub enum DerivedError {
    #[error("Narrative is {0}; only complete narratives support this action")]
    NotReady(NarrativeStatus),

    #[error("Generate a plan before running the simulation")]
    PlanNotReady,

    #[error("Message must not be empty")]
    EmptyMessage,

    #[error(transparent)]
    Model(#[from] AiError),
}
