use tracing::info;

use sentinel_common::{Narrative, NarrativeStatus};

use super::DerivedError;
use crate::traits::NarrativeModel;

/// Markdown briefing for allied organizations. Requires a complete narrative.
pub async fn generate_brief(
    model: &dyn NarrativeModel,
    narrative: &Narrative,
) -> Result<String, DerivedError> {
    if narrative.status != NarrativeStatus::Complete {
        return Err(DerivedError::NotReady(narrative.status));
    }
    let brief = model.brief(narrative).await?;
    info!(narrative = narrative.title.as_str(), chars = brief.len(), "Generated brief");
    Ok(brief)
}
