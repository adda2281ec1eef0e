use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use sentinel_common::{Narrative, NarrativeStatus, TrendPoint};

use super::enricher::Enrichment;
use super::events::RunSummary;

/// A transition the board refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("No narrative with id {0}")]
    UnknownNarrative(String),

    #[error("Narrative {id} is already {status}")]
    AlreadyResolved { id: String, status: NarrativeStatus },

    #[error("Only pending narratives can be added, got {0}")]
    NotPending(NarrativeStatus),

    #[error("Narrative {0} is already on the board")]
    Duplicate(String),

    #[error("Campaign name must not be empty")]
    EmptyCampaign,
}

/// How a pending narrative resolves.
#[derive(Debug)]
pub enum Resolution {
    Complete {
        enrichment: Enrichment,
        trend: Vec<TrendPoint>,
    },
    Failed(String),
}

/// Ordered narratives of one run, keyed by id.
///
/// Every narrative enters as `Pending` and is resolved exactly once.
#[derive(Debug, Default, Clone)]
pub struct NarrativeBoard {
    narratives: Vec<Narrative>,
    index: HashMap<String, usize>,
}

impl NarrativeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, narrative: Narrative) -> Result<(), TransitionError> {
        if narrative.status != NarrativeStatus::Pending {
            return Err(TransitionError::NotPending(narrative.status));
        }
        if self.index.contains_key(&narrative.id) {
            return Err(TransitionError::Duplicate(narrative.id));
        }
        self.index.insert(narrative.id.clone(), self.narratives.len());
        self.narratives.push(narrative);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Narrative> {
        self.index.get(id).map(|&i| &self.narratives[i])
    }

    pub fn narratives(&self) -> &[Narrative] {
        &self.narratives
    }

    pub fn into_narratives(self) -> Vec<Narrative> {
        self.narratives
    }

    pub fn len(&self) -> usize {
        self.narratives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.narratives.is_empty()
    }

    /// Narratives still awaiting enrichment, in board order.
    pub fn pending(&self) -> impl Iterator<Item = &Narrative> {
        self.narratives
            .iter()
            .filter(|n| n.status == NarrativeStatus::Pending)
    }

    /// True once every narrative has reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.narratives.iter().all(|n| n.status.is_terminal())
    }

    /// Move a pending narrative to `Complete` or `Error`.
    pub fn resolve(
        &mut self,
        id: &str,
        resolution: Resolution,
    ) -> Result<&Narrative, TransitionError> {
        let &i = self
            .index
            .get(id)
            .ok_or_else(|| TransitionError::UnknownNarrative(id.to_string()))?;
        let narrative = &mut self.narratives[i];

        if narrative.status.is_terminal() {
            return Err(TransitionError::AlreadyResolved {
                id: id.to_string(),
                status: narrative.status,
            });
        }

        match resolution {
            Resolution::Complete { enrichment, trend } => {
                let enrichment = enrichment.normalized();
                narrative.dmmi_report = Some(enrichment.dmmi_report);
                narrative.origin_report = Some(enrichment.origin_report);
                narrative.counter_opportunities = Some(enrichment.counter_opportunities);
                narrative.trend_data = Some(trend);
                narrative.status = NarrativeStatus::Complete;
            }
            Resolution::Failed(message) => {
                narrative.error = Some(message);
                narrative.status = NarrativeStatus::Error;
            }
        }

        debug!(id, status = %narrative.status, "Narrative resolved");
        Ok(narrative)
    }

    /// Tag a narrative with a campaign name. Allowed in any status.
    pub fn assign_campaign(&mut self, id: &str, name: &str) -> Result<&Narrative, TransitionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TransitionError::EmptyCampaign);
        }
        let &i = self
            .index
            .get(id)
            .ok_or_else(|| TransitionError::UnknownNarrative(id.to_string()))?;
        let narrative = &mut self.narratives[i];
        narrative.campaign = Some(name.to_string());
        Ok(narrative)
    }

    pub fn summary(&self) -> RunSummary {
        let count = |status: NarrativeStatus| {
            self.narratives
                .iter()
                .filter(|n| n.status == status)
                .count()
        };
        RunSummary {
            total: self.narratives.len(),
            complete: count(NarrativeStatus::Complete),
            failed: count(NarrativeStatus::Error),
        }
    }
}
