use std::sync::Arc;

use tracing::info;

use sentinel_common::{CounterOpportunity, Narrative, NarrativeStatus, SimulationResult};

use super::DerivedError;
use crate::traits::NarrativeModel;

/// Two-stage workflow for one counter-opportunity: generate a plan, then
/// wargame it. Both results are cached for the life of the session.
pub struct CounterPlanSession {
    model: Arc<dyn NarrativeModel>,
    narrative: Narrative,
    counter: CounterOpportunity,
    plan: Option<String>,
    simulation: Option<SimulationResult>,
}

impl CounterPlanSession {
    pub fn new(
        model: Arc<dyn NarrativeModel>,
        narrative: Narrative,
        counter: CounterOpportunity,
    ) -> Result<Self, DerivedError> {
        if narrative.status != NarrativeStatus::Complete {
            return Err(DerivedError::NotReady(narrative.status));
        }
        Ok(Self {
            model,
            narrative,
            counter,
            plan: None,
            simulation: None,
        })
    }

    pub fn counter(&self) -> &CounterOpportunity {
        &self.counter
    }

    /// The cached plan, if one has been generated.
    pub fn current_plan(&self) -> Option<&str> {
        self.plan.as_deref()
    }

    pub fn current_simulation(&self) -> Option<&SimulationResult> {
        self.simulation.as_ref()
    }

    /// Generate the plan on first call; later calls return the cached text.
    pub async fn plan(&mut self) -> Result<&str, DerivedError> {
        if self.plan.is_none() {
            let plan = self.model.counter_plan(&self.narrative, &self.counter).await?;
            info!(
                narrative = self.narrative.title.as_str(),
                counter = self.counter.title.as_str(),
                "Generated counter-action plan"
            );
            self.plan = Some(plan);
        }
        Ok(self.plan.as_deref().unwrap_or_default())
    }

    /// Wargame the plan. Fails until `plan` has succeeded; runs at most once.
    pub async fn simulate(&mut self) -> Result<&SimulationResult, DerivedError> {
        let Some(plan) = self.plan.as_deref() else {
            return Err(DerivedError::PlanNotReady);
        };
        if self.simulation.is_none() {
            let result = self
                .model
                .simulate(&self.narrative, &self.counter, plan)
                .await?;
            info!(turns = result.turns.len(), "Wargame simulation complete");
            self.simulation = Some(result);
        }
        self.simulation.as_ref().ok_or(DerivedError::PlanNotReady)
    }
}
