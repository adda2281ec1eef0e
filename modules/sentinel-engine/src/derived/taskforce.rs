use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use sentinel_common::{Narrative, Post, TaskforceItem};

use super::DerivedError;
use crate::traits::NarrativeModel;

/// Posts attached to an assignment as examples.
pub const MAX_EXCERPTS: usize = 5;

/// Append-only list of narratives handed to the response team.
#[derive(Debug, Default, Clone)]
pub struct TaskforceBoard {
    items: Vec<TaskforceItem>,
}

impl TaskforceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[TaskforceItem] {
        &self.items
    }

    pub fn is_assigned(&self, narrative_id: &str) -> bool {
        self.items.iter().any(|i| i.narrative_id == narrative_id)
    }

    /// Ask the model for a tasking note and append the assignment.
    pub async fn assign(
        &mut self,
        model: &dyn NarrativeModel,
        narrative: &Narrative,
        posts: &[Post],
    ) -> Result<&TaskforceItem, DerivedError> {
        let excerpts: Vec<Post> = posts.iter().take(MAX_EXCERPTS).cloned().collect();
        let assignment_brief = model.assignment_brief(narrative, &excerpts).await?;

        self.items.push(TaskforceItem {
            id: format!("task_{}", Uuid::new_v4().simple()),
            narrative_id: narrative.id.clone(),
            narrative_title: narrative.title.clone(),
            assignment_brief,
            posts: excerpts,
            created_at: Utc::now(),
        });
        info!(narrative = narrative.title.as_str(), total = self.items.len(), "Assigned to taskforce");
        Ok(&self.items[self.items.len() - 1])
    }
}
