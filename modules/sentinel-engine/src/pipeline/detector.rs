use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use sentinel_common::{Narrative, Post};

/// What the model returns for each narrative cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetectedCluster {
    /// A short, neutral, descriptive title for the narrative (5-10 words).
    pub title: String,
    /// A one-paragraph summary of the core message and claims of the narrative.
    pub summary: String,
    /// An array of post IDs that belong to this narrative cluster.
    pub post_ids: Vec<String>,
    /// An initial estimated risk score from 1 (low) to 10 (high) based on potential for harm and virality.
    pub risk_score: i64,
}

// StructuredOutput is auto-implemented via blanket impl for JsonSchema + DeserializeOwned

pub(crate) fn detection_prompt(posts: &[Post], context: &str) -> String {
    let post_data = posts
        .iter()
        .map(|p| {
            format!(
                "ID: {}, Source: {}, Author: {}, Content: \"{}\"",
                p.id,
                p.source.label(),
                p.author_handle,
                p.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n");

    format!(
        "Analyze the following social media and news posts related to {context}.\n\
         Your task is to identify and cluster distinct narratives. A narrative is a consistent \
         theme, story, or message that multiple posts contribute to.\n\
         Ignore isolated or irrelevant posts.\n\
         For each distinct narrative, provide a concise title, a summary, the IDs of the posts \
         that form the narrative, and an initial risk score.\n\n\
         Posts:\n{post_data}"
    )
}

/// Clusters turned into pending narratives, plus what validation threw away.
#[derive(Debug, Default)]
pub struct Materialized {
    pub narratives: Vec<Narrative>,
    /// Post ids the model returned that were never submitted.
    pub dropped_ids: usize,
    /// Titles of clusters left with no known post.
    pub rejected: Vec<String>,
}

/// Validate clusters against the posts submitted for detection.
///
/// Unknown ids are dropped and duplicates collapse to their first occurrence.
/// A cluster with no remaining ids is rejected. Risk scores clamp to 1..=10.
pub fn materialize(clusters: Vec<DetectedCluster>, posts: &[Post]) -> Materialized {
    let known: HashSet<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    let mut out = Materialized::default();

    for cluster in clusters {
        let mut seen = HashSet::new();
        let mut post_ids = Vec::with_capacity(cluster.post_ids.len());
        for id in cluster.post_ids {
            if !known.contains(id.as_str()) {
                out.dropped_ids += 1;
                continue;
            }
            if seen.insert(id.clone()) {
                post_ids.push(id);
            }
        }

        if post_ids.is_empty() {
            warn!(title = cluster.title.as_str(), "Rejected cluster with no known posts");
            out.rejected.push(cluster.title);
            continue;
        }

        let risk = cluster.risk_score.clamp(1, 10) as u8;
        out.narratives
            .push(Narrative::pending(cluster.title, cluster.summary, post_ids, risk));
    }

    if out.dropped_ids > 0 {
        warn!(dropped = out.dropped_ids, "Dropped unknown post ids from clusters");
    }
    info!(
        narratives = out.narratives.len(),
        rejected = out.rejected.len(),
        "Materialized narratives"
    );
    out
}
