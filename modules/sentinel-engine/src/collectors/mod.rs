pub mod demo;
pub mod social;
pub mod web_search;

use std::collections::HashSet;

use tracing::debug;

use crate::traits::CollectedBatch;

pub use demo::DemoCollector;
pub use social::SocialProxyCollector;
pub use web_search::WebSearchCollector;

/// Concatenate batches in collector order. Posts are unique by id and sources
/// by uri; the first occurrence wins in both cases.
pub fn merge_batches(batches: Vec<CollectedBatch>) -> CollectedBatch {
    let mut merged = CollectedBatch::default();
    let mut post_ids = HashSet::new();
    let mut uris = HashSet::new();

    for batch in batches {
        for post in batch.posts {
            if post_ids.insert(post.id.clone()) {
                merged.posts.push(post);
            } else {
                debug!(id = post.id.as_str(), "Dropped duplicate post");
            }
        }
        for source in batch.sources {
            if uris.insert(source.uri.clone()) {
                merged.sources.push(source);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{post, source};

    #[test]
    fn first_seen_source_wins() {
        let a = CollectedBatch::new(
            vec![post("p1", "a")],
            vec![source("https://x.test/1", "first"), source("https://x.test/2", "two")],
        );
        let b = CollectedBatch::new(
            vec![post("p2", "b"), post("p1", "dup")],
            vec![source("https://x.test/1", "second")],
        );
        let merged = merge_batches(vec![a, b]);

        assert_eq!(merged.sources.len(), 2);
        assert_eq!(merged.sources[0].title, "first");
        let ids: Vec<_> = merged.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(merged.posts[0].content, "a");
    }
}
