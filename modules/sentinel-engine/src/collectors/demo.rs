use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use sentinel_common::{AnalysisInput, Engagement, Post, PostSource, SourceKind, TimeFrame};

use crate::traits::{CollectedBatch, PostCollector};

const AUTHORS: [&str; 6] = [
    "NewsNetwork",
    "AnalystPro",
    "CitizenVoice",
    "StateMediaBot",
    "FactChecker",
    "ConcernedCitizen",
];

/// Synthetic posts for demos and offline runs. Cites no sources.
pub struct DemoCollector {
    seed: Option<u64>,
    count: Option<usize>,
}

impl DemoCollector {
    /// Between 50 and 200 posts, different every run.
    pub fn new() -> Self {
        Self { seed: None, count: None }
    }

    /// Reproducible output for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed), count: None }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    fn generate(&self, input: &AnalysisInput) -> Vec<Post> {
        let mut rng = StdRng::seed_from_u64(self.seed.unwrap_or_else(rand::random));
        let count = self.count.unwrap_or_else(|| rng.random_range(50..200));
        let run_tag: u32 = rng.random();

        let topics = [
            input.topic.clone(),
            format!("anti-{}", input.topic),
            format!("{} politics", input.country),
            "economic impact".to_string(),
            "social issues".to_string(),
            "foreign relations".to_string(),
        ];

        (0..count)
            .map(|i| {
                let source = if rng.random_bool(0.7) {
                    PostSource::Twitter
                } else {
                    PostSource::GoogleNews
                };
                let author = AUTHORS[rng.random_range(0..AUTHORS.len())];
                let topic = &topics[rng.random_range(0..topics.len())];
                let is_bot = author.contains("Bot");

                Post {
                    id: format!("demo_{run_tag:08x}_{i}"),
                    source,
                    author: author.to_string(),
                    author_handle: format!("@{author}{}", rng.random_range(0..1000)),
                    content: template(&mut rng, topic, &input.country),
                    timestamp: random_instant(&mut rng, &input.time_frame),
                    engagement: Engagement {
                        likes: rng.random_range(0..if is_bot { 500 } else { 2000 }),
                        retweets: rng.random_range(0..if is_bot { 1000 } else { 500 }),
                        replies: rng.random_range(0..150),
                    },
                    image_url: rng
                        .random_bool(0.2)
                        .then(|| format!("https://picsum.photos/seed/{i}/600/400")),
                    link: format!("https://example.com/post/{i}"),
                }
            })
            .collect()
    }
}

impl Default for DemoCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn template(rng: &mut StdRng, topic: &str, country: &str) -> String {
    match rng.random_range(0..6) {
        0 => format!(
            "Breaking: New developments regarding {topic} in {country}. Experts are worried. #elections #{}",
            country.replace(' ', "")
        ),
        1 => format!(
            "Is {topic} really the biggest issue for {country}? A deep dive into the data reveals a surprising truth."
        ),
        2 => format!(
            "The government's stance on {topic} is causing widespread debate. Here's what you need to know."
        ),
        3 => format!(
            "A coordinated campaign is pushing false narratives about {topic} in {country}. We must be vigilant. #disinformation"
        ),
        4 => format!(
            "Our new poll shows that {}% of people in {country} are concerned about {topic}.",
            rng.random_range(20..80)
        ),
        _ => format!(
            "This is a clear example of foreign interference. The messaging around {topic} mirrors known propaganda techniques."
        ),
    }
}

/// A uniformly random instant inside the time frame (end date inclusive).
fn random_instant(rng: &mut StdRng, frame: &TimeFrame) -> DateTime<Utc> {
    let start = frame.start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let span = ((frame.end - frame.start).num_seconds() + 86_399).max(0);
    start + Duration::seconds(rng.random_range(0..=span))
}

#[async_trait]
impl PostCollector for DemoCollector {
    fn kind(&self) -> SourceKind {
        SourceKind::Demo
    }

    async fn collect(&self, input: &AnalysisInput) -> Result<CollectedBatch> {
        let posts = self.generate(input);
        info!(posts = posts.len(), "Generated demo posts");
        Ok(CollectedBatch::new(posts, Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn demo_posts_stay_inside_time_frame() {
        let input = crate::testing::input(&[SourceKind::Demo]);
        let batch = DemoCollector::seeded(7).collect(&input).await.unwrap();

        assert!((50..200).contains(&batch.posts.len()));
        assert!(batch.sources.is_empty());
        for post in &batch.posts {
            let day = post.timestamp.date_naive();
            assert!(day >= input.time_frame.start && day <= input.time_frame.end);
        }
        let ids: HashSet<_> = batch.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), batch.posts.len());
    }

    #[tokio::test]
    async fn same_seed_same_posts() {
        let input = crate::testing::input(&[SourceKind::Demo]);
        let a = DemoCollector::seeded(42).with_count(10).collect(&input).await.unwrap();
        let b = DemoCollector::seeded(42).with_count(10).collect(&input).await.unwrap();
        assert_eq!(a.posts, b.posts);
        assert_eq!(a.posts.len(), 10);
    }
}
