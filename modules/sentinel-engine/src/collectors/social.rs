use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use sentinel_common::{
    AnalysisInput, Engagement, Post, PostSource, SearchSource, SentinelError, SourceKind,
};
use social_proxy_client::{country_code, SearchedPost, SocialProxyClient};

use crate::traits::{CollectedBatch, PostCollector};

/// Keywords used when the analyst leaves the topic blank.
const BROAD_QUERY: &str = r#"("top stories" OR "breaking news" OR "headlines" OR "public debate")"#;

/// Recent posts from the social search proxy.
///
/// A proxy that cannot be reached at all yields an empty batch with a warning,
/// so local setups without the proxy still run. Any other failure is an error.
pub struct SocialProxyCollector {
    client: SocialProxyClient,
}

impl SocialProxyCollector {
    pub fn new(client: SocialProxyClient) -> Self {
        Self { client }
    }
}

pub(crate) fn build_query(topic: &str) -> String {
    let topic = topic.trim();
    if topic.is_empty() {
        format!("{BROAD_QUERY} lang:en -is:retweet")
    } else {
        format!("({topic}) lang:en -is:retweet")
    }
}

pub(crate) fn batch_from_search(results: Vec<SearchedPost>) -> CollectedBatch {
    let mut batch = CollectedBatch::default();

    for result in results {
        let author = result.author_label();
        let excerpt: String = result.text.chars().take(50).collect();
        batch.sources.push(SearchSource {
            uri: result.url.clone(),
            title: format!("Tweet by {author}: \"{excerpt}...\""),
        });
        batch.posts.push(Post {
            id: format!("twitter_{}", result.tweet_id),
            source: PostSource::Twitter,
            author_handle: result
                .author_username
                .as_ref()
                .map(|u| format!("@{u}"))
                .unwrap_or_else(|| "@unknown".to_string()),
            author,
            content: result.text,
            timestamp: result.created_at.unwrap_or_else(Utc::now),
            engagement: Engagement::default(),
            image_url: None,
            link: result.url,
        });
    }

    batch
}

#[async_trait]
impl PostCollector for SocialProxyCollector {
    fn kind(&self) -> SourceKind {
        SourceKind::Twitter
    }

    async fn collect(&self, input: &AnalysisInput) -> Result<CollectedBatch> {
        let query = build_query(&input.topic);
        let country = country_code(&input.country);

        match self.client.search(&query, country).await {
            Ok(results) => {
                let batch = batch_from_search(results);
                info!(posts = batch.posts.len(), "Social proxy collection complete");
                Ok(batch)
            }
            Err(e) if e.is_unreachable() => {
                warn!(
                    base_url = self.client.base_url(),
                    error = %e,
                    "Social proxy unreachable, returning no posts"
                );
                Ok(CollectedBatch::default())
            }
            Err(e) => Err(SentinelError::collector(self.kind(), e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Answer one request on a loopback port with a fixed status and body.
    async fn serve_once(status: u16, body: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status} Status\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn searched(id: &str, username: Option<&str>) -> SearchedPost {
        SearchedPost {
            tweet_id: id.to_string(),
            text: "Officials deny the rumor about the grid shutdown spreading this week".into(),
            author_name: username.map(|_| "Ana Pop".to_string()),
            author_username: username.map(String::from),
            created_at: Some(Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()),
            url: format!("https://twitter.com/{}/status/{id}", username.unwrap_or("anyuser")),
        }
    }

    #[test]
    fn search_results_map_to_posts_and_citations() {
        let batch = batch_from_search(vec![searched("1", Some("anapop")), searched("2", None)]);

        assert_eq!(batch.posts.len(), 2);
        assert_eq!(batch.posts[0].id, "twitter_1");
        assert_eq!(batch.posts[0].source, PostSource::Twitter);
        assert_eq!(batch.posts[0].author, "Ana Pop (@anapop)");
        assert_eq!(batch.posts[0].author_handle, "@anapop");
        assert_eq!(batch.posts[1].author, "Unknown User");

        assert_eq!(batch.sources[0].uri, "https://twitter.com/anapop/status/1");
        assert!(batch.sources[0]
            .title
            .starts_with("Tweet by Ana Pop (@anapop): \"Officials deny"));
        assert!(batch.sources[0].title.ends_with("...\""));
    }

    #[test]
    fn blank_topic_uses_broad_query() {
        assert!(build_query("  ").contains("breaking news"));
        assert_eq!(build_query("energy prices"), "(energy prices) lang:en -is:retweet");
    }

    #[tokio::test]
    async fn unreachable_proxy_degrades_to_empty_batch() {
        let collector = SocialProxyCollector::new(SocialProxyClient::new("http://127.0.0.1:1"));
        let batch = collector.collect(&crate::testing::input(&[SourceKind::Twitter])).await.unwrap();
        assert!(batch.is_empty());
        assert!(batch.sources.is_empty());
    }

    #[tokio::test]
    async fn proxy_error_status_fails_the_collector() {
        let base = serve_once(502, r#"{"error":"upstream timeout"}"#).await;
        let collector = SocialProxyCollector::new(SocialProxyClient::new(base));

        let err = collector
            .collect(&crate::testing::input(&[SourceKind::Twitter]))
            .await
            .unwrap_err();

        match err.downcast_ref::<SentinelError>() {
            Some(SentinelError::Collector { source_name, message }) => {
                assert_eq!(source_name, "twitter");
                assert!(message.contains("502"), "got {message}");
                assert!(message.contains("upstream timeout"), "got {message}");
            }
            other => panic!("expected collector error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upstream_errors_in_payload_fail_the_collector() {
        let base = serve_once(200, r#"{"meta":{"result_count":0},"errors":[{"title":"Rate limit"}]}"#).await;
        let collector = SocialProxyCollector::new(SocialProxyClient::new(base));

        let err = collector
            .collect(&crate::testing::input(&[SourceKind::Twitter]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Rate limit"), "got {err}");
    }

    #[tokio::test]
    async fn malformed_proxy_url_fails_instead_of_degrading() {
        let collector = SocialProxyCollector::new(SocialProxyClient::new("not a url"));
        let result = collector.collect(&crate::testing::input(&[SourceKind::Twitter])).await;
        assert!(result.is_err());
    }
}
