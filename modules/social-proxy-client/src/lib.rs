pub mod error;
pub mod types;

pub use error::{ProxyError, Result};
pub use types::{SearchMeta, SearchResponse, SearchedPost, Tweet, TweetAuthor};

use types::ErrorBody;

/// Path the proxy serves recent-search requests on.
const SEARCH_PATH: &str = "/api/twitter-search";

/// Client for the server-side proxy in front of the social search API.
///
/// The proxy holds the bearer token; this client only ever sends the query
/// string and a two-letter country code.
pub struct SocialProxyClient {
    client: reqwest::Client,
    base_url: String,
}

impl SocialProxyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, reqwest::Client::new())
    }

    pub fn with_http_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a recent-search query through the proxy and return joined posts.
    pub async fn search(&self, query: &str, country_code: Option<&str>) -> Result<Vec<SearchedPost>> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        let mut params = vec![("query", query)];
        if let Some(cc) = country_code {
            params.push(("country", cc));
        }

        tracing::info!(query, country = country_code.unwrap_or(""), "Searching social proxy");

        let resp = self.client.get(&url).query(&params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("social proxy failed with status {}", status.as_u16()));
            return Err(ProxyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        let response: SearchResponse = serde_json::from_str(&body)?;

        if let Some(errors) = response.errors.as_ref().filter(|e| !e.is_empty()) {
            tracing::warn!(count = errors.len(), "Search API returned errors");
            return Err(ProxyError::Upstream(serde_json::to_string(errors)?));
        }

        let posts = response.into_posts();
        tracing::info!(count = posts.len(), "Fetched posts from social proxy");
        Ok(posts)
    }
}

/// Map a country name to its ISO 3166-1 alpha-2 code for the proxy's
/// `place_country:` filter. Unknown names yield `None` (no filter).
pub fn country_code(country: &str) -> Option<&'static str> {
    let code = match country.trim().to_lowercase().as_str() {
        "united states" | "usa" | "us" => "US",
        "united kingdom" | "uk" | "great britain" => "GB",
        "canada" => "CA",
        "moldova" => "MD",
        "ukraine" => "UA",
        "russia" => "RU",
        "romania" => "RO",
        "germany" => "DE",
        "france" => "FR",
        "poland" => "PL",
        "georgia" => "GE",
        "armenia" => "AM",
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn country_codes_are_case_insensitive() {
        assert_eq!(country_code("Moldova"), Some("MD"));
        assert_eq!(country_code(" united kingdom "), Some("GB"));
        assert_eq!(country_code("Atlantis"), None);
    }

    #[test]
    fn base_url_is_normalized() {
        let client = SocialProxyClient::new("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[tokio::test]
    async fn missing_proxy_is_unreachable() {
        let client = SocialProxyClient::new("http://127.0.0.1:1");
        let err = client.search("breaking news", Some("MD")).await.unwrap_err();
        assert!(err.is_unreachable(), "got {err:?}");
    }

    #[tokio::test]
    async fn malformed_base_url_is_not_unreachable() {
        let client = SocialProxyClient::new("not a url");
        let err = client.search("breaking news", None).await.unwrap_err();
        assert!(!err.is_unreachable(), "got {err:?}");
    }

    #[tokio::test]
    async fn error_body_becomes_api_error() {
        let client = SocialProxyClient::new(serve_once(429, r#"{"error":"Too many requests"}"#).await);
        let err = client.search("q", Some("MD")).await.unwrap_err();
        match err {
            ProxyError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Too many requests");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_falls_back_to_status() {
        let client = SocialProxyClient::new(serve_once(500, "<html>oops</html>").await);
        let err = client.search("q", None).await.unwrap_err();
        match err {
            ProxyError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "social proxy failed with status 500");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn payload_errors_become_upstream_error() {
        let body = r#"{"meta":{"result_count":0},"errors":[{"title":"Invalid Request"}]}"#;
        let client = SocialProxyClient::new(serve_once(200, body).await);
        let err = client.search("q", None).await.unwrap_err();
        assert!(matches!(err, ProxyError::Upstream(ref m) if m.contains("Invalid Request")), "got {err:?}");
        assert!(!err.is_unreachable());
    }

    #[tokio::test]
    async fn successful_payload_joins_authors() {
        let body = r#"{
            "data": [{"id": "42", "text": "Grid rumor", "author_id": "7", "created_at": "2025-03-02T08:00:00Z"}],
            "includes": {"users": [{"id": "7", "name": "Ana Pop", "username": "anapop"}]},
            "meta": {"result_count": 1}
        }"#;
        let client = SocialProxyClient::new(serve_once(200, body).await);
        let posts = client.search("q", Some("MD")).await.unwrap();

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author_label(), "Ana Pop (@anapop)");
        assert_eq!(posts[0].url, "https://twitter.com/anapop/status/42");
    }
}
