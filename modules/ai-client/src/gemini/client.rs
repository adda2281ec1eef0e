use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::debug;

use crate::error::{AiError, Result};

use super::types::*;

pub(crate) const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub(crate) struct GeminiClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, http: reqwest::Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            http,
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| AiError::Config(format!("invalid API key header: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);

        debug!(model = %request.model, "Gemini generateContent request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Open a server-sent-events stream and yield each decoded chunk.
    pub async fn stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<BoxStream<'static, Result<GenerateResponse>>> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, request.model
        );

        debug!(model = %request.model, "Gemini streamGenerateContent request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let mut bytes = Box::pin(response.bytes_stream());
        let stream = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut finished = false;
            while !finished {
                match bytes.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => {
                        yield Err(AiError::from(e));
                        return;
                    }
                    None => {
                        // Flush a final event that arrived without a trailing blank line.
                        buffer.extend_from_slice(b"\n\n");
                        finished = true;
                    }
                }
                let events = match drain_sse_events(&mut buffer) {
                    Ok(events) => events,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                for data in events {
                    yield serde_json::from_str::<GenerateResponse>(&data).map_err(AiError::from);
                }
            }
        };

        Ok(stream.boxed())
    }
}

/// Remove every complete SSE event from `buffer`, returning their `data:`
/// payloads. Incomplete trailing bytes stay in the buffer, so a multibyte
/// character split across network chunks is only decoded once whole.
pub(crate) fn drain_sse_events(buffer: &mut Vec<u8>) -> Result<Vec<String>> {
    let mut events = Vec::new();
    while let Some((end, separator)) = next_boundary(buffer) {
        let raw: Vec<u8> = buffer.drain(..end + separator).take(end).collect();
        let event = String::from_utf8(raw)
            .map_err(|e| AiError::BadResponse(format!("stream event is not valid UTF-8: {e}")))?;
        if let Some(data) = event_data(&event) {
            events.push(data);
        }
    }
    Ok(events)
}

/// Offset and length of the first blank-line separator, LF or CRLF.
fn next_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buffer, b"\n\n").map(|at| (at, 2));
    let crlf = find(buffer, b"\r\n\r\n").map(|at| (at, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn event_data(event: &str) -> Option<String> {
    let data: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    if data.is_empty() {
        return None;
    }
    let data = data.join("\n");
    (data != "[DONE]").then_some(data)
}
