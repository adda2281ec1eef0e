mod client;
pub(crate) mod types;

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::debug;

use crate::error::{AiError, Result};
use crate::schema::StructuredOutput;
use crate::traits::Message;
use crate::util::parse_json;

use client::GeminiClient;
use types::*;

/// Incremental answer text from a streaming call.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Per-call generation knobs.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub thinking_budget: Option<i32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn thinking_budget(mut self, budget: i32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }

    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            thinking_config: self
                .thinking_budget
                .map(|thinking_budget| ThinkingConfig { thinking_budget }),
            ..Default::default()
        }
    }
}

/// A citation returned by search grounding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

/// Text synthesized from a Google-Search-grounded call plus its citations.
#[derive(Debug, Clone)]
pub struct GroundedAnswer {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

// =============================================================================
// Gemini Agent
// =============================================================================

/// Explicitly constructed Gemini client. Holds the key and model it was built
/// with; nothing is read from the process environment.
#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Share one connection pool across several model handles.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Same credentials and transport, different model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn client(&self) -> GeminiClient {
        let client = GeminiClient::new(&self.api_key, self.http.clone());
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    fn request(&self, options: &GenerateOptions) -> GenerateRequest {
        let request = GenerateRequest::new(&self.model);
        match options.system {
            Some(ref system) => request.system(system),
            None => request,
        }
    }

    async fn send(&self, request: &GenerateRequest) -> Result<String> {
        let response = self.client().generate(request).await?;

        if let Some(reason) = response.block_reason() {
            return Err(AiError::Blocked(reason.to_string()));
        }

        response.text().ok_or_else(|| {
            let finish = response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "none".to_string());
            AiError::BadResponse(format!("no text in response (finish reason: {finish})"))
        })
    }

    // =========================================================================
    // Convenience methods
    // =========================================================================

    /// Free-text completion.
    pub async fn generate_text(
        &self,
        prompt: impl Into<String>,
        options: &GenerateOptions,
    ) -> Result<String> {
        let request = self
            .request(options)
            .content(Content::user(prompt))
            .config(options.generation_config());

        self.send(&request).await
    }

    /// Type-safe structured output. The schema is sent as `responseSchema`,
    /// but the reply is still parsed defensively since the model may wrap it.
    pub async fn extract<T: StructuredOutput>(
        &self,
        prompt: impl Into<String>,
        options: &GenerateOptions,
    ) -> Result<T> {
        let mut config = options.generation_config();
        config.response_mime_type = Some("application/json".to_string());
        config.response_schema = Some(T::gemini_schema());

        let request = self
            .request(options)
            .content(Content::user(prompt))
            .config(config);

        let text = self.send(&request).await?;
        debug!(model = %self.model, chars = text.len(), "Structured response received");
        parse_json(&text)
    }

    /// Generation grounded in Google Search. Gemini does not allow a response
    /// schema alongside tools, so callers get raw text plus the citations.
    pub async fn grounded_search(
        &self,
        prompt: impl Into<String>,
        options: &GenerateOptions,
    ) -> Result<GroundedAnswer> {
        let request = self
            .request(options)
            .content(Content::user(prompt))
            .config(options.generation_config())
            .google_search();

        let response = self.client().generate(&request).await?;
        if let Some(reason) = response.block_reason() {
            return Err(AiError::Blocked(reason.to_string()));
        }

        let text = response
            .text()
            .ok_or_else(|| AiError::BadResponse("grounded search returned no text".into()))?;
        let sources = response
            .web_sources()
            .into_iter()
            .map(|(uri, title)| GroundingSource { uri, title })
            .collect();

        Ok(GroundedAnswer { text, sources })
    }

    /// Multi-turn chat whose reply arrives as a stream of text deltas.
    pub async fn stream_chat(
        &self,
        history: &[Message],
        options: &GenerateOptions,
    ) -> Result<TextStream> {
        let request = self
            .request(options)
            .contents(history.iter().map(Content::from))
            .config(options.generation_config());

        let chunks = self.client().stream(&request).await?;
        let text = chunks.filter_map(|chunk| async move {
            match chunk {
                Ok(response) => {
                    if let Some(reason) = response.block_reason() {
                        return Some(Err(AiError::Blocked(reason.to_string())));
                    }
                    response.text().map(Ok)
                }
                Err(e) => Some(Err(e)),
            }
        });

        Ok(text.boxed())
    }
}
