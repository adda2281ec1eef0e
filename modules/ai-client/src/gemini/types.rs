use serde::{Deserialize, Serialize};

use crate::traits::{Message, MessageRole};

// =============================================================================
// Contents
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Part {
    #[serde(default)]
    pub text: Option<String>,
    /// Set on reasoning summaries from thinking models; never part of the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            thought: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

impl From<&Message> for Content {
    fn from(message: &Message) -> Self {
        Self {
            role: Some(message.role.as_str().to_string()),
            parts: vec![Part::text(message.content.clone())],
        }
    }
}

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ThinkingConfig {
    pub thinking_budget: i32,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GoogleSearchTool {
    pub google_search: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateRequest {
    #[serde(skip)]
    pub model: String,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<GoogleSearchTool>>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            contents: Vec::new(),
            system_instruction: None,
            generation_config: None,
            tools: None,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system_instruction = Some(Content::system(system));
        self
    }

    pub fn content(mut self, content: Content) -> Self {
        self.contents.push(content);
        self
    }

    pub fn contents(mut self, contents: impl IntoIterator<Item = Content>) -> Self {
        self.contents.extend(contents);
        self
    }

    pub fn config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    pub fn google_search(mut self) -> Self {
        self.tools
            .get_or_insert_with(Vec::new)
            .push(GoogleSearchTool {
                google_search: serde_json::json!({}),
            });
        self
    }
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WebChunk {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    #[allow(dead_code)]
    pub usage_metadata: Option<UsageMetadata>,
}

impl GenerateResponse {
    /// Concatenated answer text of the first candidate, skipping thought parts.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter(|p| p.thought != Some(true))
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }

    pub fn web_sources(&self) -> Vec<(String, String)> {
        self.candidates
            .iter()
            .filter_map(|c| c.grounding_metadata.as_ref())
            .flat_map(|m| m.grounding_chunks.iter())
            .filter_map(|chunk| chunk.web.as_ref())
            .filter_map(|web| {
                let uri = web.uri.clone()?;
                let title = web.title.clone().unwrap_or_else(|| uri.clone());
                Some((uri, title))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_camel_case() {
        let request = GenerateRequest::new("gemini-2.5-flash")
            .system("be brief")
            .content(Content::user("hello"))
            .config(GenerationConfig {
                temperature: Some(0.2),
                response_mime_type: Some("application/json".into()),
                thinking_config: Some(ThinkingConfig { thinking_budget: 1024 }),
                ..Default::default()
            })
            .google_search();
        let json = serde_json::to_value(&request).unwrap();

        assert!(json.get("model").is_none());
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["thinkingConfig"]["thinkingBudget"], 1024);
        assert!(json["generationConfig"].get("responseSchema").is_none());
        assert!(json["tools"][0]["google_search"].is_object());
    }

    #[test]
    fn response_text_skips_thoughts() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "[1,"},
                    {"text": "2]"}
                ]},
                "finishReason": "STOP"
            }]
        });
        let response: GenerateResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.text().as_deref(), Some("[1,2]"));
    }

    #[test]
    fn grounding_chunks_become_sources() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "ok"}]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://a.example", "title": "A"}},
                    {"web": {"uri": "https://b.example"}},
                    {}
                ]}
            }]
        });
        let response: GenerateResponse = serde_json::from_value(raw).unwrap();
        let sources = response.web_sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0], ("https://a.example".to_string(), "A".to_string()));
        assert_eq!(sources[1].1, "https://b.example");
    }

    #[test]
    fn blocked_prompt_is_reported() {
        let raw = serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let response: GenerateResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.block_reason(), Some("SAFETY"));
        assert!(response.text().is_none());
    }
}
