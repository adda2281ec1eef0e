use std::sync::Arc;

use futures::StreamExt;
use tracing::{info, warn};

use sentinel_common::{ChatMessage, ChatRole, Narrative};

use super::DerivedError;
use crate::traits::NarrativeModel;

pub const APOLOGY: &str = "I encountered an error processing your request. Please try again.";

/// Conversational assistant scoped to one narrative.
///
/// `send` takes `&mut self`, so a session handles one turn at a time.
pub struct CopilotSession {
    model: Arc<dyn NarrativeModel>,
    narrative: Narrative,
    messages: Vec<ChatMessage>,
}

impl CopilotSession {
    pub fn new(model: Arc<dyn NarrativeModel>, narrative: Narrative) -> Self {
        let greeting = ChatMessage::new(
            ChatRole::Model,
            format!(
                "I'm ready to analyze the \"{}\" narrative with you. How can I assist your investigation?",
                narrative.title
            ),
        );
        Self {
            model,
            narrative,
            messages: vec![greeting],
        }
    }

    pub fn narrative(&self) -> &Narrative {
        &self.narrative
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send one user message and stream the reply into a single model message.
    /// `on_chunk` sees each text delta as it arrives.
    ///
    /// On failure an apology is appended to the transcript and the error returned.
    pub async fn send(
        &mut self,
        text: &str,
        mut on_chunk: impl FnMut(&str) + Send,
    ) -> Result<&ChatMessage, DerivedError> {
        if text.trim().is_empty() {
            return Err(DerivedError::EmptyMessage);
        }
        self.messages.push(ChatMessage::new(ChatRole::User, text));

        let opened = self.model.chat(&self.narrative, &self.messages).await;
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(DerivedError::Model(e))),
        };

        self.messages.push(ChatMessage::new(ChatRole::Model, ""));
        let reply = self.messages.len() - 1;

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(delta) => {
                    on_chunk(&delta);
                    self.messages[reply].text.push_str(&delta);
                }
                Err(e) => {
                    if self.messages[reply].text.is_empty() {
                        self.messages.pop();
                    }
                    return Err(self.fail(DerivedError::Model(e)));
                }
            }
        }

        info!(
            narrative = self.narrative.title.as_str(),
            chars = self.messages[reply].text.len(),
            "Copilot reply complete"
        );
        Ok(&self.messages[reply])
    }

    fn fail(&mut self, error: DerivedError) -> DerivedError {
        warn!(error = %error, "Copilot turn failed");
        self.messages.push(ChatMessage::new(ChatRole::Model, APOLOGY));
        error
    }
}
