use async_trait::async_trait;
use tracing::info;

use ai_client::{AiError, Gemini, GenerateOptions, Message, TextStream};
use sentinel_common::{
    ChatMessage, ChatRole, Config, CounterOpportunity, Narrative, Post, SimulationResult,
};

use crate::pipeline::detector::{detection_prompt, DetectedCluster};
use crate::pipeline::enricher::{enrichment_prompt, Enrichment};
use crate::traits::NarrativeModel;

/// `NarrativeModel` backed by Gemini. A fast model handles clustering, briefs,
/// and chat; a reasoning model with a thinking budget handles enrichment and
/// planning.
pub struct GeminiAnalyst {
    fast: Gemini,
    deep: Gemini,
    thinking_budget: i32,
}

impl GeminiAnalyst {
    pub fn new(fast: Gemini, deep: Gemini, thinking_budget: i32) -> Self {
        Self {
            fast,
            deep,
            thinking_budget,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut base = Gemini::new(&config.gemini_api_key, &config.detection_model);
        if let Some(url) = &config.gemini_base_url {
            base = base.with_base_url(url);
        }
        let deep = base.with_model(&config.enrichment_model);
        Self::new(base, deep, config.enrichment_thinking_budget)
    }

    fn deep_options(&self, temperature: f32) -> GenerateOptions {
        GenerateOptions::new()
            .temperature(temperature)
            .thinking_budget(self.thinking_budget)
    }
}

fn narrative_context(narrative: &Narrative) -> String {
    let mut context = format!(
        "Title: {}\nSummary: {}\nRisk score: {}/10\n",
        narrative.title, narrative.summary, narrative.risk_score
    );
    if let Some(dmmi) = &narrative.dmmi_report {
        context.push_str(&format!(
            "DMMI: {:?} (intent {:?}, veracity {:?}, success probability {}%)\nRationale: {}\n",
            dmmi.classification,
            dmmi.intent,
            dmmi.veracity,
            dmmi.success_probability,
            dmmi.rationale
        ));
    }
    if let Some(origin) = &narrative.origin_report {
        context.push_str(&format!(
            "Origin: {:?} ({:?} confidence)\nEvidence: {}\n",
            origin.attribution, origin.confidence, origin.evidence
        ));
    }
    if let Some(counters) = &narrative.counter_opportunities {
        for counter in counters {
            context.push_str(&format!("Counter-opportunity: {}: {}\n", counter.title, counter.description));
        }
    }
    context
}

pub(crate) fn copilot_system_prompt(narrative: &Narrative) -> String {
    format!(
        "You are an Analyst Copilot helping an information-integrity analyst investigate one \
         narrative. Answer concisely, ground every claim in the context below, say when something \
         is uncertain, and never suggest offensive or manipulative tactics.\n\n{}",
        narrative_context(narrative)
    )
}

#[async_trait]
impl NarrativeModel for GeminiAnalyst {
    async fn detect(&self, posts: &[Post], context: &str) -> Result<Vec<DetectedCluster>, AiError> {
        info!(posts = posts.len(), model = self.fast.model(), "Detecting narratives");
        let options = GenerateOptions::new().temperature(0.2);
        self.fast.extract(detection_prompt(posts, context), &options).await
    }

    async fn enrich(&self, narrative: &Narrative, posts: &[Post]) -> Result<Enrichment, AiError> {
        info!(
            narrative = narrative.title.as_str(),
            posts = posts.len(),
            model = self.deep.model(),
            "Enriching narrative"
        );
        self.deep
            .extract(enrichment_prompt(narrative, posts), &self.deep_options(0.5))
            .await
    }

    async fn brief(&self, narrative: &Narrative) -> Result<String, AiError> {
        let prompt = format!(
            "Write a concise intelligence briefing in Markdown for allied civil-society \
             organizations about the narrative below. Include: an executive summary, key claims, \
             assessed intent and origin, likely impact, and recommended defensive actions. Keep it \
             factual and shareable.\n\n{}",
            narrative_context(narrative)
        );
        self.fast
            .generate_text(prompt, &GenerateOptions::new().temperature(0.4))
            .await
    }

    async fn counter_plan(
        &self,
        narrative: &Narrative,
        counter: &CounterOpportunity,
    ) -> Result<String, AiError> {
        let prompt = format!(
            "You are a strategic communications lead defending democratic integrity. Produce a \
             step-by-step action plan in Markdown to execute the counter-action below against the \
             narrative. Cover objectives, target audiences, messengers, channels, a timeline, \
             sample content, and success metrics. Only ethical, defensive tactics.\n\n\
             Counter-action: {:?}: {}\n{}\nExample content: {}\n\n{}",
            counter.strategy,
            counter.title,
            counter.description,
            counter.example_content,
            narrative_context(narrative)
        );
        self.deep.generate_text(prompt, &self.deep_options(0.6)).await
    }

    async fn simulate(
        &self,
        narrative: &Narrative,
        counter: &CounterOpportunity,
        plan: &str,
    ) -> Result<SimulationResult, AiError> {
        let prompt = format!(
            "Run a three-turn red-team wargame. The adversary behind the narrative below adapts to \
             the defending team's plan; the defenders respond each turn. For every turn give the \
             adversary's move, the counter response, and the projected change to the narrative's \
             risk score (-10 to +10). Finish with the most likely final outcome and one strategic \
             adjustment to the plan.\n\nCounter-action: {}\n\nPlan:\n{plan}\n\n{}",
            counter.title,
            narrative_context(narrative)
        );
        let result: SimulationResult = self.deep.extract(prompt, &self.deep_options(0.7)).await?;
        Ok(result.normalized())
    }

    async fn assignment_brief(&self, narrative: &Narrative, posts: &[Post]) -> Result<String, AiError> {
        let examples = posts
            .iter()
            .map(|p| format!("- {}: \"{}\"", p.author_handle, p.content))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Write a short tasking note (under 120 words) assigning the narrative below to a \
             rapid-response taskforce. State what to monitor, what to verify first, and the \
             immediate next step.\n\n{}\nExample posts:\n{examples}",
            narrative_context(narrative)
        );
        self.fast
            .generate_text(prompt, &GenerateOptions::new().temperature(0.3))
            .await
    }

    async fn chat(&self, narrative: &Narrative, history: &[ChatMessage]) -> Result<TextStream, AiError> {
        // Gemini expects the conversation to open with a user turn.
        let messages: Vec<Message> = history
            .iter()
            .skip_while(|m| m.role == ChatRole::Model)
            .filter(|m| !m.text.is_empty())
            .map(|m| match m.role {
                ChatRole::User => Message::user(&m.text),
                ChatRole::Model => Message::model(&m.text),
            })
            .collect();

        let options = GenerateOptions::new()
            .system(copilot_system_prompt(narrative))
            .temperature(0.5);
        self.fast.stream_chat(&messages, &options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{complete_narrative, post};

    #[test]
    fn context_includes_enrichment() {
        let narrative = complete_narrative("Grid shutdown hoax", &["p1"]);
        let context = narrative_context(&narrative);
        assert!(context.contains("Grid shutdown hoax"));
        assert!(context.contains("DMMI: Disinformation"));
        assert!(context.contains("Origin: BotNetwork"));
        assert!(copilot_system_prompt(&narrative).contains("Analyst Copilot"));
    }

    #[test]
    fn from_config_splits_models() {
        let config = sentinel_common::Config::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("k".to_string()),
            "ENRICHMENT_THINKING_BUDGET" => Some("512".to_string()),
            _ => None,
        })
        .unwrap();
        let analyst = GeminiAnalyst::from_config(&config);
        assert_eq!(analyst.fast.model(), "gemini-2.5-flash");
        assert_eq!(analyst.deep.model(), "gemini-2.5-pro");
        assert_eq!(analyst.thinking_budget, 512);
    }

    #[tokio::test]
    async fn unreachable_model_surfaces_transport_error() {
        let fast = Gemini::new("k", "m").with_base_url("http://127.0.0.1:1");
        let analyst = GeminiAnalyst::new(fast.clone(), fast, 0);
        let err = analyst.detect(&[post("p1", "x")], "ctx").await.unwrap_err();
        assert!(matches!(err, AiError::Transport(_)), "got {err:?}");
    }
}
