use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Analysis input ---

/// Which collector a run should consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Twitter,
    WebSearch,
    Demo,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Twitter => "twitter",
            SourceKind::WebSearch => "web_search",
            SourceKind::Demo => "demo",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFrame {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The filters an analyst submits for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisInput {
    pub country: String,
    pub topic: String,
    pub time_frame: TimeFrame,
    pub sources: Vec<SourceKind>,
}

impl AnalysisInput {
    /// Context line handed to the detector, e.g. "narratives about elections in Moldova".
    pub fn context(&self) -> String {
        format!("narratives about {} in {}", self.topic, self.country)
    }
}

// --- Posts ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostSource {
    #[serde(rename = "X/Twitter")]
    Twitter,
    #[serde(rename = "Google News")]
    GoogleNews,
    #[serde(rename = "Web")]
    Web,
    #[serde(rename = "Demo")]
    Demo,
}

impl PostSource {
    pub fn label(&self) -> &'static str {
        match self {
            PostSource::Twitter => "X/Twitter",
            PostSource::GoogleNews => "Google News",
            PostSource::Web => "Web",
            PostSource::Demo => "Demo",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u32,
    pub retweets: u32,
    pub replies: u32,
}

/// A collected post. Immutable once fetched; narratives refer to it by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub source: PostSource,
    pub author: String,
    pub author_handle: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub engagement: Engagement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub link: String,
}

/// Citation metadata, unique by `uri` within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSource {
    pub uri: String,
    pub title: String,
}

// --- Enrichment reports ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Classification {
    Disinformation,
    Misinformation,
    Malinformation,
    Information,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Intent {
    Harmful,
    Benign,
    Uncertain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Veracity {
    False,
    Misleading,
    True,
    Unverified,
}

/// DMMI (Disinformation / Misinformation / Malinformation / Information) verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DmmiReport {
    pub classification: Classification,
    pub intent: Intent,
    pub veracity: Veracity,
    /// Estimated probability of narrative success (0-100).
    pub success_probability: i64,
    /// Brief rationale for the DMMI classification.
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Attribution {
    #[serde(rename = "State-sponsored")]
    StateSponsored,
    #[serde(rename = "Ideological Group")]
    IdeologicalGroup,
    #[serde(rename = "Bot Network")]
    BotNetwork,
    Organic,
    Uncertain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OriginReport {
    pub attribution: Attribution,
    pub confidence: Confidence,
    /// Summary of evidence for the attribution (e.g., coordinated timing, linguistic patterns).
    pub evidence: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CounterStrategy {
    #[serde(rename = "Pre-bunking")]
    PreBunking,
    #[serde(rename = "Fact-checking")]
    FactChecking,
    #[serde(rename = "Content Amplification")]
    ContentAmplification,
    #[serde(rename = "Public Awareness Campaign")]
    PublicAwarenessCampaign,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CounterOpportunity {
    pub strategy: CounterStrategy,
    /// Headline for the counter-action.
    pub title: String,
    /// Brief description of the counter-action.
    pub description: String,
    /// A sample piece of content (e.g., a tweet, a short article).
    pub example_content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub volume: u32,
}

// --- Narratives ---

/// Lifecycle of a narrative within one run. `Pending` moves to exactly one
/// terminal state and stays there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeStatus {
    Pending,
    Complete,
    Error,
}

impl NarrativeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, NarrativeStatus::Pending)
    }
}

impl std::fmt::Display for NarrativeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NarrativeStatus::Pending => "pending",
            NarrativeStatus::Complete => "complete",
            NarrativeStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub post_ids: Vec<String>,
    pub risk_score: u8,
    pub status: NarrativeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dmmi_report: Option<DmmiReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_report: Option<OriginReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_opportunities: Option<Vec<CounterOpportunity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend_data: Option<Vec<TrendPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Narrative {
    /// A freshly detected narrative awaiting enrichment.
    pub fn pending(title: String, summary: String, post_ids: Vec<String>, risk_score: u8) -> Self {
        Self {
            id: format!("narrative_{}", Uuid::new_v4().simple()),
            title,
            summary,
            post_ids,
            risk_score: risk_score.clamp(1, 10),
            status: NarrativeStatus::Pending,
            dmmi_report: None,
            origin_report: None,
            counter_opportunities: None,
            trend_data: None,
            campaign: None,
            error: None,
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::assess(
            self.risk_score,
            self.dmmi_report.as_ref().map(|r| r.classification),
        )
    }
}

/// Dashboard severity band for a narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Elevated,
    Critical,
}

impl RiskLevel {
    pub fn assess(risk_score: u8, classification: Option<Classification>) -> Self {
        match classification {
            Some(Classification::Disinformation | Classification::Malinformation) => {
                RiskLevel::Critical
            }
            _ if risk_score >= 8 => RiskLevel::Critical,
            Some(Classification::Misinformation) => RiskLevel::Elevated,
            _ if risk_score >= 5 => RiskLevel::Elevated,
            _ => RiskLevel::Low,
        }
    }
}

// --- Derived artifacts ---

/// A narrative handed to the response team. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskforceItem {
    pub id: String,
    pub narrative_id: String,
    pub narrative_title: String,
    pub assignment_brief: String,
    pub posts: Vec<Post>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationTurn {
    pub turn: u32,
    /// How the adversary adapts to the counter-action.
    pub adversary_move: String,
    /// How the defending team responds.
    pub counter_response: String,
    /// Expected change to the narrative's risk score (-10 to +10).
    pub projected_risk_change: i64,
}

/// Red-team wargame of a counter-action plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub turns: Vec<SimulationTurn>,
    /// Most likely end state if the plan is executed as written.
    pub final_outcome: String,
    /// What the defending team should change in the plan.
    pub strategic_adjustment: String,
}

impl SimulationResult {
    /// Clamp each turn's projected risk change to -10..=10.
    pub fn normalized(mut self) -> Self {
        for turn in &mut self.turns {
            turn.projected_risk_change = turn.projected_risk_change.clamp(-10, 10);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_prefers_classification() {
        assert_eq!(
            RiskLevel::assess(2, Some(Classification::Disinformation)),
            RiskLevel::Critical
        );
        assert_eq!(RiskLevel::assess(9, None), RiskLevel::Critical);
        assert_eq!(
            RiskLevel::assess(9, Some(Classification::Information)),
            RiskLevel::Critical
        );
        assert_eq!(
            RiskLevel::assess(1, Some(Classification::Misinformation)),
            RiskLevel::Elevated
        );
        assert_eq!(RiskLevel::assess(5, None), RiskLevel::Elevated);
        assert_eq!(
            RiskLevel::assess(3, Some(Classification::Information)),
            RiskLevel::Low
        );
    }

    #[test]
    fn pending_narrative_clamps_risk() {
        let n = Narrative::pending("t".into(), "s".into(), vec![], 42);
        assert_eq!(n.risk_score, 10);
        assert_eq!(n.status, NarrativeStatus::Pending);
        assert!(n.id.starts_with("narrative_"));
        let low = Narrative::pending("t".into(), "s".into(), vec![], 0);
        assert_eq!(low.risk_score, 1);
    }

    #[test]
    fn wire_names_match_dashboard() {
        let counter = CounterOpportunity {
            strategy: CounterStrategy::PreBunking,
            title: "t".into(),
            description: "d".into(),
            example_content: "e".into(),
        };
        let json = serde_json::to_value(&counter).unwrap();
        assert_eq!(json["strategy"], "Pre-bunking");
        assert_eq!(json["exampleContent"], "e");

        let origin: OriginReport = serde_json::from_value(serde_json::json!({
            "attribution": "Bot Network",
            "confidence": "High",
            "evidence": "burst posting"
        }))
        .unwrap();
        assert_eq!(origin.attribution, Attribution::BotNetwork);

        let status = serde_json::to_value(NarrativeStatus::Complete).unwrap();
        assert_eq!(status, "complete");
        assert_eq!(serde_json::to_value(PostSource::Twitter).unwrap(), "X/Twitter");
    }

    #[test]
    fn analysis_input_round_trips() {
        let input = AnalysisInput {
            country: "Moldova".into(),
            topic: "elections".into(),
            time_frame: TimeFrame {
                start: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 3, 8).unwrap(),
            },
            sources: vec![SourceKind::Twitter, SourceKind::WebSearch],
        };
        let json = serde_json::to_string(&input).unwrap();
        assert!(json.contains("timeFrame"));
        assert!(json.contains("web_search"));
        let back: AnalysisInput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, input);
        assert_eq!(back.context(), "narratives about elections in Moldova");
    }

    #[test]
    fn simulation_risk_changes_are_clamped() {
        let turn = |change| SimulationTurn {
            turn: 1,
            adversary_move: "a".into(),
            counter_response: "c".into(),
            projected_risk_change: change,
        };
        let result = SimulationResult {
            turns: vec![turn(-40), turn(3), turn(500)],
            final_outcome: "o".into(),
            strategic_adjustment: "s".into(),
        }
        .normalized();

        let changes: Vec<_> = result.turns.iter().map(|t| t.projected_risk_change).collect();
        assert_eq!(changes, vec![-10, 3, 10]);
    }
}
