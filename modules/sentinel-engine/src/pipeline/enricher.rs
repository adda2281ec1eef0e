use chrono::{Duration, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use ai_client::truncate_to_char_boundary;
use sentinel_common::{CounterOpportunity, DmmiReport, Narrative, OriginReport, Post, TrendPoint};

/// Longest slice of sample-post text sent with an enrichment request, in bytes.
pub const MAX_SAMPLE_BYTES: usize = 4000;

/// Days covered by a narrative's trend line.
pub const TREND_DAYS: i64 = 7;

/// Structured analysis the model returns for one narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    pub dmmi_report: DmmiReport,
    pub origin_report: OriginReport,
    pub counter_opportunities: Vec<CounterOpportunity>,
}

impl Enrichment {
    /// Clamp model-reported numbers into their documented ranges.
    pub fn normalized(mut self) -> Self {
        self.dmmi_report.success_probability = self.dmmi_report.success_probability.clamp(0, 100);
        self
    }
}

pub(crate) fn enrichment_prompt(narrative: &Narrative, posts: &[Post]) -> String {
    let post_content = posts
        .iter()
        .map(|p| format!("Author: {}, Content: \"{}\"", p.author_handle, p.content))
        .collect::<Vec<_>>()
        .join("\n");
    let samples = truncate_to_char_boundary(&post_content, MAX_SAMPLE_BYTES);

    format!(
        r#"**CONTEXT:** You are a strategic analyst specializing in information warfare defense.
**NARRATIVE FOR ANALYSIS:**
- **Title:** "{title}"
- **Summary:** "{summary}"
- **Sample Posts:**
{samples}

**YOUR TASK:** Perform a comprehensive analysis and provide a structured JSON response.

1.  **DMMI Classification:** Classify the narrative using the DMMI framework (Disinformation, Misinformation, Malinformation, Information).
    - **Disinformation:** False content with intent to harm.
    - **Misinformation:** False content without intent to harm.
    - **Malinformation:** True content with intent to harm.
    - **Information:** True content without intent to harm.
    Evaluate intent, veracity, and probability of success.

2.  **Origin Attribution:** Analyze post patterns, language, and sources to attribute the narrative's origin. Look for signs of coordination, bot-like activity, or alignment with known actors.

3.  **Counter-Opportunities:** Based on the analysis, propose three distinct, ethical, and defensive counter-opportunities. Focus on strategies like pre-bunking, fact-checking, and amplifying credible voices. DO NOT suggest offensive or manipulative tactics. The goal is to protect democratic integrity."#,
        title = narrative.title,
        summary = narrative.summary,
    )
}

/// Daily post volume for the week ending on the newest member post.
pub fn compute_trend(posts: &[Post]) -> Vec<TrendPoint> {
    let end: NaiveDate = posts
        .iter()
        .map(|p| p.timestamp.date_naive())
        .max()
        .unwrap_or_else(|| Utc::now().date_naive());

    (0..TREND_DAYS)
        .map(|i| {
            let date = end - Duration::days(TREND_DAYS - 1 - i);
            let volume = posts
                .iter()
                .filter(|p| p.timestamp.date_naive() == date)
                .count() as u32;
            TrendPoint { date, volume }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{enrichment, post_at};
    use chrono::TimeZone;

    #[test]
    fn trend_buckets_end_at_newest_post() {
        let posts = vec![
            post_at("a", Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()),
            post_at("b", Utc.with_ymd_and_hms(2025, 3, 10, 18, 0, 0).unwrap()),
            post_at("c", Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap()),
            post_at("old", Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap()),
        ];
        let trend = compute_trend(&posts);

        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
        assert_eq!(trend[6].date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(trend[6].volume, 2);
        assert_eq!(trend[4].volume, 1);
        assert_eq!(trend.iter().map(|t| t.volume).sum::<u32>(), 3);
    }

    #[test]
    fn prompt_truncates_long_samples() {
        let long = "é".repeat(5000);
        let posts = vec![crate::testing::post("p1", &long)];
        let narrative = Narrative::pending("T".into(), "S".into(), vec!["p1".into()], 5);
        let prompt = enrichment_prompt(&narrative, &posts);

        assert!(prompt.contains("**Title:** \"T\""));
        assert!(prompt.len() < 4000 + 2000);
    }

    #[test]
    fn success_probability_is_clamped() {
        let mut e = enrichment();
        e.dmmi_report.success_probability = 180;
        assert_eq!(e.normalized().dmmi_report.success_probability, 100);
    }

    #[test]
    fn out_of_range_probability_parses_then_clamps() {
        let mut raw = serde_json::to_value(enrichment()).unwrap();
        for (value, expected) in [(300, 100), (-5, 0)] {
            raw["dmmiReport"]["successProbability"] = serde_json::json!(value);
            let parsed: Enrichment = ai_client::parse_json(&raw.to_string()).unwrap();
            assert_eq!(parsed.normalized().dmmi_report.success_probability, expected);
        }
    }
}
