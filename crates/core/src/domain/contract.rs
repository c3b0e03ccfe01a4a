use crate::domain::analysis::{AnalysisResult, IdeaCard, RadarCard, RiskLevel, Timeframe};
use anyhow::ensure;
use serde::Deserialize;

/// Shape the completion backend is asked to emit. Arrays may be omitted;
/// enumerations and the summary may not.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmAnalysis {
    pub summary: String,
    #[serde(default)]
    pub buy: Vec<LlmIdea>,
    #[serde(default)]
    pub hold: Vec<LlmIdea>,
    #[serde(default)]
    pub sell: Vec<LlmIdea>,
    #[serde(default)]
    pub under_the_radar: Vec<LlmRadar>,
    #[serde(default)]
    pub disclaimers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmIdea {
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub thesis: String,
    pub timeframe: Timeframe,
    pub confidence: f64,
    pub risk: RiskLevel,
    #[serde(default)]
    pub catalysts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmRadar {
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub why_interesting: String,
    pub timeframe: Timeframe,
    pub confidence: f64,
    pub risk: RiskLevel,
    #[serde(default)]
    pub catalysts: Vec<String>,
}

impl LlmAnalysis {
    pub fn validate_and_into_result(self) -> anyhow::Result<AnalysisResult> {
        let summary = self.summary.trim().to_string();
        ensure!(!summary.is_empty(), "summary must be non-empty");

        Ok(AnalysisResult {
            summary,
            buy: into_ideas(self.buy)?,
            hold: into_ideas(self.hold)?,
            sell: into_ideas(self.sell)?,
            under_the_radar: self
                .under_the_radar
                .into_iter()
                .map(LlmRadar::validate_and_into_card)
                .collect::<anyhow::Result<_>>()?,
            disclaimers: trimmed_non_empty(self.disclaimers),
            mock: false,
        })
    }
}

fn into_ideas(items: Vec<LlmIdea>) -> anyhow::Result<Vec<IdeaCard>> {
    items
        .into_iter()
        .map(LlmIdea::validate_and_into_card)
        .collect()
}

impl LlmIdea {
    fn validate_and_into_card(self) -> anyhow::Result<IdeaCard> {
        let ticker = normalized_ticker(&self.ticker)?;
        check_confidence(&ticker, self.confidence)?;
        Ok(IdeaCard {
            ticker,
            name: self.name.trim().to_string(),
            thesis: self.thesis.trim().to_string(),
            timeframe: self.timeframe,
            confidence: self.confidence,
            risk: self.risk,
            catalysts: trimmed_non_empty(self.catalysts),
        })
    }
}

impl LlmRadar {
    fn validate_and_into_card(self) -> anyhow::Result<RadarCard> {
        let ticker = normalized_ticker(&self.ticker)?;
        check_confidence(&ticker, self.confidence)?;
        Ok(RadarCard {
            ticker,
            name: self.name.trim().to_string(),
            why_interesting: self.why_interesting.trim().to_string(),
            timeframe: self.timeframe,
            confidence: self.confidence,
            risk: self.risk,
            catalysts: trimmed_non_empty(self.catalysts),
        })
    }
}

fn normalized_ticker(raw: &str) -> anyhow::Result<String> {
    let ticker = raw.trim().to_ascii_uppercase();
    ensure!(!ticker.is_empty(), "ticker must be non-empty");
    Ok(ticker)
}

fn check_confidence(ticker: &str, confidence: f64) -> anyhow::Result<()> {
    ensure!(
        confidence.is_finite() && (0.0..=100.0).contains(&confidence),
        "confidence for {ticker} must be between 0 and 100 (got {confidence})"
    );
    Ok(())
}

fn trimmed_non_empty(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
