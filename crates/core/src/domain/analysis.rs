use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaCard {
    pub ticker: String,
    pub name: String,
    pub thesis: String,
    pub timeframe: Timeframe,
    pub confidence: f64,
    pub risk: RiskLevel,
    pub catalysts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarCard {
    pub ticker: String,
    pub name: String,
    pub why_interesting: String,
    pub timeframe: Timeframe,
    pub confidence: f64,
    pub risk: RiskLevel,
    pub catalysts: Vec<String>,
}

/// Result returned by `screen` and `analyze`.
///
/// `mock` is only serialized when the payload is the static fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub buy: Vec<IdeaCard>,
    pub hold: Vec<IdeaCard>,
    pub sell: Vec<IdeaCard>,
    pub under_the_radar: Vec<RadarCard>,
    pub disclaimers: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub mock: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}
