//! Static payloads substituted when the completion backend cannot produce a
//! result. Every payload here has `mock` set.

use crate::domain::analysis::{AnalysisResult, IdeaCard, RadarCard, RiskLevel, Timeframe};

const DISCLAIMER: &str =
    "Sample data shown because the analysis service is unavailable. Not investment advice.";

fn idea(ticker: &str, name: &str, thesis: &str, timeframe: Timeframe, risk: RiskLevel) -> IdeaCard {
    IdeaCard {
        ticker: ticker.to_string(),
        name: name.to_string(),
        thesis: thesis.to_string(),
        timeframe,
        confidence: 50.0,
        risk,
        catalysts: vec!["earnings".to_string()],
    }
}

fn radar() -> Vec<RadarCard> {
    vec![RadarCard {
        ticker: "ASML".to_string(),
        name: "ASML Holding".to_string(),
        why_interesting: "Sole supplier of EUV lithography tools.".to_string(),
        timeframe: Timeframe::Long,
        confidence: 50.0,
        risk: RiskLevel::Medium,
        catalysts: vec!["capex cycle".to_string()],
    }]
}

pub fn screen_payload(risk: &str, region: &str) -> AnalysisResult {
    AnalysisResult {
        summary: format!(
            "Sample screen for a {risk}-risk profile in {region}. Live analysis is temporarily unavailable."
        ),
        buy: vec![idea(
            "MSFT",
            "Microsoft",
            "Diversified cloud and software cash flows.",
            Timeframe::Long,
            RiskLevel::Low,
        )],
        hold: vec![idea(
            "KO",
            "Coca-Cola",
            "Stable dividend, limited growth.",
            Timeframe::Medium,
            RiskLevel::Low,
        )],
        sell: Vec::new(),
        under_the_radar: radar(),
        disclaimers: vec![DISCLAIMER.to_string()],
        mock: true,
    }
}

pub fn analyze_payload(ticker: &str) -> AnalysisResult {
    AnalysisResult {
        summary: format!(
            "Sample analysis for {ticker}. Live analysis is temporarily unavailable."
        ),
        buy: Vec::new(),
        hold: vec![idea(
            ticker,
            ticker,
            "No live view available; treat as neutral.",
            Timeframe::Medium,
            RiskLevel::Medium,
        )],
        sell: Vec::new(),
        under_the_radar: radar(),
        disclaimers: vec![DISCLAIMER.to_string()],
        mock: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_are_marked_and_serialize_the_flag() {
        let p = analyze_payload("AAPL");
        assert!(p.mock);
        assert!(!p.summary.is_empty());
        assert_eq!(p.hold[0].ticker, "AAPL");

        let v = serde_json::to_value(screen_payload("low", "US")).unwrap();
        assert_eq!(v["mock"], true);
        assert!(v["underTheRadar"][0]["whyInteresting"].is_string());
    }
}
