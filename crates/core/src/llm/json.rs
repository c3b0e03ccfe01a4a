use crate::domain::analysis::AnalysisResult;
use crate::domain::contract::LlmAnalysis;
use crate::error::{Error, Result};
use serde::Deserialize;

/// The JSON object inside `text`, tolerating a Markdown code fence or prose
/// around it.
pub fn json_payload(text: &str) -> Option<&str> {
    let text = text.trim();
    let body = match text.strip_prefix("```") {
        // Skip the info-string line, then cut at the closing fence.
        Some(fenced) => {
            let (_, rest) = fenced.split_once('\n')?;
            rest.rsplit_once("```").map_or(rest, |(inner, _)| inner)
        }
        None => text,
    };
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

/// Decode a chat completion body into the analysis contract.
///
/// The envelope is JSON and `choices[0].message.content` is itself a
/// JSON document encoded as a string, so this parses twice. Any failure at
/// either step is a `MalformedResponse`.
pub fn parse_completion(upstream: &str, body: &str) -> Result<AnalysisResult> {
    let envelope = serde_json::from_str::<ChatEnvelope>(body)
        .map_err(|e| Error::malformed(upstream, format!("envelope is not valid JSON: {e}")))?;

    let content = envelope
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| Error::malformed(upstream, "envelope has no message content"))?;

    parse_analysis(upstream, &content)
}

pub fn parse_analysis(upstream: &str, content: &str) -> Result<AnalysisResult> {
    let payload = json_payload(content).unwrap_or(content.trim());
    let parsed = serde_json::from_str::<LlmAnalysis>(payload)
        .map_err(|e| Error::malformed(upstream, format!("content does not match schema: {e}")))?;
    parsed
        .validate_and_into_result()
        .map_err(|e| Error::malformed(upstream, e.to_string()))
}

#[derive(Debug, Deserialize)]
struct ChatEnvelope {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
