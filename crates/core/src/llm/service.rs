use crate::domain::analysis::AnalysisResult;
use crate::domain::ticker::normalize_ticker;
use crate::error::Result;
use crate::llm::client::CompletionClient;
use crate::llm::{fallback, prompts};
use serde::Deserialize;

const MAX_SCREEN_PARAM_CHARS: usize = 40;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScreenRequest {
    #[serde(default)]
    pub risk: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl ScreenRequest {
    fn risk(&self) -> String {
        clean_param(self.risk.as_deref(), "medium")
    }

    fn region(&self) -> String {
        clean_param(self.region.as_deref(), "US")
    }
}

fn clean_param(raw: Option<&str>, default: &str) -> String {
    let cleaned: String = raw
        .unwrap_or_default()
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .take(MAX_SCREEN_PARAM_CHARS)
        .collect();
    if cleaned.is_empty() {
        default.to_string()
    } else {
        cleaned
    }
}

/// `screen` and `analyze` on top of the completion client.
///
/// With fallback enabled, any completion failure is replaced by the static
/// payload. Input validation errors are never masked.
pub struct AnalysisService {
    client: CompletionClient,
    fallback_enabled: bool,
}

impl AnalysisService {
    pub fn new(client: CompletionClient, fallback_enabled: bool) -> Self {
        Self {
            client,
            fallback_enabled,
        }
    }

    pub fn client(&self) -> &CompletionClient {
        &self.client
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }

    pub async fn screen(&self, req: &ScreenRequest) -> Result<AnalysisResult> {
        let (risk, region) = (req.risk(), req.region());
        let outcome = self
            .client
            .complete(&prompts::screen_messages(&risk, &region))
            .await;
        self.or_fallback("screen", outcome, || fallback::screen_payload(&risk, &region))
    }

    pub async fn analyze(&self, raw_ticker: &str) -> Result<AnalysisResult> {
        let ticker = normalize_ticker(raw_ticker)?;
        let outcome = self.client.complete(&prompts::analyze_messages(&ticker)).await;
        self.or_fallback("analyze", outcome, || fallback::analyze_payload(&ticker))
    }

    fn or_fallback(
        &self,
        operation: &'static str,
        outcome: Result<AnalysisResult>,
        payload: impl FnOnce() -> AnalysisResult,
    ) -> Result<AnalysisResult> {
        match outcome {
            Ok(result) => Ok(result),
            Err(err) if self.fallback_enabled => {
                tracing::error!(
                    operation,
                    reason = err.reason(),
                    error = %err,
                    "completion failed; serving fallback payload"
                );
                Ok(payload())
            }
            Err(err) => Err(err),
        }
    }
}
