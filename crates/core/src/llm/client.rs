use crate::domain::analysis::AnalysisResult;
use crate::error::{Error, Result};
use crate::llm::json::parse_completion;
use crate::llm::resolver::ModelResolver;
use crate::llm::{ChatBackend, ChatMessage};
use std::sync::Arc;
use std::time::Duration;

/// Issues structured completion requests against the sticky model.
///
/// A model rejected as unavailable gets exactly one retry on a replacement;
/// every other failure is surfaced as-is.
pub struct CompletionClient {
    backend: Arc<dyn ChatBackend>,
    resolver: ModelResolver,
    timeout: Duration,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn ChatBackend>, resolver: ModelResolver, timeout: Duration) -> Self {
        Self {
            backend,
            resolver,
            timeout,
        }
    }

    pub fn resolver(&self) -> &ModelResolver {
        &self.resolver
    }

    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<AnalysisResult> {
        let model = self.resolver.resolve().await?;

        match self.chat(&model, messages).await {
            Ok(body) => parse_completion(self.backend.backend_name(), &body),
            Err(Error::ModelUnavailable { .. }) => {
                tracing::warn!(%model, "completion model unavailable; retrying once on a replacement");
                self.retry_on_replacement(&model, messages).await
            }
            Err(err) => Err(err),
        }
    }

    async fn retry_on_replacement(
        &self,
        failed: &str,
        messages: &[ChatMessage],
    ) -> Result<AnalysisResult> {
        let state = self.resolver.state();
        let replacement = match self.resolver.replacement_for(failed).await {
            Ok(m) => m,
            Err(err) => {
                state.clear_if(failed).await;
                return Err(err);
            }
        };

        match self.chat(&replacement, messages).await {
            Ok(body) => {
                tracing::info!(failed, model = %replacement, "completion model switched");
                state.set(replacement).await;
                parse_completion(self.backend.backend_name(), &body)
            }
            Err(err) => {
                state.clear_if(failed).await;
                Err(err)
            }
        }
    }

    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        tokio::time::timeout(self.timeout, self.backend.create_chat(model, messages))
            .await
            .map_err(|_| Error::Timeout {
                upstream: self.backend.backend_name().to_string(),
            })?
    }
}
