use crate::config::Settings;
use crate::error::{snippet, Error, Result};
use crate::llm::{ChatBackend, ChatMessage};
use anyhow::Context;
use serde::{Deserialize, Serialize};

const BACKEND: &str = "completion";

/// OpenAI-compatible chat backend (`/models`, `/chat/completions`).
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl HttpChatBackend {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.completion_timeout)
            .build()
            .context("failed to build completion http client")?;

        Ok(Self {
            http,
            api_key: settings.completion_api_key.clone(),
            base_url: settings.completion_base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("COMPLETION_API_KEY is required".into()))
    }

    async fn send(&self, req: reqwest::RequestBuilder, model: Option<&str>) -> Result<String> {
        let res = req
            .bearer_auth(self.api_key()?)
            .send()
            .await
            .map_err(|e| Error::from_transport(BACKEND, e))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| Error::from_transport(BACKEND, e))?;

        if !status.is_success() {
            tracing::warn!(
                http_status = %status,
                model = model.unwrap_or("-"),
                body = %snippet(&text),
                "completion backend returned an error"
            );
            return Err(classify_failure(status.as_u16(), &text, model));
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl ChatBackend for HttpChatBackend {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let text = self.send(self.http.get(self.url("models")), None).await?;
        let parsed = serde_json::from_str::<ModelList>(&text)
            .map_err(|e| Error::malformed(BACKEND, format!("failed to decode model list: {e}")))?;
        Ok(parsed.data.into_iter().map(|m| m.id).collect())
    }

    async fn create_chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        let body = ChatCompletionRequest {
            model,
            messages,
            temperature: 0.3,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let req = self.http.post(self.url("chat/completions")).json(&body);
        self.send(req, Some(model)).await
    }
}

/// Classify a non-success completion response.
///
/// A rejected credential is `Unauthorized`; a model the backend no longer
/// serves is `ModelUnavailable`; anything else is a plain `Upstream` error.
pub fn classify_failure(status: u16, body: &str, model: Option<&str>) -> Error {
    if status == 401 {
        return Error::Unauthorized;
    }

    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .unwrap_or_default();
    let code = detail.code.unwrap_or_default().to_ascii_lowercase();
    let message = detail
        .message
        .unwrap_or_else(|| body.to_string())
        .to_ascii_lowercase();

    if code == "invalid_api_key" {
        return Error::Unauthorized;
    }

    let model_gone = matches!(code.as_str(), "model_decommissioned" | "model_not_found")
        || message.contains("decommissioned")
        || (message.contains("model") && message.contains("does not exist"))
        || (status == 404 && model.is_some());

    match model {
        Some(model) if model_gone => Error::ModelUnavailable {
            model: model.to_string(),
        },
        _ => Error::upstream(BACKEND, status, body),
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unauthorized_is_not_a_model_problem() {
        let body = json!({"error": {"message": "Invalid API Key", "code": "invalid_api_key"}});
        assert_eq!(
            classify_failure(401, &body.to_string(), Some("m1")),
            Error::Unauthorized
        );
        assert_eq!(
            classify_failure(400, &body.to_string(), Some("m1")),
            Error::Unauthorized
        );
    }

    #[test]
    fn decommissioned_model_is_detected() {
        let body = json!({
            "error": {
                "message": "The model `llama3-70b-8192` has been decommissioned and is no longer supported.",
                "type": "invalid_request_error",
                "code": "model_decommissioned"
            }
        });
        assert_eq!(
            classify_failure(400, &body.to_string(), Some("llama3-70b-8192")),
            Error::ModelUnavailable {
                model: "llama3-70b-8192".to_string()
            }
        );
    }

    #[test]
    fn not_found_model_is_detected_from_plain_text() {
        assert_eq!(
            classify_failure(404, "model does not exist", Some("gone")),
            Error::ModelUnavailable {
                model: "gone".to_string()
            }
        );
    }

    #[test]
    fn other_failures_are_upstream_with_snippet() {
        let body = "x".repeat(1_000);
        match classify_failure(503, &body, Some("m1")) {
            Error::Upstream { status, snippet, .. } => {
                assert_eq!(status, 503);
                assert!(snippet.chars().count() <= crate::error::SNIPPET_MAX_CHARS + 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn request_serializes_roles_lowercase() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let req = ChatCompletionRequest {
            model: "m",
            messages: &messages,
            temperature: 0.3,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["role"], "user");
        assert_eq!(v["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn missing_key_is_configuration_error() {
        let backend = HttpChatBackend::from_settings(&Settings::default()).unwrap();
        let err = backend.list_models().await.unwrap_err();
        assert_eq!(err.reason(), "configuration_error");
    }
}
