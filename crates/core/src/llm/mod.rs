pub mod client;
pub mod fallback;
pub mod json;
pub mod openai;
pub mod prompts;
pub mod resolver;
pub mod service;

use crate::error::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Transport to a conversational completion backend.
///
/// Implementations classify non-success responses into
/// [`Error::Unauthorized`](crate::error::Error::Unauthorized),
/// [`Error::ModelUnavailable`](crate::error::Error::ModelUnavailable) or
/// [`Error::Upstream`](crate::error::Error::Upstream). Parsing the success body
/// is left to the caller.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Model identifiers usable with the configured credential.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Issue one chat request and return the raw success body.
    async fn create_chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String>;
}
