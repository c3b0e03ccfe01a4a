use crate::error::{Error, Result};
use crate::llm::ChatBackend;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Known-good models, best first.
pub const PREFERRED_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "llama-3.1-70b-versatile",
    "llama3-70b-8192",
    "llama-3.1-8b-instant",
    "mixtral-8x7b-32768",
    "gemma2-9b-it",
];

/// The sticky model for this process. Cloning shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct ModelState {
    current: Arc<RwLock<Option<String>>>,
}

impl ModelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start out with `model` already chosen (statically configured, or a test seed).
    pub fn seeded(model: impl Into<String>) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(model.into()))),
        }
    }

    pub async fn current(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    pub async fn set(&self, model: String) {
        *self.current.write().await = Some(model);
    }

    /// Forget the current model if it is still `model`.
    pub async fn clear_if(&self, model: &str) -> bool {
        let mut guard = self.current.write().await;
        if guard.as_deref() == Some(model) {
            *guard = None;
            true
        } else {
            false
        }
    }
}

/// First preferred model present in `available`, else the first available
/// one. `exclude` is never chosen.
pub fn select_model(
    available: &[String],
    preferred: &[String],
    exclude: Option<&str>,
) -> Option<String> {
    let usable = |m: &str| Some(m) != exclude;

    preferred
        .iter()
        .find(|p| usable(p.as_str()) && available.iter().any(|a| a == *p))
        .or_else(|| available.iter().find(|a| usable(a.as_str())))
        .cloned()
}

pub struct ModelResolver {
    backend: Arc<dyn ChatBackend>,
    state: ModelState,
    preferred: Vec<String>,
    // Held across the catalog call so concurrent first requests share one listing.
    resolving: Mutex<()>,
}

impl ModelResolver {
    pub fn new(backend: Arc<dyn ChatBackend>, state: ModelState) -> Self {
        Self::with_preferences(
            backend,
            state,
            PREFERRED_MODELS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_preferences(
        backend: Arc<dyn ChatBackend>,
        state: ModelState,
        preferred: Vec<String>,
    ) -> Self {
        Self {
            backend,
            state,
            preferred,
            resolving: Mutex::new(()),
        }
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn preferred(&self) -> &[String] {
        &self.preferred
    }

    /// The sticky model, resolving it from the backend catalog on first use.
    pub async fn resolve(&self) -> Result<String> {
        if let Some(model) = self.state.current().await {
            return Ok(model);
        }

        let _guard = self.resolving.lock().await;
        if let Some(model) = self.state.current().await {
            return Ok(model);
        }

        let available = self.backend.list_models().await?;
        let chosen =
            select_model(&available, &self.preferred, None).ok_or(Error::NoModelAvailable)?;
        tracing::info!(model = %chosen, available = available.len(), "completion model resolved");
        self.state.set(chosen.clone()).await;
        Ok(chosen)
    }

    /// Pick a model other than `failed` from a fresh catalog listing.
    ///
    /// The sticky state is not touched; the caller commits the replacement
    /// once it has actually worked.
    pub async fn replacement_for(&self, failed: &str) -> Result<String> {
        let available = self.backend.list_models().await?;
        let chosen = select_model(&available, &self.preferred, Some(failed))
            .ok_or(Error::NoModelAvailable)?;
        tracing::info!(failed, replacement = %chosen, "completion model replacement selected");
        Ok(chosen)
    }

    /// Catalog listing plus the model resolution would pick right now.
    pub async fn probe(&self) -> Result<(Vec<String>, Option<String>)> {
        let available = self.backend.list_models().await?;
        let chosen = select_model(&available, &self.preferred, None);
        Ok((available, chosen))
    }
}
