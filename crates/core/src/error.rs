//! Error taxonomy shared by every upstream-facing component.
//!
//! Each variant maps to a short, stable reason string (see [`Error::reason`])
//! that the HTTP boundary hands back to callers. Diagnostic detail stays in
//! the logs.

use thiserror::Error;

/// Upper bound on raw upstream body text kept in an error.
pub const SNIPPET_MAX_CHARS: usize = 300;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A credential or setting needed by this operation is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Caller-supplied parameters failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A vendor answered with a non-success HTTP status.
    #[error("{vendor} returned HTTP {status}: {snippet}")]
    Upstream {
        vendor: String,
        status: u16,
        snippet: String,
    },

    /// The bounded wait for an upstream call elapsed.
    #[error("{upstream} timed out")]
    Timeout { upstream: String },

    /// A nominally successful response did not match the expected contract.
    #[error("malformed response from {upstream}: {detail}")]
    MalformedResponse { upstream: String, detail: String },

    /// The per-key minimum interval has not elapsed yet.
    #[error("too many requests for {key}; minimum interval is {interval_ms}ms")]
    RateLimited { key: String, interval_ms: u64 },

    /// The completion backend lists no usable model for this credential.
    #[error("no completion model available")]
    NoModelAvailable,

    /// The completion backend rejected the credential.
    #[error("completion backend rejected the credential")]
    Unauthorized,

    /// The backend no longer serves the requested model.
    #[error("model {model} is no longer available")]
    ModelUnavailable { model: String },

    /// Connection-level failure before any HTTP status was received.
    #[error("network error talking to {upstream}: {detail}")]
    Network { upstream: String, detail: String },

    /// Every configured feed source failed during one aggregation pass.
    #[error("all {failed} news sources failed")]
    AllSourcesFailed { failed: usize },
}

impl Error {
    /// Machine-checkable reason string returned to callers.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::Upstream { .. } => "upstream_error",
            Self::Timeout { .. } => "timeout",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::RateLimited { .. } => "rate_limited",
            Self::NoModelAvailable => "no_model_available",
            Self::Unauthorized => "unauthorized",
            Self::ModelUnavailable { .. } => "model_unavailable",
            Self::Network { .. } => "network_error",
            Self::AllSourcesFailed { .. } => "news_unavailable",
        }
    }

    /// Map a transport error from `reqwest` into the taxonomy.
    ///
    /// The request URL is dropped: some vendors carry credentials in the query.
    pub fn from_transport(upstream: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                upstream: upstream.to_string(),
            };
        }
        Self::Network {
            upstream: upstream.to_string(),
            detail: transport_detail(&err.without_url()),
        }
    }

    pub fn upstream(vendor: &str, status: u16, body: &str) -> Self {
        Self::Upstream {
            vendor: vendor.to_string(),
            status,
            snippet: snippet(body),
        }
    }

    pub fn malformed(upstream: &str, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            upstream: upstream.to_string(),
            detail: detail.into(),
        }
    }
}

/// Display of `err` followed by its source chain, joined with `: `.
fn transport_detail(err: &(dyn std::error::Error + 'static)) -> String {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

/// Truncate an upstream body on a char boundary.
pub fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(SNIPPET_MAX_CHARS) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
