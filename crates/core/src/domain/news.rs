use serde::{Deserialize, Serialize};

/// Image value used when an item carries no media of its own.
pub const PLACEHOLDER_IMAGE: &str = "/img/news-placeholder.svg";

/// One normalized headline. Items are unique by `link`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub source: String,
    pub title: String,
    pub description: String,
    pub link: String,
    #[serde(rename = "publishedAtEpochMillis")]
    pub published_at_millis: i64,
    pub image: String,
    pub domain: String,
}

impl NewsItem {
    /// Case-insensitive substring match against title, description, source or domain.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        [&self.title, &self.description, &self.source, &self.domain]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsEnvelope {
    pub items: Vec<NewsItem>,
}
