use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// One of the upstream article providers the engine knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NewsSource {
    #[serde(rename = "NewsAPI")]
    NewsApi,
    #[serde(rename = "Guardian")]
    Guardian,
    #[serde(rename = "NYT")]
    Nyt,
}

impl NewsSource {
    /// Merge order. Results are always concatenated in this order.
    pub const ALL: [NewsSource; 3] = [NewsSource::NewsApi, NewsSource::Guardian, NewsSource::Nyt];

    pub fn label(self) -> &'static str {
        match self {
            NewsSource::NewsApi => "NewsAPI",
            NewsSource::Guardian => "Guardian",
            NewsSource::Nyt => "NYT",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            NewsSource::NewsApi => "NewsAPI",
            NewsSource::Guardian => "The Guardian",
            NewsSource::Nyt => "The New York Times",
        }
    }
}

impl fmt::Display for NewsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown news source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for NewsSource {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newsapi" | "news-api" => Ok(NewsSource::NewsApi),
            "guardian" | "the-guardian" => Ok(NewsSource::Guardian),
            "nyt" | "nytimes" | "new-york-times" => Ok(NewsSource::Nyt),
            _ => Err(UnknownSource(s.to_owned())),
        }
    }
}

/// Persisted defaults the filter state is seeded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub sources: Vec<NewsSource>,
    pub categories: Vec<String>,
    pub authors: Vec<String>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            sources: NewsSource::ALL.to_vec(),
            categories: vec![],
            authors: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub base_url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl TransportRequest {
    pub fn get(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            query: vec![],
            headers: vec![],
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    // The body is kept for logging but never rendered.
    #[error("HTTP status {status}")]
    Status { status: u16, body: String },
    #[error("request canceled")]
    Canceled,
}

// Object style note:
// Transports are shared between every source feed and may be called
// concurrently. An implementation must resolve to `TransportError::Canceled`
// promptly once `cancel` fires and must not retry on its own.

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn request(&self, request: TransportRequest, cancel: CancellationToken) -> Result<String, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailureNotice {
    pub source: NewsSource,
    pub message: String,
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: SourceFailureNotice);
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<UserPreferences>;
    async fn save(&self, preferences: &UserPreferences) -> anyhow::Result<()>;
    /// Every successful `save` publishes the new value here.
    fn subscribe(&self) -> watch::Receiver<UserPreferences>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_parse_from_labels_and_aliases() {
        assert_eq!("NewsAPI".parse::<NewsSource>(), Ok(NewsSource::NewsApi));
        assert_eq!(" guardian ".parse::<NewsSource>(), Ok(NewsSource::Guardian));
        assert_eq!("NYT".parse::<NewsSource>(), Ok(NewsSource::Nyt));
        assert!("reuters".parse::<NewsSource>().is_err());
    }

    #[test]
    fn sources_serialize_as_labels() {
        let json = serde_json::to_string(&NewsSource::ALL).unwrap();
        assert_eq!(json, r#"["NewsAPI","Guardian","NYT"]"#);
        assert_eq!(NewsSource::Nyt.display_name(), "The New York Times");
        assert_eq!(NewsSource::Guardian.to_string(), "Guardian");
    }

    #[test]
    fn default_preferences_enable_every_source() {
        let prefs = UserPreferences::default();
        assert_eq!(prefs.sources, NewsSource::ALL.to_vec());
        assert!(prefs.categories.is_empty());
        assert!(prefs.authors.is_empty());
    }
}
