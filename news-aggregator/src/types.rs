use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
// Use the interfaces crate for the shared vocabulary and collaborator contracts
pub use interfaces::defs::{NewsSource, UnknownSource, UserPreferences};
pub use interfaces::defs::{HttpTransport, TransportError, TransportRequest};
pub use interfaces::defs::{NotificationSink, PreferenceStore, SourceFailureNotice};

/// The single article shape every source is normalized into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub image_url: Option<String>,
    /// Passed through from upstream untouched. Parsed lazily when filtering.
    pub published_at: String,
    pub source: NewsSource,
    pub author: Option<String>,
}

impl Article {
    /// The author if one is present and not blank.
    pub fn author_name(&self) -> Option<&str> {
        self.author.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }
}

/// The user's current filter. Empty lists mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterState {
    pub keyword: String,
    pub categories: Vec<String>,
    pub sources: Vec<NewsSource>,
    pub authors: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl FilterState {
    pub fn from_preferences(preferences: &UserPreferences) -> Self {
        let mut state = Self::default();
        state.reset_to(preferences);
        state
    }

    /// Re-seed from preferences, clearing keyword and dates.
    pub fn reset_to(&mut self, preferences: &UserPreferences) {
        self.keyword.clear();
        self.start_date = None;
        self.end_date = None;
        self.sources = preferences.sources.clone();
        self.categories = preferences.categories.clone();
        self.authors = preferences.authors.clone();
    }

    pub fn is_source_active(&self, source: NewsSource) -> bool {
        self.sources.is_empty() || self.sources.contains(&source)
    }

    pub fn active_sources(&self) -> Vec<NewsSource> {
        NewsSource::ALL
            .into_iter()
            .filter(|s| self.is_source_active(*s))
            .collect()
    }

    pub fn has_active_filters(&self) -> bool {
        !self.keyword.trim().is_empty()
            || !self.categories.is_empty()
            || !self.sources.is_empty()
            || !self.authors.is_empty()
            || self.start_date.is_some()
            || self.end_date.is_some()
    }

    pub fn query(&self, page_size: u32) -> ArticleQuery {
        ArticleQuery {
            keyword: self.keyword.clone(),
            categories: self.categories.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            page_size: Some(page_size),
        }
    }
}

/// Source-agnostic query intent handed to each adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    pub keyword: String,
    pub categories: Vec<String>,
    /// `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`
    pub end_date: Option<String>,
    pub page_size: Option<u32>,
}

/// Effective upstream parameters for one source, without pagination or credentials.
/// Two equal maps address the same cached result set.
pub type QueryParams = BTreeMap<String, String>;

/// Opaque page position. Its meaning belongs to the adapter that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageCursor(pub u32);

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    pub path: String,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), path: path.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub newsapi: Endpoint,
    pub guardian: Endpoint,
    pub nyt: Endpoint,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            newsapi: Endpoint::new("https://newsapi.org/v2", "/everything"),
            guardian: Endpoint::new("https://content.guardianapis.com", "/search"),
            nyt: Endpoint::new("https://api.nytimes.com/svc/search/v2", "/articlesearch.json"),
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    pub newsapi: String,
    pub guardian: String,
    pub nyt: String,
}

impl ApiKeys {
    pub fn for_source(&self, source: NewsSource) -> &str {
        match source {
            NewsSource::NewsApi => &self.newsapi,
            NewsSource::Guardian => &self.guardian,
            NewsSource::Nyt => &self.nyt,
        }
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(key: &str) -> &'static str {
            if key.is_empty() { "<unset>" } else { "<redacted>" }
        }
        f.debug_struct("ApiKeys")
            .field("newsapi", &redact(&self.newsapi))
            .field("guardian", &redact(&self.guardian))
            .field("nyt", &redact(&self.nyt))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub page_size: u32,
    pub cache_ttl_seconds: u64,
    pub endpoints: Endpoints,
    pub api_keys: ApiKeys,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "News-Aggregator/1.0".to_string(),
            timeout_seconds: 30,
            page_size: 10,
            cache_ttl_seconds: 24 * 60 * 60,
            endpoints: Endpoints::default(),
            api_keys: ApiKeys::default(),
        }
    }
}

impl FetchConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` knows. Blank values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.api_keys = ApiKeys {
            newsapi: get("NEWSAPI_API_KEY").unwrap_or_default(),
            guardian: get("GUARDIAN_API_KEY").unwrap_or_default(),
            nyt: get("NYTIMES_API_KEY").unwrap_or_default(),
        };
        if let Some(base) = get("NEWSAPI_BASE_URL") {
            config.endpoints.newsapi.base_url = base;
        }
        if let Some(base) = get("GUARDIAN_BASE_URL") {
            config.endpoints.guardian.base_url = base;
        }
        if let Some(base) = get("NYTIMES_BASE_URL") {
            config.endpoints.nyt.base_url = base;
        }
        if let Some(size) = get("NEWS_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            config.page_size = size;
        }
        config
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("network error talking to {provider}: {message}")]
    Network { provider: NewsSource, message: String },

    #[error("{provider} returned HTTP {status}: {message}")]
    Upstream { provider: NewsSource, status: u16, message: String },

    #[error("request to {provider} was canceled")]
    Canceled { provider: NewsSource },

    #[error("malformed response from {provider}: {message}")]
    MalformedResponse { provider: NewsSource, message: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AggregatorError {
    pub fn from_transport(provider: NewsSource, error: TransportError) -> Self {
        match error {
            TransportError::Network(message) => AggregatorError::Network { provider, message },
            TransportError::Status { status, body } => AggregatorError::Upstream {
                provider,
                status,
                message: crate::utils::text::truncate_chars(body.trim(), 200),
            },
            TransportError::Canceled => AggregatorError::Canceled { provider },
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, AggregatorError::Canceled { .. })
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
