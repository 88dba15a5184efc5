use crate::normalizer::SourcePage;
use crate::traits::SourceAdapter;
use crate::types::{AggregatorError, ArticleQuery, Endpoint, FetchConfig, NewsSource, PageCursor, QueryParams, Result, TransportRequest};
use serde::{Deserialize, Serialize};

const SHOW_FIELDS: &str = "trailText,body,byline";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianResponse {
    pub response: GuardianResponseBody,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianResponseBody {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub start_index: u64,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<GuardianArticle>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianArticle {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub web_title: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub web_publication_date: Option<String>,
    #[serde(default)]
    pub fields: Option<GuardianFields>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianFields {
    #[serde(default)]
    pub trail_text: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub byline: Option<String>,
}

pub fn guardian_has_more(current_page: u32, pages: u32) -> bool {
    current_page < pages
}

/// Content API search. Categories map onto Guardian sections, ORed with `|`.
pub struct GuardianAdapter {
    endpoint: Endpoint,
    api_key: String,
}

impl GuardianAdapter {
    pub fn new(endpoint: Endpoint, api_key: impl Into<String>) -> Self {
        Self { endpoint, api_key: api_key.into() }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.endpoints.guardian.clone(), config.api_keys.guardian.clone())
    }
}

impl SourceAdapter for GuardianAdapter {
    fn source(&self) -> NewsSource {
        NewsSource::Guardian
    }

    fn build_params(&self, query: &ArticleQuery) -> QueryParams {
        let mut params = QueryParams::new();
        let keyword = query.keyword.trim();
        if !keyword.is_empty() {
            params.insert("q".to_string(), keyword.to_string());
        }
        if !query.categories.is_empty() {
            params.insert("section".to_string(), query.categories.join("|"));
        }
        if let Some(page_size) = query.page_size {
            params.insert("page-size".to_string(), page_size.to_string());
        }
        if let Some(from) = query.start_date.as_deref().filter(|d| !d.is_empty()) {
            params.insert("from-date".to_string(), from.to_string());
        }
        if let Some(to) = query.end_date.as_deref().filter(|d| !d.is_empty()) {
            params.insert("to-date".to_string(), to.to_string());
        }
        params.insert("show-fields".to_string(), SHOW_FIELDS.to_string());
        params
    }

    fn initial_cursor(&self) -> PageCursor {
        PageCursor(1)
    }

    fn build_request(&self, params: &QueryParams, cursor: PageCursor) -> TransportRequest {
        let mut request = TransportRequest::get(&self.endpoint.base_url, &self.endpoint.path)
            .header("accept", "application/json");
        for (key, value) in params {
            request = request.param(key, value);
        }
        request
            .param("page", cursor.to_string())
            .param("api-key", &self.api_key)
    }

    fn parse_page(&self, body: &str) -> Result<SourcePage> {
        let response: GuardianResponse = serde_json::from_str(body).map_err(|e| AggregatorError::MalformedResponse {
            provider: NewsSource::Guardian,
            message: e.to_string(),
        })?;
        if response.response.status == "error" {
            return Err(AggregatorError::MalformedResponse {
                provider: NewsSource::Guardian,
                message: response.response.message.unwrap_or_else(|| "error status without message".to_string()),
            });
        }
        Ok(SourcePage::Guardian(response))
    }

    fn next_cursor(&self, _params: &QueryParams, last_page: &SourcePage, _pages_fetched: usize) -> Option<PageCursor> {
        let SourcePage::Guardian(page) = last_page else {
            return None;
        };
        let body = &page.response;
        let next = body.current_page.checked_add(1)?;
        guardian_has_more(body.current_page, body.pages).then_some(PageCursor(next))
    }
}
