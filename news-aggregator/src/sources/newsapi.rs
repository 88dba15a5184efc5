use crate::normalizer::SourcePage;
use crate::traits::SourceAdapter;
use crate::types::{AggregatorError, ArticleQuery, Endpoint, FetchConfig, NewsSource, PageCursor, QueryParams, Result, TransportRequest};
use serde::{Deserialize, Serialize};

/// Page size NewsAPI assumes when the request does not name one.
pub const DEFAULT_PAGE_SIZE: u64 = 20;
const FALLBACK_QUERY: &str = "news";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsApiResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub articles: Option<Vec<NewsApiArticle>>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsApiArticle {
    #[serde(default)]
    pub source: Option<NewsApiSourceRef>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsApiSourceRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// More pages exist while the page after `pages_fetched` is within
/// `ceil(total_results / page_size)`.
pub fn newsapi_has_more(total_results: u64, page_size: u64, pages_fetched: usize) -> bool {
    let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
    let total_pages = total_results.div_ceil(page_size);
    let next_page = u64::try_from(pages_fetched).map_or(u64::MAX, |n| n.saturating_add(1));
    total_pages > 0 && next_page <= total_pages
}

/// Keyword search against NewsAPI's `/everything` endpoint.
///
/// NewsAPI has no category concept, so categories never reach its parameters.
/// A blank keyword is replaced by a generic query because the endpoint rejects
/// requests without one.
pub struct NewsApiAdapter {
    endpoint: Endpoint,
    api_key: String,
}

impl NewsApiAdapter {
    pub fn new(endpoint: Endpoint, api_key: impl Into<String>) -> Self {
        Self { endpoint, api_key: api_key.into() }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.endpoints.newsapi.clone(), config.api_keys.newsapi.clone())
    }
}

impl SourceAdapter for NewsApiAdapter {
    fn source(&self) -> NewsSource {
        NewsSource::NewsApi
    }

    fn build_params(&self, query: &ArticleQuery) -> QueryParams {
        let mut params = QueryParams::new();
        let keyword = query.keyword.trim();
        let q = if keyword.is_empty() { FALLBACK_QUERY } else { keyword };
        params.insert("q".to_string(), q.to_string());
        if let Some(page_size) = query.page_size {
            params.insert("pageSize".to_string(), page_size.to_string());
        }
        if let Some(from) = query.start_date.as_deref().filter(|d| !d.is_empty()) {
            params.insert("from".to_string(), from.to_string());
        }
        if let Some(to) = query.end_date.as_deref().filter(|d| !d.is_empty()) {
            params.insert("to".to_string(), to.to_string());
        }
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
            .param("apiKey", &self.api_key)
    }

    fn parse_page(&self, body: &str) -> Result<SourcePage> {
        let response: NewsApiResponse = serde_json::from_str(body).map_err(|e| AggregatorError::MalformedResponse {
            provider: NewsSource::NewsApi,
            message: e.to_string(),
        })?;
        if response.status == "error" {
            return Err(AggregatorError::MalformedResponse {
                provider: NewsSource::NewsApi,
                message: response.message.unwrap_or_else(|| "error status without message".to_string()),
            });
        }
        Ok(SourcePage::NewsApi(response))
    }

    fn next_cursor(&self, params: &QueryParams, last_page: &SourcePage, pages_fetched: usize) -> Option<PageCursor> {
        let SourcePage::NewsApi(page) = last_page else {
            return None;
        };
        let page_size = params
            .get("pageSize")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let next = u32::try_from(pages_fetched).ok()?.checked_add(1)?;
        newsapi_has_more(page.total_results, page_size, pages_fetched).then_some(PageCursor(next))
    }
}
