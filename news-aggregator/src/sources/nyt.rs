use crate::normalizer::SourcePage;
use crate::traits::SourceAdapter;
use crate::types::{AggregatorError, ArticleQuery, Endpoint, FetchConfig, NewsSource, PageCursor, QueryParams, Result, TransportRequest};
use crate::utils::time::compact_date;
use serde::{Deserialize, Serialize};

/// Article Search always returns pages of ten.
pub const PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NytResponse {
    #[serde(default)]
    pub status: String,
    pub response: NytResponseBody,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NytResponseBody {
    #[serde(default)]
    pub docs: Option<Vec<NytDoc>>,
    #[serde(default)]
    pub meta: Option<NytMeta>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NytMeta {
    #[serde(default)]
    pub hits: u64,
    #[serde(default)]
    pub offset: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NytDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub web_url: String,
    pub pub_date: String,
    #[serde(default)]
    pub headline: Option<NytHeadline>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub byline: Option<NytByline>,
    #[serde(default)]
    pub news_desk: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NytHeadline {
    #[serde(default)]
    pub main: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NytByline {
    #[serde(default)]
    pub original: Option<String>,
}

pub fn nyt_has_more(offset: u64, hits: u64) -> bool {
    offset.saturating_add(PAGE_SIZE) < hits
}

/// Lucene-style filter restricting results to the given news desks.
pub fn news_desk_filter(categories: &[String]) -> Option<String> {
    match categories {
        [] => None,
        [single] => Some(format!("news_desk:(\"{}\")", single)),
        many => {
            let desks: Vec<String> = many.iter().map(|c| format!("\"{}\"", c)).collect();
            Some(format!("news_desk:({})", desks.join(" OR ")))
        }
    }
}

/// Article Search API. Pages are zero-based indexes rather than offsets.
pub struct NytAdapter {
    endpoint: Endpoint,
    api_key: String,
}

impl NytAdapter {
    pub fn new(endpoint: Endpoint, api_key: impl Into<String>) -> Self {
        Self { endpoint, api_key: api_key.into() }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.endpoints.nyt.clone(), config.api_keys.nyt.clone())
    }
}

impl SourceAdapter for NytAdapter {
    fn source(&self) -> NewsSource {
        NewsSource::Nyt
    }

    fn build_params(&self, query: &ArticleQuery) -> QueryParams {
        let mut params = QueryParams::new();
        let keyword = query.keyword.trim();
        if !keyword.is_empty() {
            params.insert("q".to_string(), keyword.to_string());
        }
        if let Some(fq) = news_desk_filter(&query.categories) {
            params.insert("fq".to_string(), fq);
        }
        if let Some(begin) = query.start_date.as_deref().filter(|d| !d.is_empty()) {
            params.insert("begin_date".to_string(), compact_date(begin));
        }
        if let Some(end) = query.end_date.as_deref().filter(|d| !d.is_empty()) {
            params.insert("end_date".to_string(), compact_date(end));
        }
        params
    }

    fn initial_cursor(&self) -> PageCursor {
        PageCursor(0)
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
        let response: NytResponse = serde_json::from_str(body).map_err(|e| AggregatorError::MalformedResponse {
            provider: NewsSource::Nyt,
            message: e.to_string(),
        })?;
        Ok(SourcePage::Nyt(response))
    }

    fn next_cursor(&self, _params: &QueryParams, last_page: &SourcePage, pages_fetched: usize) -> Option<PageCursor> {
        let SourcePage::Nyt(page) = last_page else {
            return None;
        };
        let meta = page.response.meta.as_ref()?;
        let next = u32::try_from(pages_fetched).ok()?;
        nyt_has_more(meta.offset, meta.hits).then_some(PageCursor(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> NytAdapter {
        NytAdapter::new(Endpoint::new("http://nyt.test", "/articlesearch.json"), "k")
    }

    #[test]
    fn has_more_boundaries() {
        assert!(!nyt_has_more(0, 10));
        assert!(nyt_has_more(0, 11));
        assert!(nyt_has_more(10, 21));
        assert!(!nyt_has_more(10, 20));
        assert!(!nyt_has_more(u64::MAX, u64::MAX));
        assert!(!nyt_has_more(u64::MAX - 5, u64::MAX));
    }

    #[test]
    fn news_desk_filter_shapes() {
        assert_eq!(news_desk_filter(&[]), None);
        assert_eq!(news_desk_filter(&["Sports".into()]).as_deref(), Some(r#"news_desk:("Sports")"#));
        assert_eq!(
            news_desk_filter(&["Sports".into(), "Science".into()]).as_deref(),
            Some(r#"news_desk:("Sports" OR "Science")"#)
        );
    }

    #[test]
    fn dates_are_sent_without_dashes() {
        let adapter = adapter();
        let params = adapter.build_params(&ArticleQuery {
            start_date: Some("2024-01-01".into()),
            end_date: Some("2024-01-31".into()),
            page_size: Some(25),
            ..Default::default()
        });
        let request = adapter.build_request(&params, adapter.initial_cursor());
        assert_eq!(request.query_value("begin_date"), Some("20240101"));
        assert_eq!(request.query_value("end_date"), Some("20240131"));
        assert_eq!(request.query_value("page"), Some("0"));
        assert_eq!(request.query_value("api-key"), Some("k"));
        assert_eq!(request.query_value("pageSize"), None);
    }

    #[test]
    fn doc_without_id_is_malformed() {
        let body = r#"{"status":"OK","response":{"docs":[{"web_url":"u","pub_date":"d"}],"meta":{"hits":1,"offset":0}}}"#;
        let err = adapter().parse_page(body).unwrap_err();
        assert!(matches!(err, AggregatorError::MalformedResponse { provider: NewsSource::Nyt, .. }));
    }

    #[test]
    fn next_cursor_is_the_number_of_pages_fetched() {
        let adapter = adapter();
        let body = r#"{"status":"OK","response":{"docs":[],"meta":{"hits":35,"offset":10}}}"#;
        let page = adapter.parse_page(body).unwrap();
        assert_eq!(adapter.next_cursor(&QueryParams::new(), &page, 2), Some(PageCursor(2)));

        let no_meta = adapter.parse_page(r#"{"status":"OK","response":{"docs":null,"meta":null}}"#).unwrap();
        assert_eq!(adapter.next_cursor(&QueryParams::new(), &no_meta, 1), None);
    }

    #[test]
    fn extreme_meta_ends_pagination() {
        let adapter = adapter();
        let body = format!(
            r#"{{"status":"OK","response":{{"docs":[],"meta":{{"hits":{},"offset":{}}}}}}}"#,
            u64::MAX,
            u64::MAX
        );
        let page = adapter.parse_page(&body).unwrap();
        assert_eq!(adapter.next_cursor(&QueryParams::new(), &page, 1), None);

        let body = r#"{"status":"OK","response":{"docs":[],"meta":{"hits":100,"offset":0}}}"#;
        let page = adapter.parse_page(body).unwrap();
        assert_eq!(adapter.next_cursor(&QueryParams::new(), &page, usize::MAX), None);
    }
}
