use crate::normalizer::SourcePage;
use crate::types::{AggregatorError, ArticleQuery, HttpTransport, NewsSource, PageCursor, QueryParams, Result, TransportRequest};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Everything that differs between upstream providers: how a query intent maps
/// onto request parameters, how a response body is decoded, and how the next
/// page is located.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> NewsSource;

    /// Effective upstream parameters for `query`, excluding pagination and
    /// credentials. These double as the cache key, so a filter change that does
    /// not alter them must not invalidate anything for this source.
    fn build_params(&self, query: &ArticleQuery) -> QueryParams;

    /// Cursor of the first page for a fresh parameter set.
    fn initial_cursor(&self) -> PageCursor;

    /// Full request for one page, credentials included.
    fn build_request(&self, params: &QueryParams, cursor: PageCursor) -> TransportRequest;

    /// Decode a successful response body.
    fn parse_page(&self, body: &str) -> Result<SourcePage>;

    /// Where the next page lives after `last_page`, or `None` once the upstream
    /// reports no more results. `pages_fetched` counts `last_page` itself.
    fn next_cursor(&self, params: &QueryParams, last_page: &SourcePage, pages_fetched: usize) -> Option<PageCursor>;

    async fn fetch_page(
        &self,
        transport: &dyn HttpTransport,
        params: &QueryParams,
        cursor: PageCursor,
        cancel: CancellationToken,
    ) -> Result<SourcePage> {
        let request = self.build_request(params, cursor);
        debug!("Requesting {} page {} from {}{}", self.source(), cursor, request.base_url, request.path);

        let body = transport
            .request(request, cancel)
            .await
            .map_err(|e| AggregatorError::from_transport(self.source(), e))?;

        self.parse_page(&body)
    }
}
