use crate::cache::{CacheKey, ResponseCache};
use crate::traits::SourceAdapter;
use crate::types::{AggregatorError, Article, ArticleQuery, HttpTransport, NewsSource, PageCursor, QueryParams};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where a feed stands for its current parameter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    /// Nothing fetched yet.
    Idle,
    /// A request is outstanding. `initial` is true for the first page.
    Fetching { cursor: PageCursor, initial: bool },
    /// At least one page is cached and another one exists.
    Ready { next: PageCursor },
    /// Every page has been fetched.
    Exhausted,
    /// The last request failed. The cursor is untouched so it can be retried.
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched { articles: usize },
    /// Nothing to do: no query yet, already in flight, already loaded or exhausted.
    Skipped,
    /// Superseded by a parameter change or invalidation. Never an error.
    Canceled,
    Failed,
}

#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub source: NewsSource,
    pub status: FeedStatus,
    pub has_more: bool,
    pub articles: Vec<Article>,
}

impl FeedSnapshot {
    pub fn is_loading(&self) -> bool {
        matches!(self.status, FeedStatus::Fetching { initial: true, .. })
    }

    pub fn is_refetching(&self) -> bool {
        matches!(self.status, FeedStatus::Fetching { initial: false, .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FeedStatus::Error { message } => Some(message),
            _ => None,
        }
    }
}

struct InFlight {
    token: CancellationToken,
    cursor: PageCursor,
    initial: bool,
}

impl InFlight {
    // The token is canceled while still registered only when the fetching
    // future was dropped mid-request.
    fn is_abandoned(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Default)]
struct FeedInner {
    params: Option<QueryParams>,
    in_flight: Option<InFlight>,
    error: Option<AggregatorError>,
    // Bumped whenever outstanding work must be discarded on completion.
    generation: u64,
}

impl FeedInner {
    fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.token.cancel();
        }
        self.generation += 1;
    }
}

/// Pagination state machine for one source.
///
/// Pages land in the shared [`ResponseCache`] under the current parameters, so
/// switching back to parameters seen before resumes from what is cached.
pub struct SourceFeed {
    adapter: Arc<dyn SourceAdapter>,
    transport: Arc<dyn HttpTransport>,
    cache: ResponseCache,
    inner: Mutex<FeedInner>,
}

impl SourceFeed {
    pub fn new(adapter: Arc<dyn SourceAdapter>, transport: Arc<dyn HttpTransport>, cache: ResponseCache) -> Self {
        Self {
            adapter,
            transport,
            cache,
            inner: Mutex::new(FeedInner::default()),
        }
    }

    pub fn source(&self) -> NewsSource {
        self.adapter.source()
    }

    fn key(&self, params: &QueryParams) -> CacheKey {
        CacheKey::new(self.source(), params.clone())
    }

    /// Point the feed at `query`. Returns false when the effective parameters
    /// did not change, in which case nothing is canceled or reset.
    pub async fn set_query(&self, query: &ArticleQuery) -> bool {
        let params = self.adapter.build_params(query);
        let mut inner = self.inner.lock().await;
        if inner.params.as_ref() == Some(&params) {
            return false;
        }
        if inner.in_flight.is_some() {
            debug!("{}: canceling in-flight request for superseded parameters", self.source());
        }
        inner.cancel_in_flight();
        inner.error = None;
        inner.params = Some(params);
        info!("{}: parameters changed", self.source());
        true
    }

    /// Cancel outstanding work and forget the last error, keeping the parameters.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.cancel_in_flight();
        inner.error = None;
    }

    pub async fn params(&self) -> Option<QueryParams> {
        self.inner.lock().await.params.clone()
    }

    /// Fetch the first page unless one is already cached.
    pub async fn ensure_loaded(&self) -> FetchOutcome {
        let Some(params) = self.params().await else {
            return FetchOutcome::Skipped;
        };
        if self.cache.get(&self.key(&params)).await.is_some() {
            return FetchOutcome::Skipped;
        }
        self.fetch_next().await
    }

    /// Fetch the page after the last cached one, or the first page when nothing
    /// is cached. At most one request is outstanding per feed.
    ///
    /// Dropping the returned future cancels the request and frees the slot
    /// for the next call.
    pub async fn fetch_next(&self) -> FetchOutcome {
        let (params, cursor, slot, token, generation) = {
            let mut inner = self.inner.lock().await;
            let Some(params) = inner.params.clone() else {
                return FetchOutcome::Skipped;
            };
            match &inner.in_flight {
                Some(in_flight) if !in_flight.is_abandoned() => {
                    debug!("{}: request already in flight", self.source());
                    return FetchOutcome::Skipped;
                }
                Some(_) => {
                    debug!("{}: releasing abandoned request", self.source());
                    inner.in_flight = None;
                }
                None => {}
            }
            let entry = self.cache.get(&self.key(&params)).await;
            let (cursor, slot) = match &entry {
                None => (self.adapter.initial_cursor(), 0),
                Some(entry) => match entry.next_cursor() {
                    Some(cursor) => (cursor, entry.page_count()),
                    None => return FetchOutcome::Skipped,
                },
            };
            let token = CancellationToken::new();
            inner.in_flight = Some(InFlight {
                token: token.clone(),
                cursor,
                initial: entry.is_none(),
            });
            (params, cursor, slot, token, inner.generation)
        };

        let abandon = token.clone().drop_guard();
        let result = self
            .adapter
            .fetch_page(self.transport.as_ref(), &params, cursor, token.clone())
            .await;

        let mut inner = self.inner.lock().await;
        abandon.disarm();
        if inner.generation != generation || token.is_cancelled() {
            debug!("{}: discarding result for page {}", self.source(), cursor);
            return FetchOutcome::Canceled;
        }
        inner.in_flight = None;

        match result {
            Ok(page) => {
                let next = self.adapter.next_cursor(&params, &page, slot + 1);
                let articles = page.article_count();
                self.cache.store_page(self.key(&params), slot, page, next).await;
                inner.error = None;
                info!("{}: page {} brought {} articles (more: {})", self.source(), cursor, articles, next.is_some());
                FetchOutcome::Fetched { articles }
            }
            Err(e) if e.is_canceled() => FetchOutcome::Canceled,
            Err(e) => {
                warn!("{}: page {} failed: {}", self.source(), cursor, e);
                inner.error = Some(e);
                FetchOutcome::Failed
            }
        }
    }

    pub async fn status(&self) -> FeedStatus {
        self.snapshot_parts().await.0
    }

    /// Status plus every cached article for the current parameters.
    pub async fn snapshot(&self) -> FeedSnapshot {
        let (status, has_more, articles) = self.snapshot_parts().await;
        FeedSnapshot {
            source: self.source(),
            status,
            has_more,
            articles,
        }
    }

    async fn snapshot_parts(&self) -> (FeedStatus, bool, Vec<Article>) {
        let inner = self.inner.lock().await;
        let entry = match &inner.params {
            Some(params) => self.cache.get(&self.key(params)).await,
            None => None,
        };
        let has_more = entry.as_ref().is_some_and(|e| e.has_more());
        let articles = entry.as_ref().map(|e| e.articles()).unwrap_or_default();

        let in_flight = inner.in_flight.as_ref().filter(|f| !f.is_abandoned());
        let status = if let Some(in_flight) = in_flight {
            FeedStatus::Fetching { cursor: in_flight.cursor, initial: in_flight.initial }
        } else if let Some(error) = &inner.error {
            FeedStatus::Error { message: error.to_string() }
        } else {
            match entry.as_ref().map(|e| e.next_cursor()) {
                None => FeedStatus::Idle,
                Some(Some(next)) => FeedStatus::Ready { next },
                Some(None) => FeedStatus::Exhausted,
            }
        };
        (status, has_more, articles)
    }
}
