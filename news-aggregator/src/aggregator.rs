use crate::authors::AuthorFacets;
use crate::cache::ResponseCache;
use crate::feed::{FeedSnapshot, FetchOutcome, SourceFeed};
use crate::filter::filter_articles;
use crate::sources::default_adapters;
use crate::traits::SourceAdapter;
use crate::types::{Article, FetchConfig, FilterState, HttpTransport, NewsSource, NotificationSink, PreferenceStore, Result, SourceFailureNotice, UserPreferences};
use crate::utils::time::parse_calendar_date;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The only failure text ever shown to users. Details stay in the logs.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to load articles";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceError {
    pub source: NewsSource,
    pub message: String,
}

/// Merged, filtered state across every active source.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateView {
    pub articles: Vec<Article>,
    pub is_loading: bool,
    pub is_refetching: bool,
    pub has_next_page: bool,
    pub errors: Vec<SourceError>,
    /// Post-filter article counts for every known source.
    pub counts: BTreeMap<NewsSource, usize>,
}

impl AggregateView {
    pub fn count(&self, source: NewsSource) -> usize {
        self.counts.get(&source).copied().unwrap_or(0)
    }
}

/// Fans a query out to every active source, merges the results in a fixed
/// source order and filters the merged list client-side.
pub struct NewsAggregator {
    feeds: Vec<SourceFeed>,
    cache: ResponseCache,
    filter: RwLock<FilterState>,
    notifier: Arc<dyn NotificationSink>,
    page_size: u32,
    authors: Mutex<AuthorFacets>,
}

impl NewsAggregator {
    pub fn new(
        config: &FetchConfig,
        transport: Arc<dyn HttpTransport>,
        notifier: Arc<dyn NotificationSink>,
        preferences: &UserPreferences,
    ) -> Self {
        let cache = ResponseCache::new(Duration::from_secs(config.cache_ttl_seconds));
        Self::with_adapters(
            default_adapters(config),
            transport,
            notifier,
            cache,
            FilterState::from_preferences(preferences),
            config.page_size,
        )
    }

    pub async fn from_store(
        config: &FetchConfig,
        transport: Arc<dyn HttpTransport>,
        notifier: Arc<dyn NotificationSink>,
        store: &dyn PreferenceStore,
    ) -> anyhow::Result<Self> {
        let preferences = store.load().await?;
        Ok(Self::new(config, transport, notifier, &preferences))
    }

    pub fn with_adapters(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        transport: Arc<dyn HttpTransport>,
        notifier: Arc<dyn NotificationSink>,
        cache: ResponseCache,
        filter: FilterState,
        page_size: u32,
    ) -> Self {
        let mut adapters = adapters;
        adapters.sort_by_key(|a| a.source());
        let feeds = adapters
            .into_iter()
            .map(|adapter| SourceFeed::new(adapter, transport.clone(), cache.clone()))
            .collect();
        Self {
            feeds,
            cache,
            filter: RwLock::new(filter),
            notifier,
            page_size,
            authors: Mutex::new(AuthorFacets::new()),
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn feed(&self, source: NewsSource) -> Option<&SourceFeed> {
        self.feeds.iter().find(|f| f.source() == source)
    }

    pub async fn filter_state(&self) -> FilterState {
        self.filter.read().await.clone()
    }

    pub async fn set_keyword(&self, keyword: impl Into<String>) {
        let keyword = keyword.into();
        self.update_filter(|f| f.keyword = keyword).await;
    }

    pub async fn set_categories(&self, categories: Vec<String>) {
        self.update_filter(|f| f.categories = categories).await;
    }

    pub async fn set_sources(&self, sources: Vec<NewsSource>) {
        self.update_filter(|f| f.sources = sources).await;
    }

    /// Authors only narrow the merged list; no source is refetched.
    pub async fn set_authors(&self, authors: Vec<String>) {
        self.filter.write().await.authors = authors;
    }

    /// Dates are `YYYY-MM-DD`. A blank or unparsable date clears the bound, so
    /// no source is ever sent a date the local filter would ignore.
    pub async fn set_date_range(&self, start_date: Option<String>, end_date: Option<String>) {
        let clean = |d: Option<String>| {
            let d = d?;
            if d.trim().is_empty() {
                return None;
            }
            let parsed = parse_calendar_date(&d);
            if parsed.is_none() {
                warn!("Ignoring invalid date {:?}, expected YYYY-MM-DD", d);
            }
            parsed.map(|day| day.format("%Y-%m-%d").to_string())
        };
        let (start_date, end_date) = (clean(start_date), clean(end_date));
        self.update_filter(|f| {
            f.start_date = start_date;
            f.end_date = end_date;
        })
        .await;
    }

    /// Back to the preference defaults with no keyword or dates.
    pub async fn reset_filters(&self, preferences: &UserPreferences) {
        self.update_filter(|f| f.reset_to(preferences)).await;
    }

    /// Adopt freshly saved preferences: drop everything cached, cancel
    /// outstanding requests and re-seed the filter.
    pub async fn apply_preferences(&self, preferences: &UserPreferences) {
        info!("Applying preferences: {} sources, {} categories", preferences.sources.len(), preferences.categories.len());
        for feed in &self.feeds {
            feed.reset().await;
        }
        self.cache.invalidate_all().await;
        self.update_filter(|f| f.reset_to(preferences)).await;
    }

    /// Re-apply preferences every time the store publishes new ones.
    pub fn watch_preferences(self: Arc<Self>, mut preferences: watch::Receiver<UserPreferences>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while preferences.changed().await.is_ok() {
                let latest = preferences.borrow_and_update().clone();
                self.apply_preferences(&latest).await;
            }
            debug!("Preference store closed");
        })
    }

    async fn update_filter(&self, change: impl FnOnce(&mut FilterState)) {
        let filter = {
            let mut filter = self.filter.write().await;
            change(&mut filter);
            filter.clone()
        };
        self.sync_queries(&filter).await;
    }

    // Inactive sources keep their parameters and cursor untouched.
    async fn sync_queries(&self, filter: &FilterState) {
        let query = filter.query(self.page_size);
        for feed in self.active_feeds(filter) {
            feed.set_query(&query).await;
        }
    }

    fn active_feeds<'a>(&'a self, filter: &FilterState) -> Vec<&'a SourceFeed> {
        self.feeds.iter().filter(|f| filter.is_source_active(f.source())).collect()
    }

    /// Fetch the first page of every active source that has none cached.
    pub async fn load(&self) {
        let filter = self.filter_state().await;
        self.sync_queries(&filter).await;
        let feeds = self.active_feeds(&filter);
        let outcomes = join_all(feeds.iter().map(|f| f.ensure_loaded())).await;
        self.report(&feeds, &outcomes);
    }

    /// Advance every active source that still has pages.
    pub async fn fetch_next_page(&self) {
        let filter = self.filter_state().await;
        let mut feeds = Vec::new();
        for feed in self.active_feeds(&filter) {
            if feed.snapshot().await.has_more {
                feeds.push(feed);
            }
        }
        let outcomes = join_all(feeds.iter().map(|f| f.fetch_next())).await;
        self.report(&feeds, &outcomes);
    }

    fn report(&self, feeds: &[&SourceFeed], outcomes: &[FetchOutcome]) {
        for (feed, outcome) in feeds.iter().zip(outcomes) {
            if *outcome == FetchOutcome::Failed {
                self.notifier.notify(SourceFailureNotice {
                    source: feed.source(),
                    message: GENERIC_FAILURE_MESSAGE.to_string(),
                });
            }
        }
    }

    pub async fn view(&self) -> AggregateView {
        let filter = self.filter_state().await;
        let mut snapshots: Vec<FeedSnapshot> = Vec::new();
        for feed in self.active_feeds(&filter) {
            snapshots.push(feed.snapshot().await);
        }

        let merged: Vec<Article> = snapshots.iter().flat_map(|s| s.articles.iter().cloned()).collect();
        let articles = filter_articles(merged, &filter);

        let mut counts: BTreeMap<NewsSource, usize> = NewsSource::ALL.into_iter().map(|s| (s, 0)).collect();
        for article in &articles {
            *counts.entry(article.source).or_default() += 1;
        }

        let errors = snapshots
            .iter()
            .filter(|s| s.error().is_some())
            .map(|s| SourceError { source: s.source, message: GENERIC_FAILURE_MESSAGE.to_string() })
            .collect();

        AggregateView {
            articles,
            is_loading: snapshots.iter().any(FeedSnapshot::is_loading),
            is_refetching: snapshots.iter().any(FeedSnapshot::is_refetching),
            has_next_page: snapshots.iter().any(|s| s.has_more),
            errors,
            counts,
        }
    }

    /// Distinct authors across everything cached, for every source and query.
    pub async fn author_facets(&self) -> Vec<String> {
        self.authors.lock().await.current(&self.cache).await
    }

    pub async fn has_active_filters(&self) -> bool {
        self.filter.read().await.has_active_filters()
    }
}

/// Build an aggregator talking to the real upstreams.
pub fn build_default(
    config: &FetchConfig,
    notifier: Arc<dyn NotificationSink>,
    preferences: &UserPreferences,
) -> Result<NewsAggregator> {
    let transport = Arc::new(crate::fetcher::Fetcher::new(config)?);
    Ok(NewsAggregator::new(config, transport, notifier, preferences))
}
