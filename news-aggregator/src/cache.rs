use crate::normalizer::SourcePage;
use crate::types::{Article, NewsSource, PageCursor, QueryParams};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: NewsSource,
    pub params: QueryParams,
}

impl CacheKey {
    pub fn new(source: NewsSource, params: QueryParams) -> Self {
        Self { source, params }
    }
}

/// Every page fetched so far for one parameter set, in fetch order.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pages: BTreeMap<usize, Arc<SourcePage>>,
    next_cursor: Option<PageCursor>,
    updated_at: Instant,
}

impl CacheEntry {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> impl Iterator<Item = &SourcePage> {
        self.pages.values().map(|page| page.as_ref())
    }

    pub fn next_cursor(&self) -> Option<PageCursor> {
        self.next_cursor
    }

    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    pub fn articles(&self) -> Vec<Article> {
        self.pages().flat_map(SourcePage::articles).collect()
    }
}

/// Responses keyed by source and effective parameters.
///
/// Clones share storage. Every mutation bumps a version counter that
/// subscribers can watch to recompute derived data.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    version: Arc<watch::Sender<u64>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        let (version, _rx) = watch::channel(0);
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            version: Arc::new(version),
            ttl,
        }
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.updated_at.elapsed() > self.ttl
    }

    /// Look up an entry, evicting it first if it outlived the TTL.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if !self.is_expired(entry) => return Some(entry.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| self.is_expired(e)) {
            debug!("Evicting expired {} cache entry", key.source);
            entries.remove(key);
            drop(entries);
            self.bump();
            return None;
        }
        entries.get(key).cloned()
    }

    /// Store the page fetched into `slot`. A later write to the same slot wins.
    pub async fn store_page(&self, key: CacheKey, slot: usize, page: SourcePage, next_cursor: Option<PageCursor>) {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(key).or_insert_with(|| CacheEntry {
            pages: BTreeMap::new(),
            next_cursor: None,
            updated_at: Instant::now(),
        });
        entry.pages.insert(slot, Arc::new(page));
        entry.next_cursor = next_cursor;
        entry.updated_at = Instant::now();
        drop(entries);
        self.bump();
    }

    /// Drop one parameter set. The aggregator only ever invalidates wholesale;
    /// this is for embedders that refresh a single source.
    pub async fn invalidate(&self, key: &CacheKey) {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            self.bump();
        }
    }

    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        drop(entries);
        debug!("Invalidated {} cache entries", count);
        self.bump();
    }

    /// All live pages across every key. Expired entries are skipped, not evicted.
    pub async fn pages(&self) -> Vec<Arc<SourcePage>> {
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|entry| !self.is_expired(entry))
            .flat_map(|entry| entry.pages.values().cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
