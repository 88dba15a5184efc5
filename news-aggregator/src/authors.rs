use crate::cache::ResponseCache;
use crate::normalizer::SourcePage;
use std::collections::BTreeSet;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Distinct, trimmed, non-empty author names across `pages`, sorted.
/// Deduplication is case-sensitive.
pub fn extract_authors<'a>(pages: impl IntoIterator<Item = &'a SourcePage>) -> Vec<String> {
    let mut authors = BTreeSet::new();
    for page in pages {
        for article in page.articles() {
            if let Some(name) = article.author_name() {
                authors.insert(name.to_string());
            }
        }
    }
    authors.into_iter().collect()
}

/// Author list memoized on the cache version.
#[derive(Debug, Default)]
pub struct AuthorFacets {
    seen_version: Option<u64>,
    authors: Vec<String>,
}

impl AuthorFacets {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&mut self, cache: &ResponseCache) -> Vec<String> {
        let version = cache.version();
        if self.seen_version != Some(version) {
            let pages = cache.pages().await;
            self.authors = extract_authors(pages.iter().map(|p| p.as_ref()));
            self.seen_version = Some(version);
            debug!("Recomputed {} author facets at cache version {}", self.authors.len(), version);
        }
        self.authors.clone()
    }
}

/// Publish the author list every time the cache changes.
pub fn spawn_facet_watcher(cache: ResponseCache) -> (watch::Receiver<Vec<String>>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(Vec::new());
    let mut versions = cache.subscribe();
    let handle = tokio::spawn(async move {
        let mut facets = AuthorFacets::new();
        loop {
            let authors = facets.current(&cache).await;
            tx.send_if_modified(|current| {
                if *current == authors {
                    return false;
                }
                *current = authors;
                true
            });
            if versions.changed().await.is_err() || tx.is_closed() {
                break;
            }
        }
    });
    (rx, handle)
}
