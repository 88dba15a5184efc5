pub mod types;
pub mod traits;
pub mod utils;
pub mod sources;
pub mod normalizer;
pub mod fetcher;
pub mod cache;
pub mod feed;
pub mod filter;
pub mod authors;
pub mod aggregator;

pub use types::*;
pub use traits::SourceAdapter;
pub use fetcher::Fetcher;
pub use normalizer::SourcePage;
pub use cache::{CacheEntry, CacheKey, ResponseCache};
pub use feed::{FeedSnapshot, FeedStatus, FetchOutcome, SourceFeed};
pub use filter::{filter_articles, ArticleFilter};
pub use authors::{extract_authors, spawn_facet_watcher, AuthorFacets};
pub use aggregator::{build_default, AggregateView, NewsAggregator, SourceError, GENERIC_FAILURE_MESSAGE};
