pub mod guardian;
pub mod newsapi;
pub mod nyt;

use std::sync::Arc;

use crate::traits::SourceAdapter;
use crate::types::FetchConfig;

pub use guardian::GuardianAdapter;
pub use newsapi::NewsApiAdapter;
pub use nyt::NytAdapter;

/// One adapter per known source, in merge order.
pub fn default_adapters(config: &FetchConfig) -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(NewsApiAdapter::from_config(config)),
        Arc::new(GuardianAdapter::from_config(config)),
        Arc::new(NytAdapter::from_config(config)),
    ]
}
