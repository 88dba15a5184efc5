//! Command-line interface for the news aggregator.
//!
//! Every flag narrows the filter seeded from the saved preferences. API keys
//! are read from the environment unless passed explicitly.

use std::path::PathBuf;

use clap::Parser;
use news_aggregator::NewsSource;

/// Search NewsAPI, The Guardian and The New York Times in one go.
///
/// ```sh
/// news-aggregator --keyword climate --category environment --pages 2
/// news-aggregator --source guardian --range "1 Jan, 2024 - 31 Jan, 2024" --json
/// ```
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Free-text keyword
    #[arg(short, long, default_value = "")]
    pub keyword: String,

    /// Category, repeatable. Replaces the saved categories.
    #[arg(short, long = "category")]
    pub categories: Vec<String>,

    /// Source to query (newsapi, guardian, nyt), repeatable. Replaces the saved sources.
    #[arg(short, long = "source")]
    pub sources: Vec<NewsSource>,

    /// Author substring, repeatable. Replaces the saved authors.
    #[arg(short, long = "author")]
    pub authors: Vec<String>,

    /// Start date, YYYY-MM-DD
    #[arg(long)]
    pub from: Option<String>,

    /// End date, YYYY-MM-DD (inclusive)
    #[arg(long)]
    pub to: Option<String>,

    /// Date range as "D MMM, YYYY - D MMM, YYYY"
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub range: Option<String>,

    /// Number of pages to load per source
    #[arg(long, default_value_t = 1)]
    pub pages: u32,

    /// Articles requested per page where the source supports it
    #[arg(long, env = "NEWS_PAGE_SIZE", default_value_t = 10)]
    pub page_size: u32,

    /// Print the aggregate view as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the distinct authors seen so far
    #[arg(long)]
    pub list_authors: bool,

    /// Preferences file (JSON). Defaults apply when it does not exist.
    #[arg(long, env = "NEWS_PREFERENCES_PATH")]
    pub preferences: Option<PathBuf>,

    /// Save the effective sources, categories and authors back to the preferences file
    #[arg(long, requires = "preferences")]
    pub save_preferences: bool,

    /// NewsAPI key
    #[arg(long, env = "NEWSAPI_API_KEY", hide_env_values = true)]
    pub newsapi_api_key: Option<String>,

    /// Guardian Content API key
    #[arg(long, env = "GUARDIAN_API_KEY", hide_env_values = true)]
    pub guardian_api_key: Option<String>,

    /// New York Times Article Search key
    #[arg(long, env = "NYTIMES_API_KEY", hide_env_values = true)]
    pub nytimes_api_key: Option<String>,
}
