mod cli;

use std::sync::Arc;

use clap::Parser;
use interfaces::baseline::{InMemoryPreferenceStore, RecordingNotificationSink};
use interfaces::state::JsonFilePreferenceStore;
use news_aggregator::utils::time::{format_date_range, parse_date_range};
use news_aggregator::{AggregateView, FetchConfig, Fetcher, NewsAggregator, PreferenceStore, UserPreferences};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    info!("Starting news aggregator");

    let mut config = FetchConfig::from_env();
    config.page_size = args.page_size;
    if let Some(key) = args.newsapi_api_key.clone() {
        config.api_keys.newsapi = key;
    }
    if let Some(key) = args.guardian_api_key.clone() {
        config.api_keys.guardian = key;
    }
    if let Some(key) = args.nytimes_api_key.clone() {
        config.api_keys.nyt = key;
    }
    debug!(?config, "Effective configuration");

    let store: Box<dyn PreferenceStore> = match &args.preferences {
        Some(path) => Box::new(JsonFilePreferenceStore::open(path).await?),
        None => Box::new(InMemoryPreferenceStore::default()),
    };

    let notifier = Arc::new(RecordingNotificationSink::new());
    let transport = Arc::new(Fetcher::new(&config)?);
    let aggregator = NewsAggregator::from_store(&config, transport, notifier.clone(), store.as_ref()).await?;

    apply_cli_filters(&aggregator, &args).await;

    if args.save_preferences {
        let filter = aggregator.filter_state().await;
        let preferences = UserPreferences {
            sources: filter.sources,
            categories: filter.categories,
            authors: filter.authors,
        };
        store.save(&preferences).await?;
    }

    aggregator.load().await;
    for _ in 1..args.pages {
        if !aggregator.view().await.has_next_page {
            break;
        }
        aggregator.fetch_next_page().await;
    }

    let view = aggregator.view().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        let filter = aggregator.filter_state().await;
        let range = format_date_range(filter.start_date.as_deref(), filter.end_date.as_deref());
        if !range.is_empty() {
            println!("Published {}\n", range);
        }
        print_view(&view);
    }

    if args.list_authors {
        let authors = aggregator.author_facets().await;
        println!("\nAuthors ({}):", authors.len());
        for author in authors {
            println!("  {}", author);
        }
    }

    info!("Finished with {} failure notices", notifier.notices().len());
    Ok(())
}

async fn apply_cli_filters(aggregator: &NewsAggregator, args: &Cli) {
    if !args.keyword.trim().is_empty() {
        aggregator.set_keyword(args.keyword.clone()).await;
    }
    if !args.categories.is_empty() {
        aggregator.set_categories(args.categories.clone()).await;
    }
    if !args.sources.is_empty() {
        aggregator.set_sources(args.sources.clone()).await;
    }
    if !args.authors.is_empty() {
        aggregator.set_authors(args.authors.clone()).await;
    }

    let (from, to) = match &args.range {
        Some(range) => match parse_date_range(range) {
            Some((start, end)) => (Some(start), Some(end)),
            None => {
                warn!("Ignoring unparsable date range {:?}", range);
                (None, None)
            }
        },
        None => (args.from.clone(), args.to.clone()),
    };
    if from.is_some() || to.is_some() {
        aggregator.set_date_range(from, to).await;
    }
}

fn print_view(view: &AggregateView) {
    for article in &view.articles {
        let author = article.author_name().unwrap_or("unknown author");
        println!("[{}] {} ({})", article.source.display_name(), article.title, article.published_at);
        println!("    {} - {}", author, article.url);
        if !article.description.is_empty() {
            println!("    {}", article.description);
        }
    }

    let counts: Vec<String> = view
        .counts
        .iter()
        .map(|(source, count)| format!("{}: {}", source.display_name(), count))
        .collect();
    println!("\n{} articles ({})", view.articles.len(), counts.join(", "));
    if view.has_next_page {
        println!("More pages available.");
    }
    for error in &view.errors {
        eprintln!("{}: {}", error.source.display_name(), error.message);
    }
}
