#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use interfaces::baseline::RecordingNotificationSink;
use news_aggregator::{
    ApiKeys, Endpoint, Endpoints, FetchConfig, HttpTransport, NewsAggregator, TransportError, TransportRequest,
    UserPreferences,
};
use serde_json::json;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

pub const NEWSAPI_BASE: &str = "http://newsapi.test/v2";
pub const GUARDIAN_BASE: &str = "http://guardian.test";
pub const NYT_BASE: &str = "http://nyt.test/svc/search/v2";

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config() -> FetchConfig {
    FetchConfig {
        user_agent: "News-Aggregator-Test/1.0".to_string(),
        timeout_seconds: 5,
        page_size: 10,
        cache_ttl_seconds: 3600,
        endpoints: Endpoints {
            newsapi: Endpoint::new(NEWSAPI_BASE, "/everything"),
            guardian: Endpoint::new(GUARDIAN_BASE, "/search"),
            nyt: Endpoint::new(NYT_BASE, "/articlesearch.json"),
        },
        api_keys: ApiKeys {
            newsapi: "newsapi-key".to_string(),
            guardian: "guardian-key".to_string(),
            nyt: "nyt-key".to_string(),
        },
    }
}

pub fn build_aggregator(
    transport: &Arc<ScriptedTransport>,
    preferences: &UserPreferences,
) -> (Arc<NewsAggregator>, Arc<RecordingNotificationSink>) {
    let notifier = Arc::new(RecordingNotificationSink::new());
    let aggregator = NewsAggregator::new(&test_config(), transport.clone(), notifier.clone(), preferences);
    (Arc::new(aggregator), notifier)
}

/// A canned upstream article.
#[derive(Debug, Clone)]
pub struct Story {
    pub title: String,
    pub author: Option<String>,
    pub published_at: String,
}

impl Story {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            author: None,
            published_at: "2024-01-01T10:00:00Z".to_string(),
        }
    }

    pub fn by(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn at(mut self, published_at: &str) -> Self {
        self.published_at = published_at.to_string();
        self
    }

    fn slug(&self) -> String {
        self.title.to_lowercase().replace(' ', "-")
    }
}

pub fn newsapi_body(total_results: u64, stories: &[Story]) -> String {
    let articles: Vec<_> = stories
        .iter()
        .map(|s| {
            json!({
                "source": { "id": null, "name": "Wire" },
                "author": s.author,
                "title": s.title,
                "description": format!("{} in brief", s.title),
                "url": format!("https://newsapi.example/{}", s.slug()),
                "urlToImage": null,
                "publishedAt": s.published_at,
                "content": null
            })
        })
        .collect();
    json!({ "status": "ok", "totalResults": total_results, "articles": articles }).to_string()
}

pub fn guardian_body(current_page: u32, pages: u32, stories: &[Story]) -> String {
    let results: Vec<_> = stories
        .iter()
        .map(|s| {
            json!({
                "id": format!("world/{}", s.slug()),
                "sectionId": "world",
                "webTitle": s.title,
                "webUrl": format!("https://www.theguardian.com/world/{}", s.slug()),
                "webPublicationDate": s.published_at,
                "fields": { "trailText": format!("{} in brief", s.title), "byline": s.author }
            })
        })
        .collect();
    json!({
        "response": {
            "status": "ok",
            "total": stories.len(),
            "currentPage": current_page,
            "pages": pages,
            "results": results
        }
    })
    .to_string()
}

pub fn nyt_body(offset: u64, hits: u64, stories: &[Story]) -> String {
    let docs: Vec<_> = stories
        .iter()
        .map(|s| {
            json!({
                "_id": format!("nyt://article/{}", s.slug()),
                "web_url": format!("https://www.nytimes.com/{}", s.slug()),
                "pub_date": s.published_at,
                "headline": { "main": s.title },
                "snippet": format!("{} in brief", s.title),
                "byline": { "original": s.author }
            })
        })
        .collect();
    json!({
        "status": "OK",
        "response": { "docs": docs, "meta": { "hits": hits, "offset": offset } }
    })
    .to_string()
}

#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Status(u16),
    NetworkDown,
}

/// In-memory stand-in for the upstream APIs, routed by base URL and `page`.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<(String, String), VecDeque<Reply>>>,
    defaults: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<TransportRequest>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reply for every page without a more specific script.
    pub fn default_reply(&self, base: &str, reply: Reply) {
        self.defaults.lock().unwrap().insert(base.to_string(), reply);
    }

    /// Queue a reply for one page. The last queued reply repeats.
    pub fn reply(&self, base: &str, page: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry((base.to_string(), page.to_string()))
            .or_default()
            .push_back(reply);
    }

    /// Park every request to `base` until released or canceled.
    pub fn hold(&self, base: &str) {
        self.gates.lock().unwrap().insert(base.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, base: &str) {
        if let Some(gate) = self.gates.lock().unwrap().remove(base) {
            gate.close();
        }
    }

    pub fn calls(&self) -> Vec<TransportRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, base: &str) -> usize {
        self.calls().iter().filter(|r| r.base_url == base).count()
    }

    pub fn pages_requested(&self, base: &str) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|r| r.base_url == base)
            .map(|r| r.query_value("page").unwrap_or_default().to_string())
            .collect()
    }

    pub fn last_request(&self, base: &str) -> Option<TransportRequest> {
        self.calls().into_iter().filter(|r| r.base_url == base).last()
    }

    pub async fn wait_for_calls(&self, base: &str, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.call_count(base) < count {
            assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {} calls to {}", count, base);
            tokio::task::yield_now().await;
        }
    }

    fn next_reply(&self, base: &str, page: &str) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        if let Some(queue) = replies.get_mut(&(base.to_string(), page.to_string())) {
            if queue.len() > 1 {
                if let Some(reply) = queue.pop_front() {
                    return reply;
                }
            }
            if let Some(reply) = queue.front() {
                return reply.clone();
            }
        }
        drop(replies);
        self.defaults
            .lock()
            .unwrap()
            .get(base)
            .cloned()
            .unwrap_or(Reply::Status(404))
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn request(&self, request: TransportRequest, cancel: CancellationToken) -> Result<String, TransportError> {
        self.calls.lock().unwrap().push(request.clone());

        let gate = self.gates.lock().unwrap().get(&request.base_url).cloned();
        if let Some(gate) = gate {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Canceled),
                _ = gate.acquire() => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(TransportError::Canceled);
        }

        let page = request.query_value("page").unwrap_or_default().to_string();
        match self.next_reply(&request.base_url, &page) {
            Reply::Body(body) => Ok(body),
            Reply::Status(status) => Err(TransportError::Status { status, body: format!("scripted {}", status) }),
            Reply::NetworkDown => Err(TransportError::Network("connection refused".to_string())),
        }
    }
}

/// Every source answers with one page holding `stories`, and no further pages.
pub fn script_single_pages(transport: &ScriptedTransport, newsapi: &[Story], guardian: &[Story], nyt: &[Story]) {
    transport.default_reply(NEWSAPI_BASE, Reply::Body(newsapi_body(newsapi.len() as u64, newsapi)));
    transport.default_reply(GUARDIAN_BASE, Reply::Body(guardian_body(1, 1, guardian)));
    transport.default_reply(NYT_BASE, Reply::Body(nyt_body(0, nyt.len() as u64, nyt)));
}
