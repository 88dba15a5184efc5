use crate::types::{Article, FilterState};
use crate::utils::time::{end_of_day, parse_calendar_date, parse_published_at, start_of_day};
use chrono::{DateTime, Utc};

/// Client-side filter compiled once from a [`FilterState`].
///
/// Every predicate is permissive when its input is empty. A date bound that
/// does not parse is ignored. An article whose publication date does not parse
/// is excluded as soon as any date bound is active, and kept otherwise.
#[derive(Debug, Clone)]
pub struct ArticleFilter {
    keyword: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    authors: Vec<String>,
}

impl ArticleFilter {
    pub fn new(state: &FilterState) -> Self {
        let keyword = (!state.keyword.trim().is_empty()).then(|| state.keyword.to_lowercase());
        let start = state
            .start_date
            .as_deref()
            .and_then(parse_calendar_date)
            .map(start_of_day);
        let end = state
            .end_date
            .as_deref()
            .and_then(parse_calendar_date)
            .map(end_of_day);
        let authors = state
            .authors
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_lowercase)
            .collect();
        Self { keyword, start, end, authors }
    }

    pub fn matches(&self, article: &Article) -> bool {
        self.matches_keyword(article) && self.matches_dates(article) && self.matches_author(article)
    }

    /// Keep matching articles, preserving order.
    pub fn apply(&self, articles: Vec<Article>) -> Vec<Article> {
        articles.into_iter().filter(|a| self.matches(a)).collect()
    }

    fn matches_keyword(&self, article: &Article) -> bool {
        let Some(keyword) = &self.keyword else {
            return true;
        };
        article.title.to_lowercase().contains(keyword.as_str())
            || article.description.to_lowercase().contains(keyword.as_str())
    }

    fn matches_dates(&self, article: &Article) -> bool {
        if self.start.is_none() && self.end.is_none() {
            return true;
        }
        let Some(published) = parse_published_at(&article.published_at) else {
            return false;
        };
        self.start.map_or(true, |start| published >= start) && self.end.map_or(true, |end| published <= end)
    }

    fn matches_author(&self, article: &Article) -> bool {
        if self.authors.is_empty() {
            return true;
        }
        let Some(author) = article.author_name() else {
            return false;
        };
        let author = author.to_lowercase();
        self.authors.iter().any(|wanted| author.contains(wanted.as_str()))
    }
}

pub fn filter_articles(articles: Vec<Article>, state: &FilterState) -> Vec<Article> {
    ArticleFilter::new(state).apply(articles)
}
