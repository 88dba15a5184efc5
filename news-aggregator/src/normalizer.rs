use crate::sources::guardian::{GuardianArticle, GuardianResponse};
use crate::sources::newsapi::{NewsApiArticle, NewsApiResponse};
use crate::sources::nyt::{NytDoc, NytResponse};
use crate::types::{Article, NewsSource};
use crate::utils::text::{first_non_empty, truncate_chars};

/// Characters of Guardian body text used when there is no trail text.
const BODY_EXCERPT_CHARS: usize = 200;

/// One decoded upstream response, kept raw so it can be re-normalized on read.
#[derive(Debug, Clone)]
pub enum SourcePage {
    NewsApi(NewsApiResponse),
    Guardian(GuardianResponse),
    Nyt(NytResponse),
}

impl SourcePage {
    pub fn source(&self) -> NewsSource {
        match self {
            SourcePage::NewsApi(_) => NewsSource::NewsApi,
            SourcePage::Guardian(_) => NewsSource::Guardian,
            SourcePage::Nyt(_) => NewsSource::Nyt,
        }
    }

    pub fn article_count(&self) -> usize {
        match self {
            SourcePage::NewsApi(page) => page.articles.as_ref().map_or(0, Vec::len),
            SourcePage::Guardian(page) => page.response.results.as_ref().map_or(0, Vec::len),
            SourcePage::Nyt(page) => page.response.docs.as_ref().map_or(0, Vec::len),
        }
    }

    /// Upstream order is preserved.
    pub fn articles(&self) -> Vec<Article> {
        match self {
            SourcePage::NewsApi(page) => page.articles.iter().flatten().map(normalize_newsapi_article).collect(),
            SourcePage::Guardian(page) => page.response.results.iter().flatten().map(normalize_guardian_article).collect(),
            SourcePage::Nyt(page) => page.response.docs.iter().flatten().map(normalize_nyt_article).collect(),
        }
    }
}

pub fn normalize_newsapi_article(article: &NewsApiArticle) -> Article {
    let url = article.url.clone().unwrap_or_default();
    Article {
        id: url.clone(),
        title: article.title.clone().unwrap_or_default(),
        description: first_non_empty([article.description.as_deref(), article.content.as_deref()])
            .unwrap_or_default()
            .to_string(),
        url,
        image_url: article.url_to_image.clone().filter(|u| !u.is_empty()),
        published_at: article.published_at.clone().unwrap_or_default(),
        source: NewsSource::NewsApi,
        author: article.author.clone(),
    }
}

pub fn normalize_guardian_article(article: &GuardianArticle) -> Article {
    let fields = article.fields.as_ref();
    let trail_text = fields.and_then(|f| f.trail_text.as_deref());
    let body_excerpt = fields
        .and_then(|f| f.body.as_deref())
        .map(|body| truncate_chars(body, BODY_EXCERPT_CHARS));

    Article {
        id: article.id.clone().unwrap_or_default(),
        title: article.web_title.clone().unwrap_or_default(),
        description: first_non_empty([trail_text, body_excerpt.as_deref()])
            .unwrap_or_default()
            .to_string(),
        url: article.web_url.clone().unwrap_or_default(),
        // No reliable image field.
        image_url: None,
        published_at: article.web_publication_date.clone().unwrap_or_default(),
        source: NewsSource::Guardian,
        author: fields.and_then(|f| f.byline.clone()),
    }
}

pub fn normalize_nyt_article(doc: &NytDoc) -> Article {
    Article {
        id: doc.id.clone(),
        title: doc.headline.as_ref().and_then(|h| h.main.clone()).unwrap_or_default(),
        description: first_non_empty([doc.snippet.as_deref(), doc.abstract_text.as_deref()])
            .unwrap_or_default()
            .to_string(),
        url: doc.web_url.clone(),
        image_url: None,
        published_at: doc.pub_date.clone(),
        source: NewsSource::Nyt,
        author: doc.byline.as_ref().and_then(|b| b.original.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::guardian::GuardianFields;
    use crate::sources::nyt::{NytByline, NytHeadline};

    #[test]
    fn newsapi_description_falls_back_to_content() {
        let article = NewsApiArticle {
            url: Some("https://example.com/a".into()),
            title: Some("A".into()),
            description: Some(String::new()),
            content: Some("Body".into()),
            url_to_image: Some("https://example.com/a.jpg".into()),
            author: Some("Jane Doe".into()),
            ..Default::default()
        };
        let normalized = normalize_newsapi_article(&article);
        assert_eq!(normalized.id, "https://example.com/a");
        assert_eq!(normalized.description, "Body");
        assert_eq!(normalized.image_url.as_deref(), Some("https://example.com/a.jpg"));
        assert_eq!(normalized.source, NewsSource::NewsApi);
        assert_eq!(normalized.author.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn newsapi_missing_fields_become_empty() {
        let normalized = normalize_newsapi_article(&NewsApiArticle::default());
        assert_eq!(normalized.id, "");
        assert_eq!(normalized.title, "");
        assert_eq!(normalized.description, "");
        assert_eq!(normalized.published_at, "");
        assert_eq!(normalized.image_url, None);
        assert_eq!(normalized.author, None);
    }

    #[test]
    fn guardian_uses_body_excerpt_without_trail_text() {
        let body: String = "x".repeat(500);
        let article = GuardianArticle {
            id: Some("world/2024/jan/01/story".into()),
            web_title: Some("Story".into()),
            web_url: Some("https://www.theguardian.com/world/2024/jan/01/story".into()),
            web_publication_date: Some("2024-01-01T10:00:00Z".into()),
            fields: Some(GuardianFields { trail_text: None, body: Some(body), byline: Some("Sam Roe".into()) }),
            ..Default::default()
        };
        let normalized = normalize_guardian_article(&article);
        assert_eq!(normalized.description.chars().count(), BODY_EXCERPT_CHARS);
        assert_eq!(normalized.image_url, None);
        assert_eq!(normalized.source, NewsSource::Guardian);
        assert_eq!(normalized.author.as_deref(), Some("Sam Roe"));
    }

    #[test]
    fn nyt_prefers_snippet_over_abstract() {
        let doc = NytDoc {
            id: "nyt://article/1".into(),
            web_url: "https://www.nytimes.com/1".into(),
            pub_date: "2024-01-01T10:00:00+0000".into(),
            headline: Some(NytHeadline { main: Some("Headline".into()) }),
            snippet: None,
            abstract_text: Some("Abstract".into()),
            byline: Some(NytByline { original: Some("By Kim Lee".into()) }),
            news_desk: None,
        };
        let normalized = normalize_nyt_article(&doc);
        assert_eq!(normalized.id, "nyt://article/1");
        assert_eq!(normalized.title, "Headline");
        assert_eq!(normalized.description, "Abstract");
        assert_eq!(normalized.source, NewsSource::Nyt);
        assert_eq!(normalized.author.as_deref(), Some("By Kim Lee"));
    }

    #[test]
    fn pages_tag_every_article_with_their_source() {
        let body = r#"{"response":{"status":"ok","currentPage":1,"pages":1,"results":[
            {"id":"a","webTitle":"A","webUrl":"u1","webPublicationDate":"2024-01-01T00:00:00Z"},
            {"id":"b","webTitle":"B","webUrl":"u2","webPublicationDate":"2024-01-02T00:00:00Z"}
        ]}}"#;
        let page = SourcePage::Guardian(serde_json::from_str(body).unwrap());
        let articles = page.articles();
        assert_eq!(page.article_count(), 2);
        assert_eq!(articles.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(articles.iter().all(|a| a.source == page.source()));
    }
}
