use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// An article card lifted from a source's listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedArticle {
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: String,
    pub image_url: Option<String>,
    pub category: String,
    pub source: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A news item recovered from a generative model's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedNewsItem {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub published_date: Option<String>,
    pub source_name: Option<String>,
    pub category: String,
}

impl ExtractedNewsItem {
    /// Converts the item into an insert candidate, filling the defaults used for
    /// AI-fetched rows.
    pub fn into_new_article(self) -> NewArticle {
        let search_query = format!("latest {} news", self.category);
        NewArticle {
            title: self.title,
            summary: self.summary,
            url: self.url,
            category: self.category,
            published_date: Some(
                self.published_date
                    .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string()),
            ),
            source_name: Some(
                self.source_name
                    .unwrap_or_else(|| "Unknown Source".to_string()),
            ),
            search_query,
            image_url: None,
            author: None,
        }
    }
}

/// Insert candidate handed to the storage layer. `url` is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub category: String,
    pub published_date: Option<String>,
    pub source_name: Option<String>,
    pub search_query: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
}

impl From<ScrapedArticle> for NewArticle {
    fn from(article: ScrapedArticle) -> Self {
        let summary = article
            .description
            .or(article.content)
            .unwrap_or_default();
        Self {
            search_query: format!("scrape:{}", article.source),
            title: article.title,
            summary,
            url: article.url,
            category: article.category,
            published_date: article
                .published_at
                .map(|dt| dt.format("%Y-%m-%d").to_string()),
            source_name: Some(article.source),
            image_url: article.image_url,
            author: article.author,
        }
    }
}

/// A persisted article row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredArticle {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub category: String,
    pub published_date: Option<String>,
    pub source_name: Option<String>,
    pub search_query: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl StoredArticle {
    pub fn from_new(id: i64, article: &NewArticle, fetched_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: article.title.clone(),
            summary: article.summary.clone(),
            url: article.url.clone(),
            category: article.category.clone(),
            published_date: article.published_date.clone(),
            source_name: article.source_name.clone(),
            search_query: article.search_query.clone(),
            image_url: article.image_url.clone(),
            author: article.author.clone(),
            fetched_at,
        }
    }
}

/// A stored article as seen by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: StoredArticle,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsCategory {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchLogEntry {
    pub id: i64,
    pub user_id: String,
    pub fetched_at: DateTime<Utc>,
    pub categories_count: i64,
    pub articles_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMetadata {
    /// Display name, e.g. "TechCrunch"
    pub name: &'static str,
    /// Identifier stamped on every record, e.g. "techcrunch"
    pub id: &'static str,
    pub emoji: &'static str,
}

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Returns the metadata of the news source
    fn source_metadata(&self) -> SourceMetadata;

    /// Returns a list of CLI shorthand names for this scraper
    fn cli_names(&self) -> Vec<&str> {
        vec![self.source_metadata().id]
    }

    /// Fetches the listing page and extracts its article cards.
    async fn scrape(&self) -> Result<Vec<ScrapedArticle>>;

    /// Best-effort variant of [`Scraper::scrape`]: any failure is logged and
    /// turned into an empty list.
    async fn fetch_source(&self) -> Vec<ScrapedArticle> {
        let meta = self.source_metadata();
        match self.scrape().await {
            Ok(articles) => articles,
            Err(e) => {
                tracing::warn!(source = meta.id, error = %e, "{} scrape failed", meta.emoji);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct FailingScraper;

    #[async_trait]
    impl Scraper for FailingScraper {
        fn source_metadata(&self) -> SourceMetadata {
            SourceMetadata { name: "Failing", id: "failing", emoji: "💥" }
        }

        async fn scrape(&self) -> Result<Vec<ScrapedArticle>> {
            Err(Error::Scraping("boom".to_string()))
        }
    }

    fn scraped(description: Option<&str>) -> ScrapedArticle {
        ScrapedArticle {
            title: "Title".to_string(),
            description: description.map(str::to_string),
            content: Some("Body".to_string()),
            url: "https://example.com/a".to_string(),
            image_url: None,
            category: "tech".to_string(),
            source: "example".to_string(),
            author: Some("Ada".to_string()),
            published_at: Some("2024-03-01T10:00:00Z".parse().unwrap()),
        }
    }

    #[tokio::test]
    async fn test_fetch_source_swallows_errors() {
        let scraper = FailingScraper;
        assert!(scraper.fetch_source().await.is_empty());
        assert_eq!(scraper.cli_names(), vec!["failing"]);
    }

    #[test]
    fn test_scraped_article_conversion() {
        let article = NewArticle::from(scraped(Some("Dek")));
        assert_eq!(article.summary, "Dek");
        assert_eq!(article.source_name.as_deref(), Some("example"));
        assert_eq!(article.published_date.as_deref(), Some("2024-03-01"));
        assert_eq!(article.search_query, "scrape:example");

        let article = NewArticle::from(scraped(None));
        assert_eq!(article.summary, "Body");
    }

    #[test]
    fn test_extracted_item_defaults() {
        let item = ExtractedNewsItem {
            title: "A".to_string(),
            summary: "B".to_string(),
            url: "https://x".to_string(),
            published_date: None,
            source_name: None,
            category: "rust".to_string(),
        };
        let article = item.into_new_article();
        assert_eq!(article.source_name.as_deref(), Some("Unknown Source"));
        assert_eq!(article.search_query, "latest rust news");
        assert_eq!(article.published_date.map(|d| d.len()), Some(10));
    }

    #[test]
    fn test_article_view_serializes_flat() {
        let stored = StoredArticle::from_new(7, &NewArticle::from(scraped(None)), Utc::now());
        let view = ArticleView { article: stored, is_read: false, read_at: None };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["isRead"], false);
        assert_eq!(json["sourceName"], "example");
    }
}
