use async_trait::async_trait;
use pa_core::{Result, ScrapedArticle, Scraper, SourceMetadata};

use super::CATEGORY;
use crate::scrapers::{CardSelectors, ListingScraper, SiteConfig};

const METADATA: SourceMetadata = SourceMetadata {
    name: "Wired",
    id: "wired",
    emoji: "🔌",
};

#[derive(Debug, Clone)]
pub struct WiredScraper {
    listing: ListingScraper,
}

impl WiredScraper {
    const BASE_URL: &'static str = "https://www.wired.com";

    pub fn new() -> Self {
        Self {
            listing: ListingScraper::new(Self::site_config()),
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            listing: ListingScraper::new(Self::site_config()).with_base_url(base_url),
        }
    }

    pub fn listing(&self) -> &ListingScraper {
        &self.listing
    }

    fn site_config() -> SiteConfig {
        SiteConfig {
            metadata: METADATA,
            base_url: Self::BASE_URL.to_string(),
            listing_path: "/tag/technology/",
            category: CATEGORY,
            max_articles: 50,
            selectors: CardSelectors {
                card: "div.summary-item",
                title: "h3.summary-item__hed",
                link: "a.summary-item__hed-link",
                description: Some(".summary-item__dek"),
                author: Some(".summary-item__byline"),
                date: None,
                image: Some("img"),
            },
        }
    }
}

impl Default for WiredScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scraper for WiredScraper {
    fn source_metadata(&self) -> SourceMetadata {
        METADATA
    }

    async fn scrape(&self) -> Result<Vec<ScrapedArticle>> {
        self.listing.scrape().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn card(n: usize) -> String {
        format!(
            r#"<div class="summary-item">
                 <a class="summary-item__hed-link" href="/story/item-{n}/">
                   <h3 class="summary-item__hed">Story {n}</h3>
                 </a>
                 <div class="summary-item__dek">Dek {n}</div>
                 <div class="summary-item__byline">By Writer {n}</div>
               </div>"#
        )
    }

    #[tokio::test]
    async fn test_scrape_caps_cards() {
        let body = format!(
            "<html><body>{}</body></html>",
            (0..60).map(card).collect::<String>()
        );
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/tag/technology/")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let scraper = WiredScraper::with_base_url(server.url());
        let articles = scraper.scrape().await.unwrap();
        assert_eq!(articles.len(), 50);

        let first = &articles[0];
        assert_eq!(first.title, "Story 0");
        assert_eq!(first.url, format!("{}/story/item-0/", server.url()));
        assert_eq!(first.description.as_deref(), Some("Dek 0"));
        assert_eq!(first.author.as_deref(), Some("By Writer 0"));
        assert!(first.image_url.is_none());
        assert!(first.published_at.unwrap() <= Utc::now());
        assert_eq!(articles[49].title, "Story 49");
    }
}
