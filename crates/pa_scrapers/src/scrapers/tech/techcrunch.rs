use async_trait::async_trait;
use pa_core::{Result, ScrapedArticle, Scraper, SourceMetadata};

use super::CATEGORY;
use crate::scrapers::{CardSelectors, ListingScraper, SiteConfig};

const METADATA: SourceMetadata = SourceMetadata {
    name: "TechCrunch",
    id: "techcrunch",
    emoji: "🚀",
};

#[derive(Debug, Clone)]
pub struct TechCrunchScraper {
    listing: ListingScraper,
}

impl TechCrunchScraper {
    const BASE_URL: &'static str = "https://techcrunch.com";

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
            listing_path: "/latest/",
            category: CATEGORY,
            max_articles: 50,
            selectors: CardSelectors {
                card: "article.post-block",
                title: "h2.post-block__title a",
                link: "h2.post-block__title a",
                description: Some(".post-block__content"),
                author: Some(".river-byline__authors a"),
                date: Some("time"),
                image: Some("img"),
            },
        }
    }
}

impl Default for TechCrunchScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scraper for TechCrunchScraper {
    fn source_metadata(&self) -> SourceMetadata {
        METADATA
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["techcrunch", "tc"]
    }

    async fn scrape(&self) -> Result<Vec<ScrapedArticle>> {
        self.listing.scrape().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <article class="post-block">
            <h2 class="post-block__title"><a href="/2024/03/05/startup-raises/">Startup raises a round</a></h2>
            <div class="post-block__content">Funding news for a small team.</div>
            <div class="river-byline__authors"><a href="/author/ada">Ada Lovelace</a></div>
            <time datetime="2024-03-05T10:00:00Z">2024-03-05T10:00:00Z</time>
            <img src="https://techcrunch.com/wp-content/a.jpg">
          </article>
          <article class="post-block">
            <div class="post-block__content">No heading, skipped.</div>
          </article>
          <article class="post-block">
            <h2 class="post-block__title"><a href="https://techcrunch.com/2024/03/04/chips/">Chips get faster</a></h2>
          </article>
        </body></html>
    "#;

    #[tokio::test]
    async fn test_scrape_listing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/latest/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(LISTING)
            .create_async()
            .await;

        let scraper = TechCrunchScraper::with_base_url(server.url());
        let articles = scraper.scrape().await.unwrap();
        mock.assert_async().await;

        assert_eq!(articles.len(), 2);
        let first = &articles[0];
        assert_eq!(first.title, "Startup raises a round");
        assert_eq!(first.url, format!("{}/2024/03/05/startup-raises/", server.url()));
        assert_eq!(first.description.as_deref(), Some("Funding news for a small team."));
        assert_eq!(first.author.as_deref(), Some("Ada Lovelace"));
        assert_eq!(first.image_url.as_deref(), Some("https://techcrunch.com/wp-content/a.jpg"));
        assert_eq!(first.source, "techcrunch");
        assert_eq!(first.category, "tech");
        assert_eq!(
            first.published_at.unwrap().to_rfc3339(),
            "2024-03-05T10:00:00+00:00"
        );
        assert_eq!(articles[1].url, "https://techcrunch.com/2024/03/04/chips/");
    }

    #[tokio::test]
    async fn test_unavailable_site_yields_nothing() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/latest/")
            .with_status(503)
            .create_async()
            .await;

        let scraper = TechCrunchScraper::with_base_url(server.url());
        assert!(scraper.scrape().await.is_err());
        assert!(scraper.fetch_source().await.is_empty());
    }
}
