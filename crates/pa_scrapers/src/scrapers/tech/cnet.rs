use async_trait::async_trait;
use pa_core::{Result, ScrapedArticle, Scraper, SourceMetadata};

use super::CATEGORY;
use crate::scrapers::{CardSelectors, ListingScraper, SiteConfig};

const METADATA: SourceMetadata = SourceMetadata {
    name: "CNET",
    id: "cnet",
    emoji: "📱",
};

#[derive(Debug, Clone)]
pub struct CnetScraper {
    listing: ListingScraper,
}

impl CnetScraper {
    const BASE_URL: &'static str = "https://www.cnet.com";

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
            listing_path: "/tech/",
            category: CATEGORY,
            max_articles: 25,
            selectors: CardSelectors {
                card: ".c-storiesNeonHighlightsCard",
                title: ".c-storiesNeonMeta_hedContent",
                link: "a.c-storiesNeonHighlightsCard_link",
                description: Some(".c-storiesNeonMeta_dek"),
                author: Some(".c-storiesNeonMeta_authorMeta"),
                date: Some(".c-storiesNeonMeta_date span"),
                image: Some("picture img"),
            },
        }
    }
}

impl Default for CnetScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scraper for CnetScraper {
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
    use chrono::Datelike;

    const LISTING: &str = r#"
        <html><body>
          <div class="c-storiesNeonHighlightsCard">
            <a class="c-storiesNeonHighlightsCard_link" href="/tech/mobile/new-phone/">
              <picture><img data-src="/a/img/phone.jpg" alt=""></picture>
              <div class="c-storiesNeonMeta_hedContent">The new phone, reviewed</div>
            </a>
            <div class="c-storiesNeonMeta_dek">Battery life is the story.</div>
            <div class="c-storiesNeonMeta_authorMeta">Grace Hopper</div>
            <div class="c-storiesNeonMeta_date"><span>Oct. 14, 2025</span></div>
          </div>
          <div class="c-storiesNeonHighlightsCard">
            <div class="c-storiesNeonMeta_hedContent">Card without a link</div>
          </div>
        </body></html>
    "#;

    #[tokio::test]
    async fn test_scrape_listing() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/tech/")
            .with_status(200)
            .with_body(LISTING)
            .create_async()
            .await;

        let scraper = CnetScraper::with_base_url(server.url());
        let articles = scraper.scrape().await.unwrap();
        assert_eq!(articles.len(), 1);

        let article = &articles[0];
        assert_eq!(article.title, "The new phone, reviewed");
        assert_eq!(article.url, format!("{}/tech/mobile/new-phone/", server.url()));
        assert_eq!(article.image_url.as_deref(), Some(format!("{}/a/img/phone.jpg", server.url()).as_str()));
        assert_eq!(article.description.as_deref(), Some("Battery life is the story."));
        assert_eq!(article.author.as_deref(), Some("Grace Hopper"));
        assert_eq!(article.source, "cnet");
        let published = article.published_at.unwrap();
        assert_eq!((published.year(), published.month(), published.day()), (2025, 10, 14));
    }
}
