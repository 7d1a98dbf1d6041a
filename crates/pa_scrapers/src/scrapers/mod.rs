//! Listing-page scrapers.
//!
//! Every source is a [`SiteConfig`]: where its listing page lives and which CSS
//! selectors pick out the article cards. [`ListingScraper`] runs any config, so
//! fixing a site after a redesign means editing selector strings only.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pa_core::{Error, Result, ScrapedArticle, Scraper, SourceMetadata};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use scraper::Html;
use tracing::{debug, info};
use url::Url;

pub mod tech;

use tech::{CnetScraper, TechCrunchScraper, WiredScraper};

/// Desktop browser agent; some sites refuse obvious bots.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// CSS selectors for one site's article cards. All but `card`, `title` and
/// `link` are optional; `title`, `link` and the rest are evaluated inside a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardSelectors {
    pub card: &'static str,
    pub title: &'static str,
    pub link: &'static str,
    pub description: Option<&'static str>,
    pub author: Option<&'static str>,
    pub date: Option<&'static str>,
    pub image: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub metadata: SourceMetadata,
    /// Origin used to resolve relative links, e.g. `https://www.wired.com`
    pub base_url: String,
    /// Path of the listing page relative to `base_url`
    pub listing_path: &'static str,
    pub category: &'static str,
    pub max_articles: usize,
    pub selectors: CardSelectors,
}

impl SiteConfig {
    pub fn listing_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?.join(self.listing_path)?)
    }
}

/// Fetches one listing page and turns its cards into [`ScrapedArticle`]s.
#[derive(Debug, Clone)]
pub struct ListingScraper {
    config: SiteConfig,
    client: Client,
}

impl ListingScraper {
    pub fn new(config: SiteConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Points the scraper at another origin, keeping the listing path.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub async fn scrape(&self) -> Result<Vec<ScrapedArticle>> {
        let listing_url = self.config.listing_url()?;
        let source = self.config.metadata.id;

        let response = self
            .client
            .get(listing_url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, "text/html")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Scraping(format!(
                "{} fetch failed: {} returned {}",
                self.config.metadata.name, listing_url, status
            )));
        }

        let html = response.text().await?;
        let articles = parse_listing(&html, &self.config, &listing_url)?;
        info!(source, count = articles.len(), "{} Scraped listing", self.config.metadata.emoji);
        Ok(articles)
    }
}

/// Extracts article cards from a listing document, in document order, stopping
/// at the configured cap. Cards without a title or a link are skipped.
///
/// Card links resolve against the site origin; image sources resolve against
/// `page_url`, the page they were found on.
pub fn parse_listing(html: &str, config: &SiteConfig, page_url: &Url) -> Result<Vec<ScrapedArticle>> {
    let origin = Url::parse(&config.base_url)?;
    let document = Html::parse_document(html);
    let selectors = &config.selectors;

    let card_selector = utils::parse_selector(selectors.card)?;
    let title_selector = utils::parse_selector(selectors.title)?;
    let link_selector = utils::parse_selector(selectors.link)?;
    let description_selector = selectors.description.map(utils::parse_selector).transpose()?;
    let author_selector = selectors.author.map(utils::parse_selector).transpose()?;
    let date_selector = selectors.date.map(utils::parse_selector).transpose()?;
    let image_selector = selectors.image.map(utils::parse_selector).transpose()?;

    let mut articles = Vec::new();
    for card in document.select(&card_selector) {
        if articles.len() >= config.max_articles {
            break;
        }

        let title = utils::first_text(&card, &title_selector);
        let href = card
            .select(&link_selector)
            .next()
            .and_then(|el| utils::non_empty_attr(&el, "href"));

        let (Some(title), Some(href)) = (title, href) else {
            debug!(source = config.metadata.id, "skipping card without title or link");
            continue;
        };

        let url = match origin.join(&href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                debug!(source = config.metadata.id, %href, error = %e, "skipping card with bad link");
                continue;
            }
        };

        let image_url = image_selector
            .as_ref()
            .and_then(|sel| card.select(sel).next())
            .and_then(|img| {
                utils::non_empty_attr(&img, "src").or_else(|| utils::non_empty_attr(&img, "data-src"))
            })
            .and_then(|src| page_url.join(&src).ok())
            .map(|u| u.to_string());

        let published_at = date_selector
            .as_ref()
            .and_then(|sel| utils::first_text(&card, sel))
            .and_then(|text| utils::parse_published(&text))
            .unwrap_or_else(Utc::now);

        articles.push(ScrapedArticle {
            title,
            description: description_selector
                .as_ref()
                .and_then(|sel| utils::first_text(&card, sel)),
            content: None,
            url,
            image_url,
            category: config.category.to_string(),
            source: config.metadata.id.to_string(),
            author: author_selector
                .as_ref()
                .and_then(|sel| utils::first_text(&card, sel)),
            published_at: Some(published_at),
        });
    }

    Ok(articles)
}

/// Returns every built-in source adapter, in the order they are reported.
pub fn get_scrapers() -> Vec<Arc<dyn Scraper>> {
    vec![
        Arc::new(TechCrunchScraper::new()),
        Arc::new(WiredScraper::new()),
        Arc::new(CnetScraper::new()),
    ]
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use scraper::{ElementRef, Selector};

    pub fn parse_selector(selector: &str) -> Result<Selector> {
        Selector::parse(selector)
            .map_err(|e| Error::Scraping(format!("Invalid selector {:?}: {:?}", selector, e)))
    }

    /// Whitespace-collapsed text of the first match, `None` when absent or blank.
    pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
        element
            .select(selector)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
            .filter(|text| !text.is_empty())
    }

    pub fn non_empty_attr(element: &ElementRef<'_>, name: &str) -> Option<String> {
        element
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Loose date parsing for listing bylines.
    pub fn parse_published(text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%b. %d, %Y"]
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    }
}
