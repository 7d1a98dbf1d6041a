use std::sync::Arc;

use futures::future::join_all;
use pa_core::{ArticleStorage, Error, NewArticle, Result, ScrapedArticle, Scraper, StoredArticle};
use tracing::{info, warn};

use crate::scrapers::get_scrapers;

type SharedScraper = Arc<dyn Scraper>;

/// Result of one adapter in a fan-out run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOutcome {
    pub source: String,
    /// Number of records on success, the failure message otherwise
    pub result: std::result::Result<usize, String>,
}

impl SourceOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeReport {
    /// Records from every successful source, grouped by source in registration order
    pub articles: Vec<ScrapedArticle>,
    pub outcomes: Vec<SourceOutcome>,
}

impl ScrapeReport {
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Runs source adapters concurrently and merges their output.
pub struct ScraperManager {
    scrapers: Vec<SharedScraper>,
}

impl ScraperManager {
    /// A manager with no adapters registered.
    pub fn new() -> Self {
        Self { scrapers: Vec::new() }
    }

    pub fn with_default_scrapers() -> Self {
        Self { scrapers: get_scrapers() }
    }

    pub fn add_scraper(&mut self, scraper: SharedScraper) {
        self.scrapers.push(scraper);
    }

    /// Looks an adapter up by id or any of its CLI names, case-insensitively.
    pub fn get_scraper(&self, name: &str) -> Result<SharedScraper> {
        let wanted = name.trim().to_lowercase();
        self.scrapers
            .iter()
            .find(|s| {
                s.source_metadata().id == wanted
                    || s.cli_names().iter().any(|n| n.to_lowercase() == wanted)
            })
            .cloned()
            .ok_or_else(|| Error::Scraping(format!("No scraper found for source: {}", name)))
    }

    pub fn list_scrapers(&self) -> Vec<pa_core::SourceMetadata> {
        self.scrapers.iter().map(|s| s.source_metadata()).collect()
    }

    /// Scrapes every registered source in parallel.
    ///
    /// Each adapter runs in its own task; an adapter that errors or panics is
    /// recorded in the report and contributes no records. Never fails as a whole.
    pub async fn scrape_all_with_report(&self) -> ScrapeReport {
        let handles: Vec<_> = self
            .scrapers
            .iter()
            .map(|scraper| {
                let scraper = Arc::clone(scraper);
                tokio::spawn(async move { scraper.scrape().await })
            })
            .collect();

        let results = join_all(handles).await;

        let mut report = ScrapeReport::default();
        for (scraper, joined) in self.scrapers.iter().zip(results) {
            let meta = scraper.source_metadata();
            let result = match joined {
                Ok(Ok(mut articles)) => {
                    info!(source = meta.id, count = articles.len(), "{} {} done", meta.emoji, meta.name);
                    let count = articles.len();
                    report.articles.append(&mut articles);
                    Ok(count)
                }
                Ok(Err(e)) => {
                    warn!(source = meta.id, error = %e, "{} {} failed", meta.emoji, meta.name);
                    Err(e.to_string())
                }
                Err(e) => {
                    warn!(source = meta.id, error = %e, "{} {} task aborted", meta.emoji, meta.name);
                    Err(format!("task failed: {}", e))
                }
            };
            report.outcomes.push(SourceOutcome {
                source: meta.id.to_string(),
                result,
            });
        }

        info!(
            total = report.articles.len(),
            sources = report.outcomes.len(),
            failed = report.failed_sources().count(),
            "📰 Scrape finished"
        );
        report
    }

    /// Flattened records from every source that succeeded.
    pub async fn scrape_all(&self) -> Vec<ScrapedArticle> {
        self.scrape_all_with_report().await.articles
    }

    /// Scrapes a single source. Unlike the fan-out, failures are returned.
    pub async fn scrape_source(&self, name: &str) -> Result<Vec<ScrapedArticle>> {
        let scraper = self.get_scraper(name)?;
        scraper.scrape().await
    }

    /// Scrapes everything and persists the records keyed by URL.
    pub async fn scrape_and_store<S>(&self, storage: &S) -> Result<(ScrapeReport, Vec<StoredArticle>)>
    where
        S: ArticleStorage + ?Sized,
    {
        let report = self.scrape_all_with_report().await;
        let candidates: Vec<NewArticle> = report.articles.iter().cloned().map(NewArticle::from).collect();
        let stored = pa_storage::upsert_by_natural_key(storage, &candidates).await?;
        Ok((report, stored))
    }
}

impl Default for ScraperManager {
    fn default() -> Self {
        Self::with_default_scrapers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pa_core::SourceMetadata;
    use pa_storage::InMemoryStorage;
    use std::time::Duration;

    enum Behaviour {
        Articles(usize, u64),
        Fail,
        Panic,
    }

    struct MockScraper {
        id: &'static str,
        behaviour: Behaviour,
    }

    impl MockScraper {
        fn shared(id: &'static str, behaviour: Behaviour) -> SharedScraper {
            Arc::new(Self { id, behaviour })
        }
    }

    #[async_trait]
    impl Scraper for MockScraper {
        fn source_metadata(&self) -> SourceMetadata {
            SourceMetadata { name: self.id, id: self.id, emoji: "🧪" }
        }

        async fn scrape(&self) -> Result<Vec<ScrapedArticle>> {
            match self.behaviour {
                Behaviour::Articles(count, delay_ms) => {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    Ok((0..count)
                        .map(|i| ScrapedArticle {
                            title: format!("{} {}", self.id, i),
                            description: None,
                            content: None,
                            url: format!("https://{}.example/{}", self.id, i),
                            image_url: None,
                            category: "tech".to_string(),
                            source: self.id.to_string(),
                            author: None,
                            published_at: None,
                        })
                        .collect())
                }
                Behaviour::Fail => Err(Error::Scraping("site down".to_string())),
                Behaviour::Panic => panic!("adapter bug"),
            }
        }
    }

    fn manager(scrapers: Vec<SharedScraper>) -> ScraperManager {
        let mut manager = ScraperManager::new();
        for scraper in scrapers {
            manager.add_scraper(scraper);
        }
        manager
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let manager = manager(vec![
            MockScraper::shared("alpha", Behaviour::Articles(2, 0)),
            MockScraper::shared("broken", Behaviour::Fail),
            MockScraper::shared("crashy", Behaviour::Panic),
            MockScraper::shared("gamma", Behaviour::Articles(1, 0)),
        ]);

        let report = manager.scrape_all_with_report().await;
        let sources: Vec<&str> = report.articles.iter().map(|a| a.source.as_str()).collect();
        assert_eq!(sources, vec!["alpha", "alpha", "gamma"]);

        let outcomes: Vec<(&str, bool)> = report
            .outcomes
            .iter()
            .map(|o| (o.source.as_str(), o.is_success()))
            .collect();
        assert_eq!(
            outcomes,
            vec![("alpha", true), ("broken", false), ("crashy", false), ("gamma", true)]
        );
        assert_eq!(report.outcomes[0].result, Ok(2));
        assert_eq!(report.failed_sources().count(), 2);
    }

    #[tokio::test]
    async fn test_registration_order_survives_completion_order() {
        let manager = manager(vec![
            MockScraper::shared("slow", Behaviour::Articles(1, 50)),
            MockScraper::shared("fast", Behaviour::Articles(2, 0)),
        ]);

        for _ in 0..2 {
            let sources: Vec<String> = manager.scrape_all().await.into_iter().map(|a| a.source).collect();
            assert_eq!(sources, vec!["slow", "fast", "fast"]);
        }
    }

    #[tokio::test]
    async fn test_all_sources_failing_yields_empty() {
        let manager = manager(vec![
            MockScraper::shared("a", Behaviour::Fail),
            MockScraper::shared("b", Behaviour::Panic),
        ]);
        assert!(manager.scrape_all().await.is_empty());
        assert!(ScraperManager::new().scrape_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_source() {
        let manager = manager(vec![
            MockScraper::shared("alpha", Behaviour::Articles(3, 0)),
            MockScraper::shared("broken", Behaviour::Fail),
        ]);
        assert_eq!(manager.scrape_source("ALPHA").await.unwrap().len(), 3);
        assert!(manager.scrape_source("broken").await.is_err());
        assert!(matches!(manager.scrape_source("nope").await, Err(Error::Scraping(_))));
    }

    #[tokio::test]
    async fn test_scrape_and_store_is_idempotent() {
        let manager = manager(vec![MockScraper::shared("alpha", Behaviour::Articles(3, 0))]);
        let storage = InMemoryStorage::new();

        let (report, first) = manager.scrape_and_store(&storage).await.unwrap();
        assert_eq!(report.articles.len(), 3);
        let (_, second) = manager.scrape_and_store(&storage).await.unwrap();

        let first_ids: Vec<i64> = first.iter().map(|r| r.id).collect();
        let second_ids: Vec<i64> = second.iter().map(|r| r.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn test_default_sources() {
        let manager = ScraperManager::with_default_scrapers();
        let names: Vec<&str> = manager.list_scrapers().iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["TechCrunch", "Wired", "CNET"]);
        assert!(manager.get_scraper("tc").is_ok());
    }
}
