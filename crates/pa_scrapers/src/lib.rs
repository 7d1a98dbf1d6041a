pub mod cli;
pub mod logging;
pub mod manager;
pub mod scrapers;

pub use cli::{handle_command, ScraperArgs, ScraperCommands};
pub use manager::{ScrapeReport, ScraperManager, SourceOutcome};
pub use scrapers::{get_scrapers, CardSelectors, ListingScraper, SiteConfig};

pub mod prelude {
    pub use super::scrapers::ListingScraper;
    pub use pa_core::{Error, Result, ScrapedArticle, Scraper};
}
