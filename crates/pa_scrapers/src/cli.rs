use clap::{Args, Subcommand};
use pa_core::{Result, ScrapedArticle};

use crate::manager::ScraperManager;

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ScraperCommands {
    /// Scrape every source in parallel
    All,
    /// Scrape a single source
    Source {
        /// Source id or shorthand (e.g. techcrunch, tc, wired, cnet)
        name: String,
    },
    /// List available scrapers
    List,
}

/// Runs a scraper subcommand and returns whatever it scraped. `list` prints the
/// available sources and returns nothing.
pub async fn handle_command(args: &ScraperArgs, manager: &ScraperManager) -> Result<Vec<ScrapedArticle>> {
    match &args.command {
        ScraperCommands::All => {
            let report = manager.scrape_all_with_report().await;
            for outcome in &report.outcomes {
                match &outcome.result {
                    Ok(count) => println!("✅ {}: {} articles", outcome.source, count),
                    Err(e) => eprintln!("❌ {}: {}", outcome.source, e),
                }
            }
            Ok(report.articles)
        }
        ScraperCommands::Source { name } => {
            let articles = manager.scrape_source(name).await?;
            println!("Found {} articles", articles.len());
            Ok(articles)
        }
        ScraperCommands::List => {
            println!("Available scrapers:");
            for meta in manager.list_scrapers() {
                println!("  {} {} ({})", meta.emoji, meta.name, meta.id);
            }
            Ok(Vec::new())
        }
    }
}
