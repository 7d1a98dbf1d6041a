use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pa_core::{CategoryStorage, InferenceModel, NewArticle, NewsStorage, Result};
use pa_inference::extract::parse_news_items;
use pa_inference::news::{flatten_for_storage, NewsFetcher};
use pa_inference::questions::{QuestionGenerator, QuestionType, QuizMode, QuizRequest};
use pa_scrapers::logging::init_logging;
use pa_scrapers::{handle_command, ScraperArgs, ScraperCommands, ScraperManager};
use pa_storage::{create_storage, upsert_by_natural_key, StorageKind};
use pa_web::AppState;
use tracing::{info, warn};

mod duration;

use duration::HumanDuration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tech news and interview practice from the terminal", long_about = None)]
pub struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, env = "PA_STORAGE", default_value = "memory")]
    storage: String,
    /// SQLite database file (defaults to articles.db)
    #[arg(long, env = "PA_DATABASE_PATH")]
    database_path: Option<PathBuf>,
    /// Model backend: gemini or dummy
    #[arg(long, env = "PA_MODEL", default_value = "gemini")]
    model: String,
    #[arg(long, env = "GEMINI_MODEL")]
    model_name: Option<String>,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Do not let the model consult web search
    #[arg(long)]
    no_grounding: bool,
    #[arg(long, default_value = "info")]
    log_level: String,
    /// User id for categories, read markers and the fetch log
    #[arg(long, env = "PA_USER", default_value = "local")]
    user: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape the tech news sites
    Scrape {
        #[command(subcommand)]
        command: Option<ScraperCommands>,
        /// Repeat every interval (e.g. 1h, 30m, 1d, 1h15m30s)
        #[arg(long)]
        interval: Option<HumanDuration>,
        /// Persist scraped articles
        #[arg(long)]
        store: bool,
    },
    /// Ask the model for the latest news in each category
    Fetch {
        #[arg(required = true)]
        categories: Vec<String>,
        #[arg(long)]
        store: bool,
    },
    /// Extract news items from a saved model reply
    Extract {
        file: PathBuf,
        #[arg(long, default_value = "general")]
        category: String,
    },
    /// Manage news categories
    Categories {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Generate interview questions
    Quiz {
        #[arg(long = "topic", required = true)]
        topics: Vec<String>,
        #[arg(long, default_value = "combined")]
        mode: QuizMode,
        #[arg(long = "type", default_value = "both")]
        question_type: QuestionType,
        #[arg(long, default_value_t = pa_inference::questions::DEFAULT_QUESTION_COUNT)]
        count: u32,
    },
    /// Generate one question with its answer
    Daily {
        #[arg(required = true)]
        prompt: Vec<String>,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryCommands {
    Add { name: String },
    List,
    Remove { id: i64 },
}

impl Cli {
    async fn storage(&self) -> Result<Arc<dyn NewsStorage>> {
        let kind = StorageKind::parse(&self.storage, self.database_path.clone())?;
        if kind == StorageKind::Memory {
            warn!("Using in-memory storage; nothing is kept after exit");
        }
        let storage = create_storage(&kind).await?;
        info!("💾 Storage initialized (using {})", self.storage);
        Ok(storage)
    }

    fn model(&self) -> Result<Arc<dyn InferenceModel>> {
        let mut config = pa_inference::Config::from_env();
        if self.api_key.is_some() {
            config.api_key = self.api_key.clone();
        }
        if self.model_name.is_some() {
            config.model_name = self.model_name.clone();
        }
        config.search_grounding = !self.no_grounding;

        let model = pa_inference::create_model(&self.model, &config)?;
        info!("🧠 Inference model initialized (using {})", model.name());
        Ok(model)
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn store(storage: &dyn NewsStorage, rows: &[NewArticle]) -> Result<()> {
    let saved = upsert_by_natural_key(storage, rows).await?;
    println!("💾 Stored {} articles", saved.len());
    Ok(())
}

async fn run_scrape(
    cli: &Cli,
    command: Option<ScraperCommands>,
    interval: Option<HumanDuration>,
    persist: bool,
) -> Result<()> {
    let manager = ScraperManager::with_default_scrapers();
    let args = ScraperArgs {
        command: command.unwrap_or(ScraperCommands::All),
    };
    let storage = if persist { Some(cli.storage().await?) } else { None };

    loop {
        match handle_command(&args, &manager).await {
            Ok(articles) => {
                for article in &articles {
                    println!("📰 [{}] {} - {}", article.source, article.title, article.url);
                }
                if let Some(storage) = &storage {
                    let rows: Vec<NewArticle> = articles.into_iter().map(NewArticle::from).collect();
                    store(storage.as_ref(), &rows).await?;
                }
            }
            Err(e) if interval.is_some() => eprintln!("Error during scrape: {}", e),
            Err(e) => return Err(e),
        }

        match interval {
            Some(interval) if args.command != ScraperCommands::List => {
                info!("Waiting {} before next scrape", interval);
                tokio::time::sleep(interval.0).await;
            }
            _ => return Ok(()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match &cli.command {
        Commands::Scrape { command, interval, store: persist } => {
            run_scrape(&cli, command.clone(), *interval, *persist).await?;
        }
        Commands::Fetch { categories, store: persist } => {
            let fetcher = NewsFetcher::new(cli.model()?);
            let news = fetcher.fetch_for_categories(categories).await;
            let rows = flatten_for_storage(categories, &news);
            if *persist {
                let storage = cli.storage().await?;
                store(storage.as_ref(), &rows).await?;
                storage.record_fetch(&cli.user, categories.len(), rows.len()).await?;
            }
            print_json(&rows)?;
        }
        Commands::Extract { file, category } => {
            let text = fs::read_to_string(file)?;
            let items = parse_news_items(&text, category);
            info!(count = items.len(), "Extracted items from {}", file.display());
            print_json(&items)?;
        }
        Commands::Categories { command } => {
            let storage = cli.storage().await?;
            match command {
                CategoryCommands::Add { name } => match storage.add_category(&cli.user, name.trim()).await? {
                    Some(category) => println!("✅ Added category {} ({})", category.name, category.id),
                    None => println!("Category already exists: {}", name.trim()),
                },
                CategoryCommands::List => {
                    for category in storage.list_categories(&cli.user).await? {
                        println!("{:>4}  {}", category.id, category.name);
                    }
                }
                CategoryCommands::Remove { id } => {
                    storage.delete_category(&cli.user, *id).await?;
                    println!("🗑️ Removed category {}", id);
                }
            }
        }
        Commands::Quiz { topics, mode, question_type, count } => {
            let generator = QuestionGenerator::new(cli.model()?);
            let request = QuizRequest {
                topics: topics.clone(),
                mode: *mode,
                question_type: *question_type,
                num_questions: *count,
            };
            let generated = generator.generate_quiz(request).await?;
            if generated.questions.is_empty() {
                println!("{}", generated.raw);
            }
            for (i, question) in generated.questions.iter().enumerate() {
                println!("{}. {}", i + 1, question);
            }
        }
        Commands::Daily { prompt } => {
            let generator = QuestionGenerator::new(cli.model()?);
            let daily = generator.generate_daily(&prompt.join(" ")).await?;
            println!("❓ [{}] {}\n\n💡 {}", daily.category, daily.question, daily.answer);
        }
        Commands::Serve { addr } => {
            let state = AppState::new(
                cli.storage().await?,
                ScraperManager::with_default_scrapers(),
                cli.model()?,
                cli.user.clone(),
            );
            pa_web::serve(state, *addr).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scrape() {
        let cli = Cli::try_parse_from(["pa", "scrape", "--store", "--interval", "30m", "source", "wired"]).unwrap();
        match cli.command {
            Commands::Scrape { command, interval, store } => {
                assert_eq!(command, Some(ScraperCommands::Source { name: "wired".to_string() }));
                assert_eq!(interval.map(|i| i.0.as_secs()), Some(1_800));
                assert!(store);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_quiz() {
        let cli = Cli::try_parse_from([
            "pa", "--model", "dummy", "quiz", "--topic", "Rust", "--topic", "SQL", "--mode", "selective", "--type", "coding",
        ])
        .unwrap();
        match cli.command {
            Commands::Quiz { topics, mode, question_type, count } => {
                assert_eq!(topics, vec!["Rust", "SQL"]);
                assert_eq!(mode, QuizMode::Selective);
                assert_eq!(question_type, QuestionType::Coding);
                assert_eq!(count, 15);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(Cli::try_parse_from(["pa", "quiz", "--topic", "Rust", "--mode", "random"]).is_err());
    }

    #[tokio::test]
    async fn test_memory_storage_and_dummy_model() {
        let cli = Cli::try_parse_from(["pa", "--storage", "memory", "--model", "dummy", "serve"]).unwrap();
        assert!(cli.storage().await.is_ok());
        assert_eq!(cli.model().unwrap().name(), "dummy");

        let cli = Cli::try_parse_from(["pa", "--storage", "postgres", "serve"]).unwrap();
        assert!(cli.storage().await.is_err());
    }
}
