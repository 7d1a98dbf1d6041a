pub mod error;
pub mod filter;
pub mod models;
pub mod storage;
pub mod types;

pub use error::Error;
pub use filter::{ArticleFilter, ReadState};
pub use models::{GenerationOptions, InferenceModel};
pub use storage::{ArticleStorage, CategoryStorage, NewsStorage};
pub use types::{
    ArticleView, ExtractedNewsItem, FetchLogEntry, NewArticle, NewsCategory, ScrapedArticle,
    Scraper, SourceMetadata, StoredArticle,
};

pub type Result<T> = std::result::Result<T, Error>;
