use std::env;

pub mod extract;
pub mod models;
pub mod news;
pub mod questions;

/// Default generative model for every text task
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    /// API origin; overridden in tests
    pub base_url: String,
    pub search_grounding: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            search_grounding: true,
        }
    }
}

impl Config {
    /// Reads `GEMINI_API_KEY`, `GEMINI_MODEL` and `GEMINI_BASE_URL`.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            api_key: non_empty("GEMINI_API_KEY"),
            model_name: non_empty("GEMINI_MODEL"),
            base_url: non_empty("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            search_grounding: true,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

pub mod prelude {
    pub use super::extract::{extract_json_arrays, extract_json_object, parse_news_items};
    pub use super::models::create_model;
    pub use super::news::NewsFetcher;
    pub use super::questions::{DailyQuestion, QuestionGenerator, QuizRequest};
    pub use super::Config;
    pub use pa_core::{Error, GenerationOptions, InferenceModel, Result};
}

pub use models::create_model;
