use std::convert::Infallible;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pa_core::{InferenceModel, NewsStorage};
use pa_inference::news::NewsFetcher;
use pa_inference::questions::QuestionGenerator;
use pa_scrapers::ScraperManager;

/// Header carrying the caller's user id
pub const USER_HEADER: &str = "x-user-id";

pub struct AppState {
    pub storage: Arc<dyn NewsStorage>,
    pub scrapers: Arc<ScraperManager>,
    pub news: NewsFetcher,
    pub questions: QuestionGenerator,
    /// User assumed when a request carries no user header
    pub default_user: String,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn NewsStorage>,
        scrapers: ScraperManager,
        model: Arc<dyn InferenceModel>,
        default_user: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            scrapers: Arc::new(scrapers),
            news: NewsFetcher::new(Arc::clone(&model)),
            questions: QuestionGenerator::new(model),
            default_user: default_user.into(),
        }
    }
}

/// The user a request acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for UserId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| state.default_user.clone());
        Ok(UserId(user))
    }
}
