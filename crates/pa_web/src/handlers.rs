use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use pa_core::{ArticleFilter, ArticleStorage, CategoryStorage, ReadState};
use pa_inference::news::flatten_for_storage;
use pa_inference::questions::QuizRequest;
use pa_storage::upsert_by_natural_key;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{ApiError, AppState, UserId};

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Row cap for the news listing
const LIST_LIMIT: usize = 200;

pub async fn scrape_news(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let (report, stored) = state
        .scrapers
        .scrape_and_store(&*state.storage)
        .await
        .map_err(|e| ApiError::from(e).titled("Failed to scrape news"))?;

    if report.articles.is_empty() {
        return Err(ApiError::internal("No articles scraped"));
    }

    let sources: Vec<Value> = report
        .outcomes
        .iter()
        .map(|o| match &o.result {
            Ok(count) => json!({ "source": o.source, "count": count }),
            Err(e) => json!({ "source": o.source, "error": e }),
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "count": stored.len(),
        "articles": stored,
        "sources": sources,
    }))
    .into_response())
}

pub async fn fetch_news(State(state): State<Arc<AppState>>, UserId(user): UserId) -> ApiResult<Response> {
    let categories: Vec<String> = state
        .storage
        .list_categories(&user)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();

    if categories.is_empty() {
        return Err(ApiError::bad_request("No categories found. Please add categories first."));
    }
    info!(user = %user, categories = ?categories, "Starting news fetch");

    let news = state.news.fetch_for_categories(&categories).await;
    let rows = flatten_for_storage(&categories, &news);

    if rows.is_empty() {
        return Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "No articles found. Please try again or check your categories.",
                "categories": categories,
            })),
        )
            .into_response());
    }

    let saved = upsert_by_natural_key(&*state.storage, &rows)
        .await
        .map_err(|e| ApiError::from(e).titled("Failed to fetch news"))?;
    state
        .storage
        .record_fetch(&user, categories.len(), saved.len())
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": saved.len(),
        "message": format!(
            "Successfully fetched {} articles from {} categories",
            saved.len(),
            categories.len()
        ),
        "categories": categories,
        "articles": saved,
    }))
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNewsQuery {
    pub category: Option<String>,
    pub is_read: Option<String>,
    pub start_date: Option<String>,
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_start_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}

impl ListNewsQuery {
    fn to_filter(&self) -> ArticleFilter {
        let mut filter = ArticleFilter::new()
            .read_state(ReadState::from_flag(self.is_read.as_deref()))
            .limit(LIST_LIMIT);
        if let Some(category) = &self.category {
            filter = filter.category(category.as_str());
        }
        if let Some(raw) = &self.start_date {
            match parse_start_date(raw) {
                Some(since) => filter = filter.since(since),
                None => warn!(start_date = %raw, "ignoring unparseable startDate"),
            }
        }
        filter
    }
}

pub async fn list_news(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Query(query): Query<ListNewsQuery>,
) -> ApiResult<Json<Value>> {
    let articles = state
        .storage
        .list_articles(&user, &query.to_filter())
        .await
        .map_err(|e| ApiError::from(e).titled("Failed to fetch news"))?;
    Ok(Json(json!({ "count": articles.len(), "articles": articles })))
}

pub async fn last_fetch(State(state): State<Arc<AppState>>, UserId(user): UserId) -> ApiResult<Json<Value>> {
    let last = state.storage.last_fetch(&user).await?;
    let today = Utc::now().date_naive();
    let has_fetched_today = last
        .as_ref()
        .map(|entry| entry.fetched_at.date_naive() == today)
        .unwrap_or(false);
    Ok(Json(json!({ "lastFetch": last, "hasFetchedToday": has_fetched_today })))
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state.storage.mark_read(&user, id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_categories(State(state): State<Arc<AppState>>, UserId(user): UserId) -> ApiResult<Json<Value>> {
    let categories = state.storage.list_categories(&user).await?;
    Ok(Json(json!({ "categories": categories })))
}

#[derive(Debug, Deserialize)]
pub struct CategoryBody {
    #[serde(default)]
    pub name: String,
}

pub async fn add_category(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Json(body): Json<CategoryBody>,
) -> ApiResult<Json<Value>> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Category name is required"));
    }
    match state.storage.add_category(&user, name).await? {
        Some(category) => Ok(Json(json!({ "category": category }))),
        None => Err(ApiError::bad_request("Category already exists")),
    }
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state.storage.delete_category(&user, id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Either a structured quiz request or a ready-made prompt.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum QuestionsBody {
    Quiz(QuizRequest),
    Prompt { prompt: String },
}

pub async fn generate_questions(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QuestionsBody>,
) -> ApiResult<Json<Value>> {
    let generated = match body {
        QuestionsBody::Quiz(request) => state.questions.generate_quiz(request).await,
        QuestionsBody::Prompt { prompt } => state.questions.generate_from_prompt(&prompt).await,
    }
    .map_err(|e| ApiError::from(e).titled("Failed to generate questions"))?;

    Ok(Json(json!({ "questions": generated.questions, "raw": generated.raw })))
}

#[derive(Debug, Deserialize)]
pub struct PromptBody {
    #[serde(default)]
    pub prompt: String,
}

pub async fn generate_daily_question(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PromptBody>,
) -> ApiResult<Json<Value>> {
    let question = state
        .questions
        .generate_daily(&body.prompt)
        .await
        .map_err(|e| ApiError::from(e).titled("Failed to generate question"))?;
    Ok(Json(json!({ "question": question })))
}
