use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use pa_core::{Error, Result};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::{AppState, UserId};

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/news", get(handlers::list_news))
        .route("/api/news/scrape", post(handlers::scrape_news))
        .route("/api/news/fetch", post(handlers::fetch_news))
        .route("/api/news/last-fetch", get(handlers::last_fetch))
        .route("/api/news/:id/read", post(handlers::mark_read))
        .route(
            "/api/news/categories",
            get(handlers::list_categories).post(handlers::add_category),
        )
        .route("/api/news/categories/:id", delete(handlers::delete_category))
        .route("/api/generate-questions", post(handlers::generate_questions))
        .route("/api/daily-decision/generate", post(handlers::generate_daily_question))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Binds `addr` and serves the API until the process is stopped.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "🌐 Listening");
    axum::serve(listener, create_app(state))
        .await
        .map_err(Error::Io)
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState};
    pub use pa_core::{Error, Result};
}
