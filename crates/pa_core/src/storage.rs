use async_trait::async_trait;

use crate::filter::ArticleFilter;
use crate::types::{ArticleView, FetchLogEntry, NewArticle, NewsCategory, StoredArticle};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Looks up an article by its natural key
    async fn find_by_url(&self, url: &str) -> Result<Option<StoredArticle>>;

    /// Inserts a new row. Fails if the URL is already stored.
    async fn insert(&self, article: &NewArticle) -> Result<StoredArticle>;

    /// Inserts the article unless its URL is already stored, in which case the
    /// existing row is returned untouched. Atomic with respect to other callers.
    async fn insert_or_get(&self, article: &NewArticle) -> Result<StoredArticle>;

    async fn get_article(&self, id: i64) -> Result<Option<StoredArticle>>;

    /// Lists articles for a user, unread first, then newest fetch first.
    async fn list_articles(&self, user_id: &str, filter: &ArticleFilter) -> Result<Vec<ArticleView>>;

    /// Marks an article as read for a user. Unknown ids are `Error::NotFound`.
    async fn mark_read(&self, user_id: &str, article_id: i64) -> Result<()>;
}

#[async_trait]
pub trait CategoryStorage: Send + Sync {
    /// Adds a category. Returns `None` when the user already has one with that name.
    async fn add_category(&self, user_id: &str, name: &str) -> Result<Option<NewsCategory>>;

    /// Lists a user's categories ordered by name
    async fn list_categories(&self, user_id: &str) -> Result<Vec<NewsCategory>>;

    async fn delete_category(&self, user_id: &str, id: i64) -> Result<()>;

    async fn record_fetch(
        &self,
        user_id: &str,
        categories_count: usize,
        articles_count: usize,
    ) -> Result<FetchLogEntry>;

    async fn last_fetch(&self, user_id: &str) -> Result<Option<FetchLogEntry>>;
}

/// Everything the news pipelines need from a backend.
pub trait NewsStorage: ArticleStorage + CategoryStorage {}

impl<T: ArticleStorage + CategoryStorage> NewsStorage for T {}
