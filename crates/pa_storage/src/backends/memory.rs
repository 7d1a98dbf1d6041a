use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pa_core::{
    ArticleFilter, ArticleStorage, ArticleView, CategoryStorage, Error, FetchLogEntry, NewArticle,
    NewsCategory, Result, StoredArticle,
};
use tokio::sync::RwLock;

use super::unread_first;

#[derive(Default)]
struct MemoryStore {
    articles: Vec<StoredArticle>,
    read_markers: HashMap<(String, i64), DateTime<Utc>>,
    categories: Vec<NewsCategory>,
    fetch_log: Vec<FetchLogEntry>,
    next_article_id: i64,
    next_category_id: i64,
    next_fetch_id: i64,
}

impl MemoryStore {
    fn find_by_url(&self, url: &str) -> Option<&StoredArticle> {
        self.articles.iter().find(|a| a.url == url)
    }

    fn insert(&mut self, article: &NewArticle) -> StoredArticle {
        self.next_article_id += 1;
        let stored = StoredArticle::from_new(self.next_article_id, article, Utc::now());
        self.articles.push(stored.clone());
        stored
    }

    fn list_articles(&self, user_id: &str, filter: &ArticleFilter) -> Vec<ArticleView> {
        let mut views: Vec<ArticleView> = self
            .articles
            .iter()
            .filter(|a| filter.get_category().map_or(true, |c| a.category == c))
            .filter(|a| filter.get_since().map_or(true, |since| a.fetched_at >= since))
            .map(|a| {
                let read_at = self.read_markers.get(&(user_id.to_string(), a.id)).copied();
                ArticleView {
                    article: a.clone(),
                    is_read: read_at.is_some(),
                    read_at,
                }
            })
            .filter(|v| filter.get_read_state().matches(v.is_read))
            .collect();

        views.sort_by(|a, b| {
            b.article
                .fetched_at
                .cmp(&a.article.fetched_at)
                .then(b.article.id.cmp(&a.article.id))
        });
        views.truncate(filter.get_limit());
        unread_first(&mut views);
        views
    }
}

/// Process-local storage. Everything is lost on exit.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    async fn find_by_url(&self, url: &str) -> Result<Option<StoredArticle>> {
        let store = self.store.read().await;
        Ok(store.find_by_url(url).cloned())
    }

    async fn insert(&self, article: &NewArticle) -> Result<StoredArticle> {
        let mut store = self.store.write().await;
        if store.find_by_url(&article.url).is_some() {
            return Err(Error::Storage(format!("Article already stored: {}", article.url)));
        }
        Ok(store.insert(article))
    }

    async fn insert_or_get(&self, article: &NewArticle) -> Result<StoredArticle> {
        // The write lock spans the lookup and the insert.
        let mut store = self.store.write().await;
        if let Some(existing) = store.find_by_url(&article.url) {
            return Ok(existing.clone());
        }
        Ok(store.insert(article))
    }

    async fn get_article(&self, id: i64) -> Result<Option<StoredArticle>> {
        let store = self.store.read().await;
        Ok(store.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn list_articles(&self, user_id: &str, filter: &ArticleFilter) -> Result<Vec<ArticleView>> {
        let store = self.store.read().await;
        Ok(store.list_articles(user_id, filter))
    }

    async fn mark_read(&self, user_id: &str, article_id: i64) -> Result<()> {
        let mut store = self.store.write().await;
        if !store.articles.iter().any(|a| a.id == article_id) {
            return Err(Error::NotFound(format!("article {}", article_id)));
        }
        store
            .read_markers
            .insert((user_id.to_string(), article_id), Utc::now());
        Ok(())
    }
}

#[async_trait]
impl CategoryStorage for InMemoryStorage {
    async fn add_category(&self, user_id: &str, name: &str) -> Result<Option<NewsCategory>> {
        let mut store = self.store.write().await;
        if store
            .categories
            .iter()
            .any(|c| c.user_id == user_id && c.name == name)
        {
            return Ok(None);
        }
        store.next_category_id += 1;
        let category = NewsCategory {
            id: store.next_category_id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        store.categories.push(category.clone());
        Ok(Some(category))
    }

    async fn list_categories(&self, user_id: &str) -> Result<Vec<NewsCategory>> {
        let store = self.store.read().await;
        let mut categories: Vec<NewsCategory> = store
            .categories
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn delete_category(&self, user_id: &str, id: i64) -> Result<()> {
        let mut store = self.store.write().await;
        store.categories.retain(|c| !(c.id == id && c.user_id == user_id));
        Ok(())
    }

    async fn record_fetch(
        &self,
        user_id: &str,
        categories_count: usize,
        articles_count: usize,
    ) -> Result<FetchLogEntry> {
        let mut store = self.store.write().await;
        store.next_fetch_id += 1;
        let entry = FetchLogEntry {
            id: store.next_fetch_id,
            user_id: user_id.to_string(),
            fetched_at: Utc::now(),
            categories_count: categories_count as i64,
            articles_count: articles_count as i64,
        };
        store.fetch_log.push(entry.clone());
        Ok(entry)
    }

    async fn last_fetch(&self, user_id: &str) -> Result<Option<FetchLogEntry>> {
        let store = self.store.read().await;
        Ok(store
            .fetch_log
            .iter()
            .filter(|e| e.user_id == user_id)
            .max_by(|a, b| a.fetched_at.cmp(&b.fetched_at).then(a.id.cmp(&b.id)))
            .cloned())
    }
}
