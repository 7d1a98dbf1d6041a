use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use pa_core::{
    ArticleFilter, ArticleStorage, ArticleView, CategoryStorage, Error, FetchLogEntry, NewArticle,
    NewsCategory, ReadState, Result, StoredArticle,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::info;

use super::unread_first;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        summary TEXT NOT NULL,
        url TEXT NOT NULL UNIQUE,
        category TEXT NOT NULL,
        published_date TEXT,
        source_name TEXT,
        search_query TEXT NOT NULL,
        image_url TEXT,
        author TEXT,
        fetched_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS articles_category_idx ON articles (category)",
    "CREATE INDEX IF NOT EXISTS articles_fetched_at_idx ON articles (fetched_at)",
    r#"
    CREATE TABLE IF NOT EXISTS read_status (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        article_id INTEGER NOT NULL REFERENCES articles (id) ON DELETE CASCADE,
        is_read INTEGER NOT NULL DEFAULT 0,
        read_at TEXT,
        created_at TEXT NOT NULL,
        UNIQUE (user_id, article_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS news_categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (user_id, name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS news_fetch_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        fetched_at TEXT NOT NULL,
        categories_count INTEGER NOT NULL,
        articles_count INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS news_fetch_log_user_idx ON news_fetch_log (user_id, fetched_at)",
];

const ARTICLE_COLUMNS: &str = "a.id, a.title, a.summary, a.url, a.category, a.published_date, \
     a.source_name, a.search_query, a.image_url, a.author, a.fetched_at";

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::Database(format!("{}: {}", context, e))
}

/// Fixed-width UTC timestamps so that text comparison follows time order.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse date {:?}: {}", value, e)))
}

fn article_from_row(row: &SqliteRow) -> Result<StoredArticle> {
    let fetched_at: String = row.try_get("fetched_at").map_err(db_err("fetched_at"))?;
    Ok(StoredArticle {
        id: row.try_get("id").map_err(db_err("id"))?,
        title: row.try_get("title").map_err(db_err("title"))?,
        summary: row.try_get("summary").map_err(db_err("summary"))?,
        url: row.try_get("url").map_err(db_err("url"))?,
        category: row.try_get("category").map_err(db_err("category"))?,
        published_date: row.try_get("published_date").map_err(db_err("published_date"))?,
        source_name: row.try_get("source_name").map_err(db_err("source_name"))?,
        search_query: row.try_get("search_query").map_err(db_err("search_query"))?,
        image_url: row.try_get("image_url").map_err(db_err("image_url"))?,
        author: row.try_get("author").map_err(db_err("author"))?,
        fetched_at: parse_timestamp(&fetched_at)?,
    })
}

fn category_from_row(row: &SqliteRow) -> Result<NewsCategory> {
    let created_at: String = row.try_get("created_at").map_err(db_err("created_at"))?;
    Ok(NewsCategory {
        id: row.try_get("id").map_err(db_err("id"))?,
        user_id: row.try_get("user_id").map_err(db_err("user_id"))?,
        name: row.try_get("name").map_err(db_err("name"))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn fetch_entry_from_row(row: &SqliteRow) -> Result<FetchLogEntry> {
    let fetched_at: String = row.try_get("fetched_at").map_err(db_err("fetched_at"))?;
    Ok(FetchLogEntry {
        id: row.try_get("id").map_err(db_err("id"))?,
        user_id: row.try_get("user_id").map_err(db_err("user_id"))?,
        fetched_at: parse_timestamp(&fetched_at)?,
        categories_count: row.try_get("categories_count").map_err(db_err("categories_count"))?,
        articles_count: row.try_get("articles_count").map_err(db_err("articles_count"))?,
    })
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(db_err("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }
        info!(path = %db_path.display(), "🏦 SQLite storage ready");

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    async fn insert_statement(&self, article: &NewArticle, on_conflict: &str) -> Result<u64> {
        let sql = format!(
            "INSERT INTO articles \
             (title, summary, url, category, published_date, source_name, search_query, image_url, author, fetched_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) {}",
            on_conflict
        );
        let result = sqlx::query(&sql)
            .bind(&article.title)
            .bind(&article.summary)
            .bind(&article.url)
            .bind(&article.category)
            .bind(article.published_date.as_deref())
            .bind(article.source_name.as_deref())
            .bind(&article.search_query)
            .bind(article.image_url.as_deref())
            .bind(article.author.as_deref())
            .bind(timestamp(Utc::now()))
            .execute(&*self.pool)
            .await
            .map_err(db_err("Failed to store article"))?;
        Ok(result.rows_affected())
    }

    async fn require_by_url(&self, url: &str) -> Result<StoredArticle> {
        self.find_by_url(url)
            .await?
            .ok_or_else(|| Error::Storage(format!("Article vanished after insert: {}", url)))
    }
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn find_by_url(&self, url: &str) -> Result<Option<StoredArticle>> {
        let sql = format!("SELECT {} FROM articles a WHERE a.url = ? LIMIT 1", ARTICLE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(url)
            .fetch_optional(&*self.pool)
            .await
            .map_err(db_err("Failed to look up article"))?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn insert(&self, article: &NewArticle) -> Result<StoredArticle> {
        self.insert_statement(article, "").await?;
        self.require_by_url(&article.url).await
    }

    async fn insert_or_get(&self, article: &NewArticle) -> Result<StoredArticle> {
        // The UNIQUE url column arbitrates concurrent writers.
        self.insert_statement(article, "ON CONFLICT (url) DO NOTHING").await?;
        self.require_by_url(&article.url).await
    }

    async fn get_article(&self, id: i64) -> Result<Option<StoredArticle>> {
        let sql = format!("SELECT {} FROM articles a WHERE a.id = ?", ARTICLE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(db_err("Failed to get article"))?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn list_articles(&self, user_id: &str, filter: &ArticleFilter) -> Result<Vec<ArticleView>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {}, COALESCE(rs.is_read, 0) AS is_read, rs.read_at AS read_at \
             FROM articles a LEFT JOIN read_status rs ON rs.article_id = a.id AND rs.user_id = ",
            ARTICLE_COLUMNS
        ));
        query.push_bind(user_id.to_string());
        query.push(" WHERE 1 = 1");

        if let Some(category) = filter.get_category() {
            query.push(" AND a.category = ").push_bind(category.to_string());
        }
        if let Some(since) = filter.get_since() {
            query.push(" AND a.fetched_at >= ").push_bind(timestamp(since));
        }
        match filter.get_read_state() {
            ReadState::Any => {}
            ReadState::Read => {
                query.push(" AND COALESCE(rs.is_read, 0) = 1");
            }
            ReadState::Unread => {
                query.push(" AND COALESCE(rs.is_read, 0) = 0");
            }
        }
        query
            .push(" ORDER BY a.fetched_at DESC, a.id DESC LIMIT ")
            .push_bind(filter.get_limit() as i64);

        let rows = query
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(db_err("Failed to list articles"))?;

        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            let is_read: i64 = row.try_get("is_read").map_err(db_err("is_read"))?;
            let read_at: Option<String> = row.try_get("read_at").map_err(db_err("read_at"))?;
            views.push(ArticleView {
                article: article_from_row(row)?,
                is_read: is_read != 0,
                read_at: read_at.as_deref().map(parse_timestamp).transpose()?,
            });
        }
        unread_first(&mut views);
        Ok(views)
    }

    async fn mark_read(&self, user_id: &str, article_id: i64) -> Result<()> {
        if self.get_article(article_id).await?.is_none() {
            return Err(Error::NotFound(format!("article {}", article_id)));
        }
        let now = timestamp(Utc::now());
        sqlx::query(
            r#"
            INSERT INTO read_status (user_id, article_id, is_read, read_at, created_at)
            VALUES (?, ?, 1, ?, ?)
            ON CONFLICT (user_id, article_id) DO UPDATE SET is_read = 1, read_at = excluded.read_at
            "#,
        )
        .bind(user_id)
        .bind(article_id)
        .bind(&now)
        .bind(&now)
        .execute(&*self.pool)
        .await
        .map_err(db_err("Failed to mark article as read"))?;
        Ok(())
    }
}

#[async_trait]
impl CategoryStorage for SQLiteStorage {
    async fn add_category(&self, user_id: &str, name: &str) -> Result<Option<NewsCategory>> {
        let result = sqlx::query(
            "INSERT INTO news_categories (user_id, name, created_at) VALUES (?, ?, ?) \
             ON CONFLICT (user_id, name) DO NOTHING",
        )
        .bind(user_id)
        .bind(name)
        .bind(timestamp(Utc::now()))
        .execute(&*self.pool)
        .await
        .map_err(db_err("Failed to add category"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let row = sqlx::query("SELECT * FROM news_categories WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(&*self.pool)
            .await
            .map_err(db_err("Failed to read category"))?;
        category_from_row(&row).map(Some)
    }

    async fn list_categories(&self, user_id: &str) -> Result<Vec<NewsCategory>> {
        let rows = sqlx::query("SELECT * FROM news_categories WHERE user_id = ? ORDER BY name")
            .bind(user_id)
            .fetch_all(&*self.pool)
            .await
            .map_err(db_err("Failed to list categories"))?;
        rows.iter().map(category_from_row).collect()
    }

    async fn delete_category(&self, user_id: &str, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM news_categories WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&*self.pool)
            .await
            .map_err(db_err("Failed to delete category"))?;
        Ok(())
    }

    async fn record_fetch(
        &self,
        user_id: &str,
        categories_count: usize,
        articles_count: usize,
    ) -> Result<FetchLogEntry> {
        let result = sqlx::query(
            "INSERT INTO news_fetch_log (user_id, fetched_at, categories_count, articles_count) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(timestamp(Utc::now()))
        .bind(categories_count as i64)
        .bind(articles_count as i64)
        .execute(&*self.pool)
        .await
        .map_err(db_err("Failed to record fetch"))?;

        let row = sqlx::query("SELECT * FROM news_fetch_log WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(&*self.pool)
            .await
            .map_err(db_err("Failed to read fetch log"))?;
        fetch_entry_from_row(&row)
    }

    async fn last_fetch(&self, user_id: &str) -> Result<Option<FetchLogEntry>> {
        let row = sqlx::query(
            "SELECT * FROM news_fetch_log WHERE user_id = ? ORDER BY fetched_at DESC, id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_err("Failed to read fetch log"))?;
        row.as_ref().map(fetch_entry_from_row).transpose()
    }
}
