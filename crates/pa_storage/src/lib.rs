use std::path::PathBuf;
use std::sync::Arc;

use pa_core::{ArticleStorage, Error, NewArticle, NewsStorage, Result, StoredArticle};
use tracing::{debug, info};

pub mod backends;

pub use backends::*;

/// Backend selection as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    #[cfg(feature = "sqlite")]
    Sqlite(PathBuf),
}

impl StorageKind {
    /// Resolves a backend name plus optional database path.
    pub fn parse(name: &str, path: Option<PathBuf>) -> Result<Self> {
        match name {
            "memory" => Ok(StorageKind::Memory),
            #[cfg(feature = "sqlite")]
            "sqlite" => Ok(StorageKind::Sqlite(
                path.unwrap_or_else(|| PathBuf::from("articles.db")),
            )),
            other => {
                let _ = path;
                Err(Error::Config(format!("Unsupported storage backend: {}", other)))
            }
        }
    }
}

pub async fn create_storage(kind: &StorageKind) -> Result<Arc<dyn NewsStorage>> {
    match kind {
        StorageKind::Memory => Ok(Arc::new(InMemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite(path) => Ok(Arc::new(SQLiteStorage::new_with_path(path).await?)),
    }
}

/// Persists a batch keyed by URL: new URLs are inserted, known URLs resolve to
/// the row already stored. Returns one row per input, in input order.
///
/// Records are processed one at a time so that a URL repeated inside the batch
/// maps to the row created for its first occurrence.
pub async fn upsert_by_natural_key<S>(storage: &S, records: &[NewArticle]) -> Result<Vec<StoredArticle>>
where
    S: ArticleStorage + ?Sized,
{
    let mut rows: Vec<StoredArticle> = Vec::with_capacity(records.len());

    for record in records {
        let row = storage.insert_or_get(record).await?;
        debug!(url = %record.url, id = row.id, "stored article");
        rows.push(row);
    }

    let mut ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    ids.dedup();
    info!(candidates = records.len(), distinct = ids.len(), "💾 Persisted article batch");
    Ok(rows)
}
