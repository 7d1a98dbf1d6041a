use pa_core::ArticleView;

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::SQLiteStorage;

/// Stable reorder putting unread articles ahead of read ones. Callers hand in
/// rows already sorted newest-first.
pub(crate) fn unread_first(articles: &mut [ArticleView]) {
    articles.sort_by_key(|a| a.is_read);
}
