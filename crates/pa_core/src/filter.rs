use chrono::{DateTime, Utc};

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 500;

/// Which articles to keep based on the caller's read markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadState {
    #[default]
    Any,
    Read,
    Unread,
}

impl ReadState {
    /// Parses the `isRead` query flag. Absent or unrecognised values mean `Any`.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("true") => ReadState::Read,
            Some("false") => ReadState::Unread,
            _ => ReadState::Any,
        }
    }

    pub fn matches(&self, is_read: bool) -> bool {
        match self {
            ReadState::Any => true,
            ReadState::Read => is_read,
            ReadState::Unread => !is_read,
        }
    }
}

/// Listing criteria for stored articles.
///
/// Built through chained setters so every combination is valid by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleFilter {
    category: Option<String>,
    since: Option<DateTime<Utc>>,
    read_state: ReadState,
    limit: usize,
}

impl Default for ArticleFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArticleFilter {
    pub fn new() -> Self {
        Self {
            category: None,
            since: None,
            read_state: ReadState::Any,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Restricts to one category label. Blank labels are ignored.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        let trimmed = category.trim();
        self.category = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
        self
    }

    /// Keeps articles fetched at or after `since`.
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn read_state(mut self, read_state: ReadState) -> Self {
        self.read_state = read_state;
        self
    }

    /// Caps the result count, clamped to `1..=MAX_LIMIT`.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    pub fn get_category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn get_since(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    pub fn get_read_state(&self) -> ReadState {
        self.read_state
    }

    pub fn get_limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(ArticleFilter::new().get_limit(), DEFAULT_LIMIT);
        assert_eq!(ArticleFilter::new().limit(0).get_limit(), 1);
        assert_eq!(ArticleFilter::new().limit(10_000).get_limit(), MAX_LIMIT);
        assert_eq!(ArticleFilter::new().limit(200).get_limit(), 200);
    }

    #[test]
    fn test_blank_category_is_ignored() {
        assert_eq!(ArticleFilter::new().category("  ").get_category(), None);
        assert_eq!(ArticleFilter::new().category(" ai ").get_category(), Some("ai"));
    }

    #[test]
    fn test_read_state_flag() {
        assert_eq!(ReadState::from_flag(Some("true")), ReadState::Read);
        assert_eq!(ReadState::from_flag(Some("false")), ReadState::Unread);
        assert_eq!(ReadState::from_flag(Some("maybe")), ReadState::Any);
        assert_eq!(ReadState::from_flag(None), ReadState::Any);
        assert!(ReadState::Unread.matches(false));
        assert!(!ReadState::Unread.matches(true));
        assert!(ReadState::Any.matches(true));
    }
}
