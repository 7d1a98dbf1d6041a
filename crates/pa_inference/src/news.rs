use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use pa_core::{ExtractedNewsItem, GenerationOptions, InferenceModel, NewArticle, Result};
use tracing::{info, warn};

use crate::extract::parse_news_items;

/// Prompt asking for recent articles in one category as a JSON array.
pub fn news_prompt(category: &str) -> String {
    format!(
        "Search the web for the latest news about \"{category}\" published in the last few days.\n\
         Return 8-10 recent, distinct articles as a JSON array and nothing else.\n\
         Each element must be an object with these keys:\n\
         - \"title\": the article headline\n\
         - \"summary\": a 2-3 sentence summary\n\
         - \"url\": the full article URL, starting with http\n\
         - \"publishedDate\": publication date as YYYY-MM-DD\n\
         - \"sourceName\": the publication name\n\
         Only include articles you found in search results, with real URLs."
    )
}

/// Asks a model for news, one request per category.
#[derive(Debug, Clone)]
pub struct NewsFetcher {
    model: Arc<dyn InferenceModel>,
    options: GenerationOptions,
}

impl NewsFetcher {
    /// Requests are grounded on web search and ask for a JSON reply. A model
    /// configured without grounding falls back to its JSON output mode.
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self {
            model,
            options: GenerationOptions {
                search_grounding: true,
                json_output: true,
            },
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Fetches one category. Model failures are returned; malformed replies
    /// yield an empty list.
    pub async fn fetch_category(&self, category: &str) -> Result<Vec<ExtractedNewsItem>> {
        let reply = self.model.generate(&news_prompt(category), self.options).await?;
        let items = parse_news_items(&reply, category);
        info!(category, count = items.len(), "🔎 Extracted news items");
        Ok(items)
    }

    /// Fetches every category concurrently. Every requested category is a key of
    /// the result; a category whose request fails maps to an empty list.
    pub async fn fetch_for_categories(&self, categories: &[String]) -> HashMap<String, Vec<ExtractedNewsItem>> {
        let mut unique: Vec<&String> = Vec::with_capacity(categories.len());
        for category in categories {
            if !unique.contains(&category) {
                unique.push(category);
            }
        }

        let handles: Vec<_> = unique
            .iter()
            .map(|category| {
                let fetcher = self.clone();
                let category = (*category).clone();
                tokio::spawn(async move { fetcher.fetch_category(&category).await })
            })
            .collect();

        let results = join_all(handles).await;

        let mut news = HashMap::with_capacity(unique.len());
        for (category, joined) in unique.into_iter().zip(results) {
            let items = match joined {
                Ok(Ok(items)) => items,
                Ok(Err(e)) => {
                    warn!(category = %category, error = %e, "news fetch failed");
                    Vec::new()
                }
                Err(e) => {
                    warn!(category = %category, error = %e, "news fetch task aborted");
                    Vec::new()
                }
            };
            news.insert(category.clone(), items);
        }

        let total: usize = news.values().map(Vec::len).sum();
        info!(categories = news.len(), total, "📰 Category fetch finished");
        news
    }
}

/// Flattens fetched news into insert candidates, walking `categories` in order.
pub fn flatten_for_storage(
    categories: &[String],
    news: &HashMap<String, Vec<ExtractedNewsItem>>,
) -> Vec<NewArticle> {
    let mut seen = std::collections::HashSet::new();
    categories
        .iter()
        .filter(|c| seen.insert(c.as_str()))
        .filter_map(|c| news.get(c))
        .flatten()
        .cloned()
        .map(ExtractedNewsItem::into_new_article)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pa_core::Error;

    /// Replies per category; categories containing "fail" error out.
    #[derive(Debug)]
    struct ScriptedModel;

    #[async_trait]
    impl InferenceModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &str, _options: GenerationOptions) -> Result<String> {
            if prompt.contains("\"fail\"") {
                return Err(Error::Inference("quota".to_string()));
            }
            if prompt.contains("\"prose\"") {
                return Ok("I could not find anything.".to_string());
            }
            Ok(r#"```json
[{"title": "T1", "summary": "S1", "url": "https://one.example"},
 {"title": "T2", "summary": "S2", "url": "https://two.example", "publishedDate": "2024-02-03", "sourceName": "Two"}]
```"#
                .to_string())
        }
    }

    fn fetcher() -> NewsFetcher {
        NewsFetcher::new(Arc::new(ScriptedModel))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failing_category_keeps_its_key() {
        let categories = names(&["a", "fail", "prose"]);
        let news = fetcher().fetch_for_categories(&categories).await;

        assert_eq!(news.len(), 3);
        assert_eq!(news["a"].len(), 2);
        assert!(news["fail"].is_empty());
        assert!(news["prose"].is_empty());
        assert_eq!(news["a"][0].category, "a");
    }

    #[tokio::test]
    async fn test_fetch_category_propagates_model_errors() {
        assert!(fetcher().fetch_category("fail").await.is_err());
        assert!(fetcher().fetch_category("prose").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flatten_for_storage() {
        let categories = names(&["b", "a", "b"]);
        let news = fetcher().fetch_for_categories(&categories).await;
        let rows = flatten_for_storage(&categories, &news);

        let tagged: Vec<(&str, &str)> = rows.iter().map(|r| (r.category.as_str(), r.title.as_str())).collect();
        assert_eq!(tagged, vec![("b", "T1"), ("b", "T2"), ("a", "T1"), ("a", "T2")]);

        let first = &rows[0];
        assert_eq!(first.source_name.as_deref(), Some("Unknown Source"));
        assert_eq!(first.search_query, "latest b news");
        assert_eq!(first.published_date.as_ref().map(String::len), Some(10));
        assert_eq!(rows[1].source_name.as_deref(), Some("Two"));
        assert_eq!(rows[1].published_date.as_deref(), Some("2024-02-03"));
    }

    #[tokio::test]
    async fn test_ungrounded_gemini_requests_json() {
        use crate::models::GeminiModel;
        use crate::Config;
        use mockito::{Matcher, Server};
        use serde_json::json;

        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .with_status(200)
            .with_body(
                json!({"candidates": [{"content": {"parts": [{
                    "text": r#"[{"title": "T", "summary": "S", "url": "https://t.example"}]"#
                }]}}]})
                .to_string(),
            )
            .create_async()
            .await;

        let model = GeminiModel::new(&Config {
            api_key: Some("test-key".to_string()),
            model_name: Some("gemini-test".to_string()),
            base_url: server.url(),
            search_grounding: false,
        })
        .unwrap();

        let items = NewsFetcher::new(Arc::new(model)).fetch_category("rust").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category, "rust");
        mock.assert_async().await;
    }

    #[test]
    fn test_news_prompt() {
        let prompt = news_prompt("rust");
        assert!(prompt.contains("\"rust\""));
        assert!(prompt.contains("JSON array"));
        assert!(prompt.contains("publishedDate"));
    }
}
