use async_trait::async_trait;
use pa_core::{GenerationOptions, InferenceModel, Result};

/// Offline model with canned replies. Useful without an API key and in tests.
#[derive(Debug, Clone, Default)]
pub struct DummyModel {
    reply: Option<String>,
}

impl DummyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answers with `reply`.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
        }
    }

    fn canned(prompt: &str) -> String {
        let lower = prompt.to_lowercase();
        if lower.contains("json array") {
            r#"[{"title": "Dummy headline", "summary": "Placeholder article produced offline.", "url": "https://example.com/dummy", "publishedDate": "2024-01-01", "sourceName": "Dummy Wire"}]"#.to_string()
        } else if lower.contains("json object") {
            r#"{"question": "What does an offline model answer?", "answer": "Always the same thing.", "category": "general"}"#.to_string()
        } else {
            "1. What trade-offs does this design make?\n2. How would you test it?".to_string()
        }
    }
}

#[async_trait]
impl InferenceModel for DummyModel {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn generate(&self, prompt: &str, _options: GenerationOptions) -> Result<String> {
        Ok(self.reply.clone().unwrap_or_else(|| Self::canned(prompt)))
    }
}
