use std::fmt;

use async_trait::async_trait;
use pa_core::{Error, GenerationOptions, InferenceModel, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::Config;

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    fn new(prompt: &str, options: GenerationOptions) -> Self {
        // The API rejects a JSON mime type combined with the search tool.
        let tools = options
            .search_grounding
            .then(|| vec![Tool { google_search: GoogleSearch {} }]);
        let generation_config = (options.json_output && !options.search_grounding).then_some(GenerationConfig {
            response_mime_type: "application/json",
        });

        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt.to_string() }],
            }],
            tools,
            generation_config,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Gemini `generateContent` client.
pub struct GeminiModel {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    /// Whether callers may request search grounding at all
    grounding_enabled: bool,
}

impl GeminiModel {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("GEMINI_API_KEY is not set".to_string()))?;

        Ok(Self {
            client: Client::new(),
            api_key,
            model: config.model_name().to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            grounding_enabled: config.search_grounding,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("grounding_enabled", &self.grounding_enabled)
            .finish()
    }
}

#[async_trait]
impl InferenceModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), level = "debug")]
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String> {
        let options = GenerationOptions {
            search_grounding: options.search_grounding && self.grounding_enabled,
            ..options
        };
        let request = GenerateContentRequest::new(prompt, options);
        debug!(model = %self.model, grounded = options.search_grounding, "sending generateContent");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Gemini returned {}: {}",
                status,
                body.trim()
            )));
        }

        let body: GenerateContentResponse = response.json().await?;
        body.text()
            .ok_or_else(|| Error::Inference("Gemini returned no text".to_string()))
    }
}
