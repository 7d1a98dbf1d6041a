use async_trait::async_trait;
use std::fmt;

use crate::Result;

/// Per-call switches for a generative model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerationOptions {
    /// Let the model consult live web search before answering.
    pub search_grounding: bool,
    /// Ask for a bare JSON reply when the backend supports it.
    pub json_output: bool,
}

impl GenerationOptions {
    pub fn grounded() -> Self {
        Self { search_grounding: true, json_output: false }
    }

    pub fn json() -> Self {
        Self { search_grounding: false, json_output: true }
    }
}

#[async_trait]
pub trait InferenceModel: Send + Sync + fmt::Debug {
    /// Returns the name of the model backend
    fn name(&self) -> &str;

    /// Sends a single text prompt and returns the model's freeform reply.
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String>;
}
