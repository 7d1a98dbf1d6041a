use std::sync::Arc;

use pa_core::{Error, InferenceModel, Result};

use crate::Config;

pub mod dummy;
pub mod gemini;

pub use dummy::DummyModel;
pub use gemini::GeminiModel;

/// Builds the model backend named on the command line.
pub fn create_model(name: &str, config: &Config) -> Result<Arc<dyn InferenceModel>> {
    match name.to_lowercase().as_str() {
        "gemini" => Ok(Arc::new(GeminiModel::new(config)?)),
        "dummy" => Ok(Arc::new(DummyModel::new())),
        other => Err(Error::Config(format!("Unknown model: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_model() {
        let model = create_model("dummy", &Config::default()).unwrap();
        assert_eq!(model.name(), "dummy");

        let config = Config {
            api_key: Some("key".to_string()),
            ..Config::default()
        };
        let model = create_model("Gemini", &config).unwrap();
        assert_eq!(model.name(), "gemini-2.5-flash-lite");

        assert!(create_model("gpt", &config).is_err());
    }
}
