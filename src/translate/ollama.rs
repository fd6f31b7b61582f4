use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{LecternError, Result};
use crate::metadata::language_display_name;
use super::{BatchTranslator, SEGMENT_SEPARATOR, common::build_http_client};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub done: bool,
}

/// Batch translation through a local Ollama model
pub struct OllamaTranslator {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaTranslator {
    pub fn new<S1: Into<String>, S2: Into<String>>(endpoint: S1, model: S2, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }

    fn build_prompt(&self, text_block: &str, source_language: &str, target_language: &str) -> String {
        let source_name = language_display_name(source_language);
        let target_name = language_display_name(target_language);

        format!(
            "You are a professional subtitle translator.\n\
             \n\
             Translate the subtitle lines below from {} to {}.\n\
             The lines are separated by \"{}\". Keep every separator exactly where it is,\n\
             translate each line on its own, and never merge or split lines.\n\
             Return ONLY the translated lines joined by the same separator, with no explanations.\n\
             \n\
             {}",
            source_name, target_name, SEGMENT_SEPARATOR, text_block
        )
    }
}

#[async_trait]
impl BatchTranslator for OllamaTranslator {
    async fn translate_batch(
        &self,
        text_block: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: self.build_prompt(text_block, source_language, target_language),
            stream: false,
        };

        let url = format!("{}/api/generate", self.endpoint.trim_end_matches('/'));
        debug!("Sending translation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LecternError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LecternError::Translation(format!(
                "Ollama API error {}: {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LecternError::Translation(format!("Failed to parse response: {}", e)))?;

        let translated = body.response.trim().to_string();
        if translated.is_empty() {
            return Err(LecternError::Translation("Empty translation received".to_string()));
        }

        Ok(translated)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::test_support::serve_once;

    #[test]
    fn test_prompt_names_languages_and_separator() {
        let translator = OllamaTranslator::new("http://localhost:11434", "llama3.2:3b", Duration::from_secs(1)).unwrap();
        let prompt = translator.build_prompt("Hola|||Mundo", "es", "en");

        assert!(prompt.contains("from Spanish to English"));
        assert!(prompt.contains("\"|||\""));
        assert!(prompt.ends_with("Hola|||Mundo"));
    }

    #[tokio::test]
    async fn test_successful_generation() {
        let endpoint = serve_once("200 OK", r#"{"response": " Hello|||World\n", "done": true}"#).await;
        let base = endpoint.trim_end_matches("/get").to_string();

        let translator = OllamaTranslator::new(base, "llama3.2:3b", Duration::from_secs(5)).unwrap();
        assert_eq!(
            translator.translate_batch("Hola|||Mundo", "es", "en").await.unwrap(),
            "Hello|||World"
        );
    }

    #[tokio::test]
    async fn test_empty_generation_fails() {
        let endpoint = serve_once("200 OK", r#"{"response": "   ", "done": true}"#).await;
        let base = endpoint.trim_end_matches("/get").to_string();

        let translator = OllamaTranslator::new(base, "llama3.2:3b", Duration::from_secs(5)).unwrap();
        assert!(translator.translate_batch("Hola", "es", "en").await.is_err());
    }
}
