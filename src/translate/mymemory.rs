use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{LecternError, Result};
use super::{BatchTranslator, common::build_http_client};

/// MyMemory `/get` response body
#[derive(Debug, Deserialize)]
pub struct MyMemoryResponse {
    /// Usually a number, but the service sends some error codes as strings
    #[serde(rename = "responseStatus")]
    pub response_status: Value,
    #[serde(rename = "responseData")]
    pub response_data: Option<MyMemoryData>,
    #[serde(rename = "responseDetails", default)]
    pub response_details: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct MyMemoryData {
    #[serde(rename = "translatedText")]
    pub translated_text: Option<String>,
}

impl MyMemoryResponse {
    pub fn status_code(&self) -> Option<u64> {
        match &self.response_status {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Translated text, or an error describing why the service refused
    pub fn into_translated_text(self) -> Result<String> {
        if self.status_code() != Some(200) {
            let details = match &self.response_details {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            return Err(LecternError::Translation(format!(
                "MyMemory status {}: {}",
                self.response_status, details
            )));
        }

        self.response_data
            .and_then(|data| data.translated_text)
            .ok_or_else(|| LecternError::Translation("MyMemory response has no translatedText".to_string()))
    }
}

/// MyMemory public API translator
pub struct MyMemoryTranslator {
    client: Client,
    endpoint: String,
}

impl MyMemoryTranslator {
    pub fn new<S: Into<String>>(endpoint: S, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl BatchTranslator for MyMemoryTranslator {
    async fn translate_batch(
        &self,
        text_block: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        let langpair = format!("{}|{}", source_language, target_language);
        debug!("Sending translation request to {} ({})", self.endpoint, langpair);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", text_block), ("langpair", langpair.as_str())])
            .send()
            .await
            .map_err(|e| LecternError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LecternError::Translation(format!(
                "MyMemory API error {}: {}",
                status, error_text
            )));
        }

        let body: MyMemoryResponse = response
            .json()
            .await
            .map_err(|e| LecternError::Translation(format!("Failed to parse response: {}", e)))?;

        body.into_translated_text()
    }

    fn name(&self) -> &'static str {
        "mymemory"
    }
}
