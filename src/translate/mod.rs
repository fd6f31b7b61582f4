// Batch subtitle translation
//
// - Common: batching, value-keyed reassembly and the shared HTTP client
// - MyMemory / Ollama: translation service clients
// - OnDemand: cache-on-read English subtitles for the viewing page

pub mod common;
pub mod mymemory;
pub mod ollama;
pub mod ondemand;

use async_trait::async_trait;
use std::time::Duration;

pub use common::*;
pub use ondemand::*;
use crate::config::{TranslateConfig, TranslationProvider};
use crate::error::Result;

/// A translation service that takes one block of separator-joined lines per call
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BatchTranslator: Send + Sync {
    /// Translate `text_block` and return the translated block
    async fn translate_batch(
        &self,
        text_block: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

pub struct TranslatorFactory;

impl TranslatorFactory {
    pub fn create_translator(config: &TranslateConfig) -> Result<Box<dyn BatchTranslator>> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(match config.provider {
            TranslationProvider::MyMemory => {
                Box::new(mymemory::MyMemoryTranslator::new(&config.endpoint, timeout)?)
            }
            TranslationProvider::Ollama => {
                Box::new(ollama::OllamaTranslator::new(&config.endpoint, &config.model, timeout)?)
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer a single HTTP request with a canned response, returning the URL to call
    pub async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16 * 1024];
            let _ = socket.read(&mut buf).await;

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{}/get", addr)
    }

    /// Accept a connection and never answer it
    pub async fn serve_silently() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            drop(socket);
        });

        format!("http://{}/get", addr)
    }
}
