use std::collections::HashMap;
use std::time::Duration;
use reqwest::Client;
use thiserror::Error;

use crate::error::Result;
use crate::subtitle::is_cue_text_line;

/// Joins cue lines into one request body; unlikely to occur in subtitle text.
pub const SEGMENT_SEPARATOR: &str = "|||";

/// Why an English subtitle could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnavailableReason {
    #[error("source subtitle file is missing")]
    SourceMissing,

    #[error("source subtitle file could not be read: {0}")]
    SourceUnreadable(String),

    #[error("source subtitle file has no text to translate")]
    NothingToTranslate,

    #[error("translation service failed: {0}")]
    Service(String),

    #[error("translation returned {received} segments for {sent} sent")]
    Alignment { sent: usize, received: usize },

    #[error("translated subtitle could not be written: {0}")]
    Write(String),
}

/// A subtitle file split into cue text to translate and structure to keep.
///
/// Translations are substituted by value: every line whose text equals a
/// translated source line receives that translation, wherever it occurs.
/// Repeated source text therefore always maps to one translated value.
#[derive(Debug)]
pub struct BatchPlan<'a> {
    lines: Vec<&'a str>,
    texts: Vec<&'a str>,
}

impl<'a> BatchPlan<'a> {
    pub fn from_content(content: &'a str) -> Self {
        let lines: Vec<&str> = content.trim().lines().collect();
        let texts = lines.iter().copied().filter(|line| is_cue_text_line(line)).collect();
        Self { lines, texts }
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Number of segments sent to the translation service
    pub fn segment_count(&self) -> usize {
        self.texts.len()
    }

    pub fn text_block(&self) -> String {
        self.texts.join(SEGMENT_SEPARATOR)
    }

    /// Rebuild the file with translated cue text in place.
    pub fn apply(&self, translated_block: &str) -> std::result::Result<String, UnavailableReason> {
        let translated: Vec<&str> = translated_block.split(SEGMENT_SEPARATOR).collect();
        if translated.len() != self.texts.len() {
            return Err(UnavailableReason::Alignment {
                sent: self.texts.len(),
                received: translated.len(),
            });
        }

        let translation_map: HashMap<&str, &str> = self
            .texts
            .iter()
            .copied()
            .zip(translated.into_iter().map(str::trim))
            .collect();

        let mut content = self
            .lines
            .iter()
            .map(|&line| translation_map.get(line).copied().unwrap_or(line))
            .collect::<Vec<_>>()
            .join("\n");
        content.push('\n');

        Ok(content)
    }
}

/// HTTP client with the fixed request timeout used for all translation calls
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(concat!("lectern/", env!("CARGO_PKG_VERSION")))
        .build()?)
}
