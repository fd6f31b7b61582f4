use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::{LecternError, Result};

/// Detected spoken language of one video, stored as `<base>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageMetadata {
    pub language_code: String,
    pub language_name: String,
}

impl Default for LanguageMetadata {
    fn default() -> Self {
        Self::from_code("en")
    }
}

impl LanguageMetadata {
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_lowercase();
        let language_name = language_display_name(&code);
        Self {
            language_code: code,
            language_name,
        }
    }

    pub fn is_english(&self) -> bool {
        self.language_code == "en"
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a metadata record.
    ///
    /// Missing fields are filled from the English default, matching how the
    /// viewing page has always treated partial records.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LecternError::InputNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| LecternError::MetadataCorrupt(format!("{}: {}", path.display(), e)))?;

        let partial: PartialMetadata = serde_json::from_str(&content)
            .map_err(|e| LecternError::MetadataCorrupt(format!("{}: {}", path.display(), e)))?;

        let fallback = Self::default();
        Ok(Self {
            language_code: partial.language_code.unwrap_or(fallback.language_code),
            language_name: partial.language_name.unwrap_or(fallback.language_name),
        })
    }

    /// Read a metadata record, degrading to English when it is missing or unreadable.
    pub fn read_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::read(path) {
            Ok(metadata) => metadata,
            Err(LecternError::InputNotFound(_)) => Self::default(),
            Err(e) => {
                warn!("Falling back to English metadata: {}", e);
                Self::default()
            }
        }
    }
}

#[derive(Deserialize)]
struct PartialMetadata {
    language_code: Option<String>,
    language_name: Option<String>,
}

/// Human-readable name for a language code.
///
/// Codes outside the known table render as the code with its first letter
/// upper-cased.
pub fn language_display_name(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "en" => "English".to_string(),
        "es" => "Spanish".to_string(),
        "ja" => "Japanese".to_string(),
        "fr" => "French".to_string(),
        "de" => "German".to_string(),
        other => capitalize(other),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
