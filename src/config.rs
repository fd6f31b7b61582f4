use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{LecternError, Result};

fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub media: MediaConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Which speech recognizer backend to drive
    pub implementation: TranscriberImplementation,
    /// Path to the recognizer binary (`whisper` or `whisper-cli`)
    pub binary_path: String,
    /// Directory holding ggml model files for whisper.cpp
    pub models_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriberImplementation {
    /// OpenAI Whisper Python command-line tool
    OpenAi,
    /// whisper.cpp `whisper-cli`
    WhisperCpp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Batch translation backend
    pub provider: TranslationProvider,
    /// Endpoint URL of the translation service
    pub endpoint: String,
    /// LLM model, only used by the Ollama provider
    pub model: String,
    /// Upper bound on a single translation request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationProvider {
    /// MyMemory public translation API
    MyMemory,
    /// Local Ollama server
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Shared directory holding `<base>.vtt`, `<base>.json` and `<base>.en.vtt`
    pub subtitles_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transcriber: TranscriberConfig {
                implementation: TranscriberImplementation::OpenAi,
                binary_path: "whisper".to_string(),
                models_dir: PathBuf::from(".lectern/models"),
            },
            translate: TranslateConfig {
                provider: TranslationProvider::MyMemory,
                endpoint: "https://api.mymemory.translated.net/get".to_string(),
                model: "llama3.2:3b".to_string(),
                timeout_secs: default_timeout_secs(),
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
            },
            storage: StorageConfig {
                subtitles_dir: PathBuf::from("static/subtitles"),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LecternError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| LecternError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LecternError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| LecternError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
