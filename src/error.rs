use thiserror::Error;

#[derive(Error, Debug)]
pub enum LecternError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Input not found: {0}")]
    InputNotFound(String),

    #[error("External tool failed: {0}")]
    ExternalTool(String),

    #[error("Transcription error: {0}")]
    Transcriber(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Corrupt language metadata: {0}")]
    MetadataCorrupt(String),

    #[error("Invalid subtitle data: {0}")]
    SubtitleFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

pub type Result<T> = std::result::Result<T, LecternError>;
