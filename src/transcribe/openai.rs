// OpenAI Whisper Python command-line tool

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::TranscriberConfig;
use crate::error::{LecternError, Result};
use super::{FALLBACK_LANGUAGE, TranscriberTrait, TranscriptSegment, Transcription, WHISPER_MODEL, read_json_output};

/// `whisper --output_format json` document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIWhisperOutput {
    #[serde(default)]
    pub text: String,
    pub segments: Vec<OpenAIWhisperSegment>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIWhisperSegment {
    pub id: u64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub avg_logprob: Option<f64>,
    pub no_speech_prob: Option<f64>,
}

impl From<OpenAIWhisperOutput> for Transcription {
    fn from(output: OpenAIWhisperOutput) -> Self {
        let language = output.language.unwrap_or_else(|| {
            warn!("Whisper output has no language, assuming {}", FALLBACK_LANGUAGE);
            FALLBACK_LANGUAGE.to_string()
        });

        let segments = output
            .segments
            .into_iter()
            .map(|seg| TranscriptSegment::new(seg.start, seg.end, seg.text.trim()))
            .collect();

        Transcription { segments, language }
    }
}

pub struct OpenAITranscriber {
    config: TranscriberConfig,
}

impl OpenAITranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TranscriberTrait for OpenAITranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcription> {
        info!("Transcribing {} with whisper model {}", audio_path.display(), WHISPER_MODEL);

        let temp_dir = tempfile::tempdir()
            .map_err(|e| LecternError::Transcriber(format!("Failed to create temp directory: {}", e)))?;
        let output_dir = temp_dir.path();

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg(audio_path)
            .arg("--model").arg(WHISPER_MODEL)
            .arg("--output_dir").arg(output_dir)
            .arg("--output_format").arg("json")
            .arg("--verbose").arg("False")
            .kill_on_drop(true);

        debug!("Executing whisper command: {:?}", cmd);

        let output = cmd.output().await
            .map_err(|e| LecternError::Transcriber(format!("Failed to execute whisper: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LecternError::Transcriber(format!(
                "Whisper failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let audio_stem = audio_path.file_stem()
            .ok_or_else(|| LecternError::Transcriber("Invalid audio filename".to_string()))?;
        let json_file = output_dir.join(format!("{}.json", audio_stem.to_string_lossy()));

        let whisper_output: OpenAIWhisperOutput = read_json_output(&json_file)?;
        let transcription = Transcription::from(whisper_output);

        info!(
            "Recognized {} segments, language {}",
            transcription.segments.len(),
            transcription.language
        );
        Ok(transcription)
    }

    fn name(&self) -> &'static str {
        "openai-whisper"
    }
}
