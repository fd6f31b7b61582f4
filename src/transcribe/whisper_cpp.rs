// whisper.cpp `whisper-cli` backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::TranscriberConfig;
use crate::error::{LecternError, Result};
use super::{TranscriberTrait, TranscriptSegment, Transcription, WHISPER_MODEL, read_json_output};

/// `whisper-cli --output-json` document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOutput {
    pub result: WhisperCppResult,
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppResult {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppSegment {
    pub offsets: WhisperCppOffsets,
    pub text: String,
}

/// Segment bounds in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOffsets {
    pub from: i64,
    pub to: i64,
}

impl From<WhisperCppOutput> for Transcription {
    fn from(output: WhisperCppOutput) -> Self {
        let segments = output
            .transcription
            .into_iter()
            .map(|seg| {
                TranscriptSegment::new(
                    seg.offsets.from as f64 / 1000.0,
                    seg.offsets.to as f64 / 1000.0,
                    seg.text.trim(),
                )
            })
            .collect();

        Transcription {
            segments,
            language: output.result.language,
        }
    }
}

/// File name of the ggml model for the fixed model tier
pub fn model_filename() -> String {
    format!("ggml-{}.bin", WHISPER_MODEL)
}

pub struct WhisperCppTranscriber {
    config: TranscriberConfig,
}

impl WhisperCppTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    pub fn model_path(&self) -> PathBuf {
        self.config.models_dir.join(model_filename())
    }
}

#[async_trait]
impl TranscriberTrait for WhisperCppTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcription> {
        let model_path = self.model_path();
        if !model_path.exists() {
            return Err(LecternError::Transcriber(format!(
                "whisper.cpp model not found at {}; run `lectern models --download`",
                model_path.display()
            )));
        }

        info!("Transcribing {} with whisper.cpp model {}", audio_path.display(), model_path.display());

        let temp_dir = tempfile::tempdir()
            .map_err(|e| LecternError::Transcriber(format!("Failed to create temp directory: {}", e)))?;
        let output_prefix = temp_dir.path().join("transcript");

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg("-m").arg(&model_path)
            .arg("-f").arg(audio_path)
            .arg("-l").arg("auto")
            .arg("-oj")
            .arg("-of").arg(&output_prefix)
            .arg("-np")
            .kill_on_drop(true);

        debug!("Executing whisper-cli command: {:?}", cmd);

        let output = cmd.output().await
            .map_err(|e| LecternError::Transcriber(format!("Failed to execute whisper-cli: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LecternError::Transcriber(format!(
                "whisper-cli failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let whisper_output: WhisperCppOutput = read_json_output(output_prefix.with_extension("json"))?;
        let transcription = Transcription::from(whisper_output);

        info!(
            "Recognized {} segments, language {}",
            transcription.segments.len(),
            transcription.language
        );
        Ok(transcription)
    }

    fn name(&self) -> &'static str {
        "whisper.cpp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscriberImplementation;

    #[test]
    fn test_parse_whisper_cpp_output() {
        let json = r#"{
            "systeminfo": "AVX = 1",
            "model": {"type": "base"},
            "result": {"language": "es"},
            "transcription": [
                {"timestamps": {"from": "00:00:00,000", "to": "00:00:01,000"},
                 "offsets": {"from": 0, "to": 1000}, "text": " Hola"},
                {"timestamps": {"from": "00:00:01,000", "to": "00:00:02,500"},
                 "offsets": {"from": 1000, "to": 2500}, "text": " Mundo"}
            ]
        }"#;

        let output: WhisperCppOutput = serde_json::from_str(json).unwrap();
        let transcription = Transcription::from(output);

        assert_eq!(transcription.language, "es");
        assert_eq!(transcription.segments[1], TranscriptSegment::new(1.0, 2.5, "Mundo"));
    }

    #[tokio::test]
    async fn test_missing_model_is_reported() {
        let models_dir = tempfile::tempdir().unwrap();
        let transcriber = WhisperCppTranscriber::new(TranscriberConfig {
            implementation: TranscriberImplementation::WhisperCpp,
            binary_path: "whisper-cli".to_string(),
            models_dir: models_dir.path().to_path_buf(),
        });

        assert_eq!(transcriber.model_path(), models_dir.path().join("ggml-base.bin"));
        let result = transcriber.transcribe(Path::new("audio.wav")).await;
        assert!(matches!(result, Err(LecternError::Transcriber(message)) if message.contains("ggml-base.bin")));
    }
}
