use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{LecternError, Result};

/// Whisper model tier used for every transcription run.
pub const WHISPER_MODEL: &str = "base";

/// Language assumed when a recognizer does not report one.
pub const FALLBACK_LANGUAGE: &str = "en";

/// One timestamped piece of recognized speech, in seconds from the start of the audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new<S: Into<String>>(start: f64, end: f64, text: S) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Recognizer output: chronological segments plus the dominant spoken language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub segments: Vec<TranscriptSegment>,
    pub language: String,
}

impl Transcription {
    /// Reject segments that cannot be rendered as cues.
    ///
    /// Starts must be finite and non-negative, ends must not precede starts.
    /// Cue text is trimmed and flattened onto a single line so every cue in the
    /// written document carries exactly one text line.
    pub fn validate(mut self) -> Result<Self> {
        for (idx, segment) in self.segments.iter_mut().enumerate() {
            if !segment.start.is_finite() || segment.start < 0.0 {
                return Err(LecternError::Transcriber(format!(
                    "segment {} has invalid start time {}",
                    idx, segment.start
                )));
            }
            if !segment.end.is_finite() || segment.end < segment.start {
                return Err(LecternError::Transcriber(format!(
                    "segment {} ends at {} before it starts at {}",
                    idx, segment.end, segment.start
                )));
            }
            segment.text = flatten_text(&segment.text);
        }

        let language = self.language.trim().to_lowercase();
        self.language = if language.is_empty() {
            debug!("Recognizer reported no language, assuming {}", FALLBACK_LANGUAGE);
            FALLBACK_LANGUAGE.to_string()
        } else {
            language
        };

        Ok(self)
    }
}

fn flatten_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Read a recognizer's JSON output file, mapping failures to transcriber errors.
pub fn read_json_output<T, P>(path: P) -> Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(LecternError::Transcriber(format!(
            "Recognizer output not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| LecternError::Transcriber(format!("Failed to read recognizer output: {}", e)))?;

    serde_json::from_str(&content)
        .map_err(|e| LecternError::Transcriber(format!("Failed to parse recognizer output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_trims_and_flattens_text() {
        let transcription = Transcription {
            segments: vec![TranscriptSegment::new(0.0, 1.0, "  Hola\n  amigos ")],
            language: " ES ".to_string(),
        };

        let validated = transcription.validate().unwrap();
        assert_eq!(validated.segments[0].text, "Hola amigos");
        assert_eq!(validated.language, "es");
    }

    #[test]
    fn test_validate_rejects_negative_start() {
        let transcription = Transcription {
            segments: vec![TranscriptSegment::new(-0.5, 1.0, "x")],
            language: "en".to_string(),
        };
        assert!(matches!(transcription.validate(), Err(LecternError::Transcriber(_))));
    }

    #[test]
    fn test_validate_rejects_end_before_start() {
        let transcription = Transcription {
            segments: vec![TranscriptSegment::new(2.0, 1.0, "x")],
            language: "en".to_string(),
        };
        assert!(matches!(transcription.validate(), Err(LecternError::Transcriber(_))));
    }

    #[test]
    fn test_validate_defaults_missing_language() {
        let transcription = Transcription {
            segments: vec![],
            language: String::new(),
        };
        assert_eq!(transcription.validate().unwrap().language, FALLBACK_LANGUAGE);
    }
}
