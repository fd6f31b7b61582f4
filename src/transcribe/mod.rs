// Speech recognition backends
//
// - OpenAI: the `whisper` Python command-line tool
// - WhisperCpp: the whisper.cpp `whisper-cli` binary
//
// Each backend parses its own JSON output and converts it into the shared
// `Transcription` type.

pub mod common;
pub mod openai;
pub mod whisper_cpp;

use async_trait::async_trait;
use std::path::Path;

pub use common::*;
use crate::config::{TranscriberConfig, TranscriberImplementation};
use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriberTrait: Send + Sync {
    /// Recognize speech in a 16 kHz mono WAV file
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcription>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_transcriber(config: TranscriberConfig) -> Box<dyn TranscriberTrait> {
        match config.implementation {
            TranscriberImplementation::OpenAi => Box::new(openai::OpenAITranscriber::new(config)),
            TranscriberImplementation::WhisperCpp => {
                Box::new(whisper_cpp::WhisperCppTranscriber::new(config))
            }
        }
    }
}
