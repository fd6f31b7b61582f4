// Media processing behind a trait so the generator can run against a stub
//
// - Commands: ffmpeg invocation builder
// - Processor: ffmpeg-backed implementation

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Write a mono 16 kHz PCM WAV track of `video_path` to `audio_path`
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Check the external decoder can be executed
    async fn check_availability(&self) -> Result<()>;

    /// First line of the decoder's version banner
    async fn get_version_info(&self) -> Result<String>;
}

pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
