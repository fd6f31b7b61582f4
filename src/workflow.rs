use std::path::{Path, PathBuf};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{LecternError, Result};
use crate::generator::{GeneratedArtifacts, SubtitleGenerator};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait};
use crate::metadata::LanguageMetadata;
use crate::storage::{ArtifactPaths, write_atomic};
use crate::subtitle::SubtitleDocument;
use crate::transcribe::{TranscriberFactory, TranscriberTrait, Transcription};
use crate::translate::{
    BatchTranslator, EnglishSubtitle, SubtitleTranslator, TranslationCache, TranslatorFactory,
};
use crate::viewer::{SubtitleInfo, SubtitleService};

const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

/// Result of a directory run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub generated: Vec<GeneratedArtifacts>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.generated.len() + self.failed.len()
    }
}

/// Outcome of a manual translation run, with the cue count of the English file when there is one
#[derive(Debug)]
pub struct TranslationReport {
    pub outcome: EnglishSubtitle,
    pub cue_count: Option<usize>,
}

pub struct Workflow {
    config: Config,
    generator: SubtitleGenerator,
    viewer: SubtitleService,
    cache: TranslationCache,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        let transcriber = TranscriberFactory::create_transcriber(config.transcriber.clone());
        let translator = TranslatorFactory::create_translator(&config.translate)?;

        Ok(Self::with_components(config, media, transcriber, translator))
    }

    pub fn with_components(
        config: Config,
        media: Box<dyn MediaProcessorTrait>,
        transcriber: Box<dyn TranscriberTrait>,
        translator: Box<dyn BatchTranslator>,
    ) -> Self {
        let subtitles_dir = config.storage.subtitles_dir.clone();
        Self {
            generator: SubtitleGenerator::new(media, transcriber),
            viewer: SubtitleService::new(&subtitles_dir, SubtitleTranslator::new(translator)),
            cache: TranslationCache::new(&subtitles_dir),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Fail early when ffmpeg cannot be executed
    pub async fn check_dependencies(&self) -> Result<()> {
        let media = self.generator.media();
        media.check_availability().await?;
        info!("Using {}", media.get_version_info().await?);
        Ok(())
    }

    fn output_dir(&self, output_dir: Option<&Path>) -> PathBuf {
        output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.storage.subtitles_dir.clone())
    }

    /// Generate subtitles for one video
    pub async fn generate_single(&self, input_path: &Path, output_dir: Option<&Path>) -> Result<GeneratedArtifacts> {
        self.check_dependencies().await?;
        let output_dir = self.output_dir(output_dir);
        self.generator.generate(input_path, &output_dir).await
    }

    /// Generate subtitles for every video under `input_dir`, continuing past failures
    pub async fn process_directory(&self, input_dir: &Path, output_dir: Option<&Path>) -> Result<BatchSummary> {
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(LecternError::InputNotFound(format!(
                "Input path is not a directory: {}",
                input_dir.display()
            )));
        }

        self.check_dependencies().await?;
        let output_dir = self.output_dir(output_dir);
        let video_files = find_videos(input_dir);
        info!("Found {} video files to process", video_files.len());

        let pb = ProgressBar::new(video_files.len() as u64);
        pb.set_style(batch_style());

        let mut summary = BatchSummary::default();
        for video_path in video_files {
            pb.set_message(video_path.display().to_string());
            match self.generator.generate(&video_path, &output_dir).await {
                Ok(artifacts) => {
                    info!("Successfully processed: {}", video_path.display());
                    summary.generated.push(artifacts);
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", video_path.display(), e);
                    summary.failed.push((video_path, e.to_string()));
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(summary)
    }

    /// Extract the recognizer-ready audio track of a video
    pub async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        if !video_path.exists() {
            return Err(LecternError::InputNotFound(video_path.display().to_string()));
        }
        self.check_dependencies().await?;
        self.generator.media().extract_audio(video_path, audio_path).await
    }

    /// Recognize an audio file and write its cues as WebVTT
    pub async fn transcribe_audio(&self, audio_path: &Path, output_path: &Path) -> Result<Transcription> {
        let transcription = self.generator.transcribe_audio(audio_path).await?;
        let document = SubtitleDocument::from_segments(transcription.segments.clone());

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        write_atomic(output_path, document.encode()).await?;
        info!("Wrote {} cues to {}", document.len(), output_path.display());

        Ok(transcription)
    }

    /// Produce the cached English subtitle for `base` ahead of the first viewer
    ///
    /// Without an explicit source language the one recorded in `B.json` is used.
    /// A missing record is an error; a corrupt one is treated as English.
    pub async fn translate(&self, base: &str, source_language: Option<&str>) -> Result<TranslationReport> {
        let subtitles_dir = self.viewer.subtitles_dir();
        let paths = ArtifactPaths::new(subtitles_dir, base);

        let source_language = match source_language {
            Some(code) => code.trim().to_lowercase(),
            None => match LanguageMetadata::read(paths.metadata_path()) {
                Ok(metadata) => metadata.language_code,
                Err(LecternError::MetadataCorrupt(reason)) => {
                    warn!("Unreadable language record for {}, assuming English: {}", base, reason);
                    LanguageMetadata::default().language_code
                }
                Err(e) => return Err(e),
            },
        };

        let outcome = self
            .viewer
            .translator()
            .ensure_english(base, &source_language, subtitles_dir)
            .await;

        let cue_count = match outcome.file_name() {
            Some(_) => {
                let content = tokio::fs::read_to_string(paths.english_path()).await?;
                Some(SubtitleDocument::decode(&content)?.len())
            }
            None => None,
        };

        Ok(TranslationReport { outcome, cue_count })
    }

    /// The record the course viewing page renders for a video URL
    pub async fn subtitle_info(&self, video_url: Option<&str>) -> SubtitleInfo {
        self.viewer.get_subtitle_info(video_url).await
    }
}

fn find_videos(input_dir: &Path) -> Vec<PathBuf> {
    let mut video_files: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .map(|e| e.into_path())
        .collect();
    video_files.sort();
    video_files
}

fn batch_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}
