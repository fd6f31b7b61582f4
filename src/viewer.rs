use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::metadata::LanguageMetadata;
use crate::storage::{ArtifactPaths, base_filename};
use crate::translate::SubtitleTranslator;

/// What the course page needs to render its subtitle tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleInfo {
    pub original_file: Option<String>,
    pub english_file: Option<String>,
    pub lang_code: String,
    pub lang_name: String,
}

impl Default for SubtitleInfo {
    fn default() -> Self {
        let metadata = LanguageMetadata::default();
        Self {
            original_file: None,
            english_file: None,
            lang_code: metadata.language_code,
            lang_name: metadata.language_name,
        }
    }
}

/// Subtitle lookup for the course viewing page.
///
/// Callers must have checked that the viewer is allowed to watch the course.
pub struct SubtitleService {
    subtitles_dir: PathBuf,
    translator: SubtitleTranslator,
}

impl SubtitleService {
    pub fn new<P: AsRef<Path>>(subtitles_dir: P, translator: SubtitleTranslator) -> Self {
        Self {
            subtitles_dir: subtitles_dir.as_ref().to_path_buf(),
            translator,
        }
    }

    pub fn subtitles_dir(&self) -> &Path {
        &self.subtitles_dir
    }

    pub fn translator(&self) -> &SubtitleTranslator {
        &self.translator
    }

    /// Resolve the subtitle tracks of a course video, translating to English on first view.
    ///
    /// Courses without a video, or videos without generated subtitles, get the
    /// English defaults and no tracks.
    pub async fn get_subtitle_info(&self, video_url: Option<&str>) -> SubtitleInfo {
        let mut info = SubtitleInfo::default();

        let Some(video_url) = video_url.filter(|url| !url.trim().is_empty()) else {
            return info;
        };

        let base = base_filename(video_url.trim());
        let paths = ArtifactPaths::new(&self.subtitles_dir, base);

        if !paths.subtitle_path().exists() {
            debug!("No subtitles generated yet for {}", base);
            return info;
        }
        info.original_file = Some(paths.subtitle_file());

        let metadata = LanguageMetadata::read_or_default(paths.metadata_path());
        let english = self
            .translator
            .ensure_english(base, &metadata.language_code, &self.subtitles_dir)
            .await;

        info.english_file = english.file_name().map(str::to_string);
        info.lang_code = metadata.language_code;
        info.lang_name = metadata.language_name;
        info
    }
}
