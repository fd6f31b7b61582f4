//! Cache-on-read English subtitles.
//!
//! The first request for a non-English video translates `B.vtt` in a single
//! batched call and stores `B.en.vtt`; every later request serves the stored
//! file. Stored translations are never recomputed.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::metadata::LanguageMetadata;
use crate::storage::{ArtifactPaths, ENGLISH_SUFFIX, KeyedLocks, write_atomic};
use super::{BatchPlan, BatchTranslator, UnavailableReason};

pub const ENGLISH: &str = "en";

/// Outcome of asking for a video's English subtitle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnglishSubtitle {
    /// Served from a previously stored translation
    Cached(String),
    /// Translated and stored by this call
    Translated(String),
    /// The source is already English; the original file doubles as the English track
    NotNeeded,
    Unavailable(UnavailableReason),
}

impl EnglishSubtitle {
    /// File name of the English subtitle inside the subtitles directory, if one exists
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Cached(name) | Self::Translated(name) => Some(name),
            Self::NotNeeded | Self::Unavailable(_) => None,
        }
    }
}

pub struct SubtitleTranslator {
    translator: Box<dyn BatchTranslator>,
    locks: KeyedLocks,
}

impl SubtitleTranslator {
    pub fn new(translator: Box<dyn BatchTranslator>) -> Self {
        Self {
            translator,
            locks: KeyedLocks::new(),
        }
    }

    /// Return the English subtitle for `base`, translating and caching it on first use.
    ///
    /// Never fails: every problem is logged and reported as `Unavailable`, and
    /// the caller falls back to the original-language track.
    pub async fn ensure_english(
        &self,
        base: &str,
        source_language: &str,
        subtitles_dir: &Path,
    ) -> EnglishSubtitle {
        let paths = ArtifactPaths::new(subtitles_dir, base);

        if paths.english_path().exists() {
            debug!("English subtitle cache hit for {}", base);
            return EnglishSubtitle::Cached(paths.english_file());
        }

        if LanguageMetadata::from_code(source_language).is_english() {
            return EnglishSubtitle::NotNeeded;
        }

        let _guard = self.locks.lock(base).await;

        // another request may have finished while we waited
        if paths.english_path().exists() {
            debug!("English subtitle for {} written by a concurrent request", base);
            return EnglishSubtitle::Cached(paths.english_file());
        }

        match self.translate_file(&paths, source_language).await {
            Ok(()) => {
                info!("Stored English subtitle {}", paths.english_path().display());
                EnglishSubtitle::Translated(paths.english_file())
            }
            Err(reason) => {
                warn!(
                    "English subtitle unavailable for {} ({} -> {}, via {}): {}",
                    base,
                    source_language,
                    ENGLISH,
                    self.translator.name(),
                    reason
                );
                EnglishSubtitle::Unavailable(reason)
            }
        }
    }

    async fn translate_file(
        &self,
        paths: &ArtifactPaths,
        source_language: &str,
    ) -> std::result::Result<(), UnavailableReason> {
        let content = match tokio::fs::read_to_string(paths.subtitle_path()).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(UnavailableReason::SourceMissing),
            Err(e) => return Err(UnavailableReason::SourceUnreadable(e.to_string())),
        };

        let plan = BatchPlan::from_content(&content);
        if plan.is_empty() {
            return Err(UnavailableReason::NothingToTranslate);
        }

        info!(
            "Translating {} lines of {} from {} to {} via {}",
            plan.segment_count(),
            paths.subtitle_file(),
            source_language,
            ENGLISH,
            self.translator.name()
        );

        let translated_block = self
            .translator
            .translate_batch(&plan.text_block(), source_language, ENGLISH)
            .await
            .map_err(|e| UnavailableReason::Service(e.to_string()))?;

        let translated = plan.apply(&translated_block)?;

        write_atomic(paths.english_path(), translated)
            .await
            .map_err(|e| UnavailableReason::Write(e.to_string()))?;

        Ok(())
    }
}

/// One stored English translation
#[derive(Debug, Clone, Serialize)]
pub struct CachedTranslation {
    pub base: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

/// Maintenance view over the stored `*.en.vtt` files of a subtitles directory
pub struct TranslationCache {
    dir: PathBuf,
}

impl TranslationCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub async fn list(&self) -> Result<Vec<CachedTranslation>> {
        let mut items = Vec::new();
        let suffix = format!(".{}", ENGLISH_SUFFIX);

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(items),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            let Some(base) = file_name.strip_suffix(&suffix) else {
                continue;
            };

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            items.push(CachedTranslation {
                base: base.to_string(),
                path: entry.path(),
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Local>::from),
            });
        }

        items.sort_by(|a, b| a.base.cmp(&b.base));
        Ok(items)
    }

    /// Delete every stored translation, returning how many were removed
    pub async fn clear(&self) -> Result<u64> {
        let mut count = 0;
        for item in self.list().await? {
            match tokio::fs::remove_file(&item.path).await {
                Ok(()) => count += 1,
                Err(e) => warn!("Failed to remove {}: {}", item.path.display(), e),
            }
        }
        info!("Cleared {} cached translations", count);
        Ok(count)
    }

    /// Invalidate one video's stored translation
    pub async fn remove(&self, base: &str) -> Result<bool> {
        let path = ArtifactPaths::new(&self.dir, base).english_path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Removed cached translation {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
