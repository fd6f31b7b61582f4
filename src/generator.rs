//! Offline subtitle generation for one video.
//!
//! Audio is extracted to a scratch directory, transcribed, and written as
//! `B.vtt` plus the `B.json` language record. Runs for the same base filename
//! are serialized.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{LecternError, Result};
use crate::media::MediaProcessorTrait;
use crate::metadata::LanguageMetadata;
use crate::storage::{ArtifactPaths, KeyedLocks, StagedFile, base_filename_for_path};
use crate::subtitle::SubtitleDocument;
use crate::transcribe::{TranscriberTrait, Transcription};

/// Files written by a successful generation run
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedArtifacts {
    pub base: String,
    pub subtitle_path: PathBuf,
    pub metadata_path: PathBuf,
    pub metadata: LanguageMetadata,
    pub cue_count: usize,
}

pub struct SubtitleGenerator {
    media: Box<dyn MediaProcessorTrait>,
    transcriber: Box<dyn TranscriberTrait>,
    locks: KeyedLocks,
}

impl SubtitleGenerator {
    pub fn new(media: Box<dyn MediaProcessorTrait>, transcriber: Box<dyn TranscriberTrait>) -> Self {
        Self {
            media,
            transcriber,
            locks: KeyedLocks::new(),
        }
    }

    pub fn media(&self) -> &dyn MediaProcessorTrait {
        self.media.as_ref()
    }

    /// Produce `<output_dir>/<B>.vtt` and `<output_dir>/<B>.json` for a video.
    ///
    /// Both files are staged first and renamed into place together; a run that
    /// fails at any step leaves no new artifact behind and re-running simply
    /// overwrites the previous pair.
    pub async fn generate(&self, video_path: &Path, output_dir: &Path) -> Result<GeneratedArtifacts> {
        if !video_path.exists() {
            return Err(LecternError::InputNotFound(video_path.display().to_string()));
        }

        let base = base_filename_for_path(video_path)?;
        let _guard = self.locks.lock(&base).await;

        info!("Generating subtitles for {}", video_path.display());
        tokio::fs::create_dir_all(output_dir).await?;

        info!("Step 1/3: Extracting audio");
        let audio_dir = tempfile::Builder::new().prefix("lectern-audio-").tempdir()?;
        let transcription = self.transcribe_video(video_path, audio_dir.path(), &base).await;
        if let Err(e) = audio_dir.close() {
            warn!("Failed to remove temporary audio for {}: {}", base, e);
        }
        let transcription = transcription?;

        info!("Step 3/3: Saving subtitle and language files");
        let document = SubtitleDocument::from_segments(transcription.segments);
        let metadata = LanguageMetadata::from_code(&transcription.language);
        let paths = ArtifactPaths::new(output_dir, base.as_str());

        let subtitle = StagedFile::stage(paths.subtitle_path(), document.encode().as_bytes())?;
        let record = StagedFile::stage(paths.metadata_path(), metadata.to_json()?.as_bytes())?;

        let subtitle_path = subtitle.commit()?;
        let metadata_path = match record.commit() {
            Ok(path) => path,
            Err(e) => {
                // do not leave a subtitle without its language record
                if let Err(remove_err) = std::fs::remove_file(&subtitle_path) {
                    warn!("Failed to roll back {}: {}", subtitle_path.display(), remove_err);
                }
                return Err(e);
            }
        };

        info!(
            "Saved {} cues to {} ({} / {})",
            document.len(),
            subtitle_path.display(),
            metadata.language_code,
            metadata.language_name
        );

        Ok(GeneratedArtifacts {
            base,
            subtitle_path,
            metadata_path,
            metadata,
            cue_count: document.len(),
        })
    }

    async fn transcribe_video(&self, video_path: &Path, scratch_dir: &Path, base: &str) -> Result<Transcription> {
        let audio_path = scratch_dir.join(format!("{}.wav", base));
        self.media.extract_audio(video_path, &audio_path).await?;

        info!("Step 2/3: Transcribing audio with {}", self.transcriber.name());
        self.transcribe_audio(&audio_path).await
    }

    /// Recognize an already extracted audio file
    pub async fn transcribe_audio(&self, audio_path: &Path) -> Result<Transcription> {
        if !audio_path.exists() {
            return Err(LecternError::InputNotFound(audio_path.display().to_string()));
        }
        self.transcriber.transcribe(audio_path).await?.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockMediaProcessorTrait;
    use crate::transcribe::{MockTranscriberTrait, TranscriptSegment};
    use std::sync::{Arc, Mutex};

    fn stub_transcription() -> Transcription {
        Transcription {
            segments: vec![
                TranscriptSegment::new(0.0, 1.0, "Hola"),
                TranscriptSegment::new(1.0, 2.5, "Mundo"),
            ],
            language: "es".to_string(),
        }
    }

    /// Media stub that writes a placeholder WAV and remembers where it put it
    fn recording_media(times: usize, seen: Arc<Mutex<Vec<PathBuf>>>) -> MockMediaProcessorTrait {
        let mut media = MockMediaProcessorTrait::new();
        media.expect_extract_audio().times(times).returning(move |_, audio_path| {
            std::fs::write(audio_path, b"RIFF").unwrap();
            seen.lock().unwrap().push(audio_path.to_path_buf());
            Ok(())
        });
        media
    }

    fn stub_transcriber(times: usize) -> MockTranscriberTrait {
        let mut transcriber = MockTranscriberTrait::new();
        transcriber.expect_name().return_const("stub");
        transcriber
            .expect_transcribe()
            .times(times)
            .returning(|_| Ok(stub_transcription()));
        transcriber
    }

    fn video_in(dir: &Path) -> PathBuf {
        let video = dir.join("B.mp4");
        std::fs::write(&video, b"not really a video").unwrap();
        video
    }

    #[tokio::test]
    async fn test_generates_subtitle_and_metadata() {
        let work = tempfile::tempdir().unwrap();
        let out = work.path().join("subtitles");
        let video = video_in(work.path());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let generator = SubtitleGenerator::new(
            Box::new(recording_media(1, seen.clone())),
            Box::new(stub_transcriber(1)),
        );
        let artifacts = generator.generate(&video, &out).await.unwrap();

        assert_eq!(artifacts.base, "B");
        assert_eq!(artifacts.cue_count, 2);
        assert_eq!(artifacts.subtitle_path, out.join("B.vtt"));

        let vtt = std::fs::read_to_string(out.join("B.vtt")).unwrap();
        assert_eq!(
            vtt,
            "WEBVTT\n\n0:00:00.000 --> 0:00:01.000\nHola\n\n0:00:01.000 --> 0:00:02.500\nMundo\n\n"
        );

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("B.json")).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"language_code": "es", "language_name": "Spanish"}));

        // temporary audio is gone
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].exists());
    }

    #[tokio::test]
    async fn test_rerun_overwrites_with_equivalent_content() {
        let work = tempfile::tempdir().unwrap();
        let video = video_in(work.path());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let generator = SubtitleGenerator::new(
            Box::new(recording_media(2, seen)),
            Box::new(stub_transcriber(2)),
        );

        generator.generate(&video, work.path()).await.unwrap();
        let first_vtt = std::fs::read_to_string(work.path().join("B.vtt")).unwrap();
        let first_json = std::fs::read_to_string(work.path().join("B.json")).unwrap();

        std::fs::write(work.path().join("B.vtt"), "stale").unwrap();
        generator.generate(&video, work.path()).await.unwrap();

        assert_eq!(std::fs::read_to_string(work.path().join("B.vtt")).unwrap(), first_vtt);
        assert_eq!(std::fs::read_to_string(work.path().join("B.json")).unwrap(), first_json);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_runs_for_one_video_are_serialized() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let work = tempfile::tempdir().unwrap();
        let video = video_in(work.path());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut media = MockMediaProcessorTrait::new();
        let (media_active, media_peak) = (active.clone(), peak.clone());
        media.expect_extract_audio().times(2).returning(move |_, audio_path| {
            let running = media_active.fetch_add(1, Ordering::SeqCst) + 1;
            media_peak.fetch_max(running, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(100));
            std::fs::write(audio_path, b"RIFF").unwrap();
            Ok(())
        });

        let mut transcriber = MockTranscriberTrait::new();
        transcriber.expect_name().return_const("stub");
        let transcriber_active = active.clone();
        transcriber.expect_transcribe().times(2).returning(move |_| {
            transcriber_active.fetch_sub(1, Ordering::SeqCst);
            Ok(stub_transcription())
        });

        let generator = Arc::new(SubtitleGenerator::new(Box::new(media), Box::new(transcriber)));
        let runs: Vec<_> = (0..2)
            .map(|_| {
                let generator = generator.clone();
                let video = video.clone();
                let out = work.path().to_path_buf();
                tokio::spawn(async move { generator.generate(&video, &out).await })
            })
            .collect();

        for run in runs {
            assert_eq!(run.await.unwrap().unwrap().cue_count, 2);
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(SubtitleDocument::decode(&std::fs::read_to_string(work.path().join("B.vtt")).unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_missing_video_is_input_not_found() {
        let work = tempfile::tempdir().unwrap();
        let mut media = MockMediaProcessorTrait::new();
        media.expect_extract_audio().times(0);

        let generator = SubtitleGenerator::new(Box::new(media), Box::new(stub_transcriber(0)));
        let result = generator.generate(&work.path().join("missing.mp4"), work.path()).await;

        assert!(matches!(result, Err(LecternError::InputNotFound(_))));
    }

    #[tokio::test]
    async fn test_decoder_failure_writes_nothing() {
        let work = tempfile::tempdir().unwrap();
        let out = work.path().join("subtitles");
        let video = video_in(work.path());

        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_extract_audio()
            .times(1)
            .returning(|_, _| Err(LecternError::ExternalTool("Audio extraction failed (exit status: 1)".to_string())));

        let generator = SubtitleGenerator::new(Box::new(media), Box::new(stub_transcriber(0)));
        let result = generator.generate(&video, &out).await;

        assert!(matches!(result, Err(LecternError::ExternalTool(_))));
        assert!(!out.join("B.vtt").exists());
        assert!(!out.join("B.json").exists());
    }

    #[tokio::test]
    async fn test_recognizer_failure_cleans_up_audio() {
        let work = tempfile::tempdir().unwrap();
        let video = video_in(work.path());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut transcriber = MockTranscriberTrait::new();
        transcriber.expect_name().return_const("stub");
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|_| Err(LecternError::Transcriber("model crashed".to_string())));

        let generator = SubtitleGenerator::new(
            Box::new(recording_media(1, seen.clone())),
            Box::new(transcriber),
        );
        let result = generator.generate(&video, work.path()).await;

        assert!(matches!(result, Err(LecternError::Transcriber(_))));
        assert!(!work.path().join("B.vtt").exists());
        assert!(!seen.lock().unwrap()[0].exists());
    }

    #[tokio::test]
    async fn test_invalid_segments_abort_the_run() {
        let work = tempfile::tempdir().unwrap();
        let video = video_in(work.path());

        let mut transcriber = MockTranscriberTrait::new();
        transcriber.expect_name().return_const("stub");
        transcriber.expect_transcribe().times(1).returning(|_| {
            Ok(Transcription {
                segments: vec![TranscriptSegment::new(3.0, 1.0, "backwards")],
                language: "es".to_string(),
            })
        });

        let generator = SubtitleGenerator::new(
            Box::new(recording_media(1, Arc::new(Mutex::new(Vec::new())))),
            Box::new(transcriber),
        );

        assert!(generator.generate(&video, work.path()).await.is_err());
        assert!(!work.path().join("B.vtt").exists());
        assert!(!work.path().join("B.json").exists());
    }
}
