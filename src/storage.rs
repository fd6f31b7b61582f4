//! Artifact layout and crash-safe writes in the shared subtitles directory.
//!
//! Every video owns three files keyed by its base filename `B`: `B.vtt`,
//! `B.json` and the cached translation `B.en.vtt`. Files are staged next to
//! their target and renamed into place so readers never observe a partial
//! write.

use dashmap::DashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{LecternError, Result};

pub const SUBTITLE_EXTENSION: &str = "vtt";
pub const METADATA_EXTENSION: &str = "json";
pub const ENGLISH_SUFFIX: &str = "en.vtt";

/// Strip the directory part and the final extension from a file name or URL.
pub fn base_filename(name: &str) -> &str {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_name,
    }
}

/// Base filename of a local video path.
pub fn base_filename_for_path(path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .ok_or_else(|| LecternError::InputNotFound(format!("Invalid video path: {}", path.display())))?;

    let base = base_filename(&file_name);
    if base.is_empty() {
        return Err(LecternError::InputNotFound(format!(
            "Cannot derive a base filename from {}",
            path.display()
        )));
    }
    Ok(base.to_string())
}

/// File names and paths of one video's artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub base: String,
    pub dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new<P: AsRef<Path>, S: Into<String>>(dir: P, base: S) -> Self {
        Self {
            base: base.into(),
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn subtitle_file(&self) -> String {
        format!("{}.{}", self.base, SUBTITLE_EXTENSION)
    }

    pub fn metadata_file(&self) -> String {
        format!("{}.{}", self.base, METADATA_EXTENSION)
    }

    pub fn english_file(&self) -> String {
        format!("{}.{}", self.base, ENGLISH_SUFFIX)
    }

    pub fn subtitle_path(&self) -> PathBuf {
        self.dir.join(self.subtitle_file())
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(self.metadata_file())
    }

    pub fn english_path(&self) -> PathBuf {
        self.dir.join(self.english_file())
    }
}

/// Content written to a temporary file beside its target, not yet visible.
///
/// Dropping a staged file without committing it removes the temporary file.
pub struct StagedFile {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    pub fn stage<P: AsRef<Path>>(target: P, contents: &[u8]) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut temp = tempfile::Builder::new()
            .prefix(".lectern-")
            .suffix(".tmp")
            .tempfile_in(&dir)?;
        temp.write_all(contents)?;
        temp.as_file().sync_all()?;

        Ok(Self { temp, target })
    }

    /// Atomically replace the target with the staged content.
    pub fn commit(self) -> Result<PathBuf> {
        self.temp
            .persist(&self.target)
            .map_err(|e| LecternError::Io(e.error))?;
        Ok(self.target)
    }
}

/// Write a file so concurrent readers see either the old or the new content.
pub async fn write_atomic<P: AsRef<Path>>(path: P, contents: String) -> Result<PathBuf> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || StagedFile::stage(&path, contents.as_bytes())?.commit())
        .await
        .map_err(|e| LecternError::Cache(format!("Write task failed: {}", e)))?
}

/// One async mutex per key, created on first use.
///
/// Keys are base filenames, so the map grows with the catalogue and is never
/// pruned.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_base_filename() {
        assert_eq!(base_filename("lesson1.mp4"), "lesson1");
        assert_eq!(base_filename("/static/videos/intro.part2.mkv"), "intro.part2");
        assert_eq!(base_filename("uploads/noext"), "noext");
        assert_eq!(base_filename(r"C:\videos\clip.webm"), "clip");
    }

    #[test]
    fn test_base_filename_for_path_rejects_empty() {
        assert_eq!(base_filename_for_path(Path::new("/tmp/a.mp4")).unwrap(), "a");
        assert!(base_filename_for_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_artifact_names() {
        let paths = ArtifactPaths::new("/srv/subs", "lesson");
        assert_eq!(paths.subtitle_file(), "lesson.vtt");
        assert_eq!(paths.metadata_file(), "lesson.json");
        assert_eq!(paths.english_file(), "lesson.en.vtt");
        assert_eq!(paths.english_path(), PathBuf::from("/srv/subs/lesson.en.vtt"));
    }

    #[test]
    fn test_uncommitted_stage_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.vtt");

        let staged = StagedFile::stage(&target, b"WEBVTT\n\n").unwrap();
        assert!(!target.exists());
        drop(staged);

        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_commit_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.vtt");
        std::fs::write(&target, "old").unwrap();

        StagedFile::stage(&target, b"new").unwrap().commit().unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_write_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("lesson.en.vtt");

        let written = write_atomic(&target, "WEBVTT\n".to_string()).await.unwrap();
        assert_eq!(written, target);
        assert_eq!(tokio::fs::read_to_string(&target).await.unwrap(), "WEBVTT\n");
    }

    #[tokio::test]
    async fn test_keyed_locks_serialize_same_key() {
        let locks = KeyedLocks::new();
        let guard = locks.lock("lesson").await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.lock("lesson").await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        // other keys stay available
        let _other = locks.lock("other").await;

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .unwrap()
            .unwrap();
    }
}
