use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use reqwest::Client;
use tracing::{info, warn};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{LecternError, Result};
use crate::transcribe::{WHISPER_MODEL, whisper_cpp::model_filename};

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Prepares the local whisper.cpp model directory
pub struct SetupManager {
    client: Client,
    models_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub filename: String,
    pub url: String,
    pub size_mb: f64,
}

impl ModelInfo {
    /// The single model tier subtitles are generated with
    pub fn fixed() -> Self {
        let filename = model_filename();
        Self {
            name: WHISPER_MODEL.to_string(),
            url: format!("{}/{}", MODEL_BASE_URL, filename),
            filename,
            size_mb: 142.0,
        }
    }
}

impl SetupManager {
    pub fn new<P: AsRef<Path>>(models_dir: P) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("lectern/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            models_dir: models_dir.as_ref().to_path_buf(),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn model_path(&self, model: &ModelInfo) -> PathBuf {
        self.models_dir.join(&model.filename)
    }

    pub fn model_exists(&self, model: &ModelInfo) -> bool {
        self.model_path(model).is_file()
    }

    /// Make sure the fixed model is present, downloading it if needed
    pub async fn ensure_model(&self) -> Result<PathBuf> {
        let model = ModelInfo::fixed();
        if self.model_exists(&model) {
            let path = self.model_path(&model);
            info!("Model {} available at {}", model.name, path.display());
            return Ok(path);
        }

        info!("Model {} not found in {}", model.name, self.models_dir.display());
        self.download_model(&model).await
    }

    pub async fn download_model(&self, model: &ModelInfo) -> Result<PathBuf> {
        let local_path = self.model_path(model);

        if local_path.exists() {
            info!("Model {} already exists at {}", model.name, local_path.display());
            return Ok(local_path);
        }

        async_fs::create_dir_all(&self.models_dir).await?;
        info!("Downloading {} model ({:.1} MB)...", model.name, model.size_mb);

        let mut response = self.client.get(&model.url).send().await?;

        if !response.status().is_success() {
            return Err(LecternError::ExternalTool(format!(
                "Failed to download model {}: HTTP {}",
                model.name,
                response.status()
            )));
        }

        let total = response
            .content_length()
            .unwrap_or((model.size_mb * 1_000_000.0) as u64);
        let pb = ProgressBar::new(total);
        pb.set_style(download_style());

        let temp_path = local_path.with_extension("tmp");
        let result = async {
            let mut file = async_fs::File::create(&temp_path).await?;
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                pb.inc(chunk.len() as u64);
            }
            file.flush().await?;
            file.sync_all().await?;
            Ok::<_, LecternError>(())
        }
        .await;

        if let Err(e) = result {
            pb.abandon();
            if let Err(remove_err) = async_fs::remove_file(&temp_path).await {
                warn!("Failed to remove partial download {}: {}", temp_path.display(), remove_err);
            }
            return Err(e);
        }

        async_fs::rename(&temp_path, &local_path).await?;

        pb.finish_with_message(format!("Downloaded {}", model.name));
        info!("Successfully downloaded {} to {}", model.name, local_path.display());

        Ok(local_path)
    }
}

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::test_support::serve_once;

    #[test]
    fn test_fixed_model_is_ggml_base() {
        let model = ModelInfo::fixed();
        assert_eq!(model.name, "base");
        assert_eq!(model.filename, "ggml-base.bin");
        assert_eq!(
            model.url,
            "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.bin"
        );
    }

    #[tokio::test]
    async fn test_existing_model_is_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ggml-base.bin"), b"model").unwrap();

        let setup = SetupManager::new(dir.path()).unwrap();
        let path = setup.ensure_model().await.unwrap();
        assert_eq!(path, dir.path().join("ggml-base.bin"));
    }

    #[tokio::test]
    async fn test_download_writes_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once("200 OK", "ggml-model-bytes").await;
        let model = ModelInfo {
            name: "test".to_string(),
            filename: "ggml-test.bin".to_string(),
            url,
            size_mb: 0.0,
        };

        let setup = SetupManager::new(dir.path().join("models")).unwrap();
        let path = setup.download_model(&model).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ggml-model-bytes");
        assert!(!dir.path().join("models/ggml-test.tmp").exists());
        assert!(setup.model_exists(&model));
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_model() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once("404 Not Found", "missing").await;
        let model = ModelInfo {
            name: "test".to_string(),
            filename: "ggml-test.bin".to_string(),
            url,
            size_mb: 0.0,
        };

        let setup = SetupManager::new(dir.path()).unwrap();
        assert!(setup.download_model(&model).await.is_err());
        assert!(!setup.model_exists(&model));
    }
}
