use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use crate::config::UploadConfig;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File type not allowed")]
    UnsupportedType,

    #[error("File exceeds the {0} byte limit")]
    TooLarge(usize),

    #[error("File name is missing")]
    MissingName,

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

/// A file received from a multipart form, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Stores uploaded images on disk under random names and hands back the
/// relative path that gets persisted.
pub struct UploadStore {
    root: PathBuf,
    max_file_size: usize,
}

impl UploadStore {
    #[must_use]
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root_path),
            max_file_size: config.max_file_size_bytes,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn validate(&self, upload: &ImageUpload) -> Result<(), UploadError> {
        if upload.file_name.trim().is_empty() {
            return Err(UploadError::MissingName);
        }

        let content_type = upload.content_type.clone().or_else(|| {
            mime_guess::from_path(&upload.file_name)
                .first()
                .map(|m| m.essence_str().to_string())
        });

        if !content_type.is_some_and(|t| t.starts_with("image/")) {
            return Err(UploadError::UnsupportedType);
        }

        if upload.bytes.len() > self.max_file_size {
            return Err(UploadError::TooLarge(self.max_file_size));
        }

        Ok(())
    }

    /// Writes the image under `<root>/<subdir>/` and returns the stored path
    /// relative to the root's parent, e.g. `uploads/categories/<hex>-cup.png`.
    pub async fn save(&self, subdir: &str, upload: ImageUpload) -> Result<String, UploadError> {
        self.validate(&upload)?;

        let dir = self.root.join(subdir);
        fs::create_dir_all(&dir).await?;

        let filename = format!(
            "{}-{}",
            random_prefix(),
            sanitize_file_name(&upload.file_name)
        );
        let file_path = dir.join(&filename);

        fs::write(&file_path, &upload.bytes).await?;
        info!(path = %file_path.display(), size = upload.bytes.len(), "Stored upload");

        Ok(format!("{}/{subdir}/{filename}", self.root_name()))
    }

    /// Best-effort removal; failures are logged, never returned.
    pub async fn delete(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            warn!(path = relative, "Refusing to delete path outside upload root");
            return;
        };

        if let Err(e) = fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to delete upload");
        }
    }

    /// Maps a stored relative path back onto disk. `None` if it would escape
    /// the upload root.
    #[must_use]
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let prefix = format!("{}/", self.root_name());
        let rest = Path::new(relative.strip_prefix(&prefix)?);
        if rest
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }

        Some(self.root.join(rest))
    }

    fn root_name(&self) -> String {
        self.root
            .file_name()
            .map_or_else(|| "uploads".to_string(), |n| n.to_string_lossy().into_owned())
    }
}

fn random_prefix() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 8] = rng.random();

    bytes.iter().fold(String::with_capacity(16), |mut acc, b| {
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map_or_else(|| name.to_string(), |n| n.to_string_lossy().into_owned());

    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
