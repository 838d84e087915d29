//! Persistence of generated images.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::error::StorageError;
use crate::image::{output_file_name, ImageFormat};

/// Where generated images end up.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Saves one image and returns a locator for it (a path or URL).
    async fn save(
        &self,
        index: u8,
        bytes: &[u8],
        format: ImageFormat,
    ) -> Result<String, StorageError>;
}

/// Writes `generated_ugc_image_{index}.{ext}` files into a directory.
pub struct FsStorage {
    dir: PathBuf,
}

impl FsStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn save(
        &self,
        index: u8,
        bytes: &[u8],
        format: ImageFormat,
    ) -> Result<String, StorageError> {
        let path = self.dir.join(output_file_name(index, format));
        let io_err = |source| StorageError::Io {
            path: path.display().to_string(),
            source,
        };
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        tokio::fs::write(&path, bytes).await.map_err(io_err)?;
        info!(index, path = %path.display(), size = bytes.len(), "saved image");
        Ok(path.display().to_string())
    }
}
