use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

/// Where uploaded evidence and voice notes end up.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key` and return a URL the client can fetch it from.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String>;
}

/// Stores objects as plain files under `dir`. The server exposes `dir` at `/files`.
pub struct LocalStore {
    dir: PathBuf,
    public_base: String,
}

impl LocalStore {
    pub async fn new(dir: PathBuf, public_url: &str) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self {
            dir,
            public_base: format!("{}/files", public_url.trim_end_matches('/')),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path on disk for a key. Keys may contain `/` but never climb out of `dir`.
    pub fn file_path(&self, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key);
        if key.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            bail!("Invalid object key: {}", key);
        }
        Ok(self.dir.join(rel))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        let path = self.file_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &data).await?;
        debug!("Stored {} ({} bytes, {})", key, data.len(), content_type);

        Ok(format!("{}/{}", self.public_base, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_file_and_returns_url() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path().join("uploads"), "http://localhost:3000/")
            .await
            .unwrap();

        let url = store
            .put("7-uploads/abc-photo.jpg", b"jpeg bytes".to_vec(), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:3000/files/7-uploads/abc-photo.jpg");

        let on_disk = std::fs::read(store.dir().join("7-uploads/abc-photo.jpg")).unwrap();
        assert_eq!(on_disk, b"jpeg bytes");
    }

    #[tokio::test]
    async fn keys_cannot_escape() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path().to_path_buf(), "http://x").await.unwrap();

        assert!(store.file_path("../etc/passwd").is_err());
        assert!(store.file_path("/etc/passwd").is_err());
        assert!(store.file_path("a/./b").is_ok());
        assert!(store.file_path("").is_err());
    }
}
