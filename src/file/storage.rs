//! Blob storage on the local disk.
//!
//! Blobs live in a single flat directory under freshly generated UUID names:
//! ```text
//! {root}/
//! ├── 1f0c7a52-...            original upload
//! ├── 1f0c7a52-..._500        thumbnail variants
//! ├── 1f0c7a52-..._250
//! └── 1f0c7a52-..._100
//! ```

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::{Result, VaultError};

/// Blob store rooted at one directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a blob store. The root directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write content under a new generated name and return its full path.
    pub async fn save(&self, content: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.root).await?;

        let path = self.root.join(Self::generate_name());
        fs::write(&path, content).await?;
        Ok(path)
    }

    /// Read a blob. A missing file is `NotFound`.
    pub async fn load(&self, path: &Path) -> Result<Vec<u8>> {
        match fs::read(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(VaultError::NotFound("blob".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob.
    ///
    /// Returns `true` if the file was deleted, `false` if it didn't exist.
    pub async fn delete(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether a blob exists.
    pub async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    /// Path of the resized variant of a blob: `<blob>_<size>`.
    pub fn variant_path(path: &Path, size: u32) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(format!("_{size}"));
        PathBuf::from(name)
    }

    /// Generate a new blob name.
    pub fn generate_name() -> String {
        Uuid::new_v4().to_string()
    }
}
