//! Per-workspace virtual store.
//!
//! Each namespace lives in its own directory under the store root, named by
//! a digest of the namespace so arbitrary workspace identities map to safe
//! directory names. Semantics are strict: parents must exist, `rmdir` only
//! removes empty directories.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{components, resolve_under, Backend, FileSystem, FsError, FsStat};

/// Hex characters of the namespace digest used as the directory name.
const NAMESPACE_DIGEST_LEN: usize = 32;

/// [`FileSystem`] over a named virtual store.
#[derive(Debug, Clone)]
pub struct VirtualFs {
    namespace: String,
    root: PathBuf,
}

impl VirtualFs {
    /// Open (creating if needed) the store for `namespace`.
    pub fn open(store_root: &Path, namespace: &str) -> Result<Self, FsError> {
        let root = Self::store_dir(store_root, namespace);
        std::fs::create_dir_all(&root).map_err(|e| FsError::from_io(namespace, e))?;
        Ok(Self {
            namespace: namespace.to_string(),
            root,
        })
    }

    /// Remove the store for `namespace`. Missing stores are ignored.
    pub fn destroy(store_root: &Path, namespace: &str) -> Result<(), FsError> {
        let root = Self::store_dir(store_root, namespace);
        match std::fs::remove_dir_all(&root) {
            Ok(()) => {
                tracing::info!(namespace, "deleted virtual store");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::from_io(namespace, e)),
        }
    }

    fn store_dir(store_root: &Path, namespace: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(namespace.as_bytes()));
        store_root.join(&digest[..NAMESPACE_DIGEST_LEN])
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FsError> {
        resolve_under(&self.root, path)
    }

    /// Fail unless the parent of `path` exists and is a directory.
    async fn require_parent(&self, path: &str) -> Result<PathBuf, FsError> {
        let parts = components(path)?;
        let Some((_, parent)) = parts.split_last() else {
            return Err(FsError::AlreadyExists {
                path: path.to_string(),
            });
        };
        let parent_path = parent.join("/");
        let parent_dir = self.resolve(&parent_path)?;
        match tokio::fs::metadata(&parent_dir).await {
            Ok(meta) if meta.is_dir() => Ok(self.resolve(path)?),
            Ok(_) => Err(FsError::NotADirectory { path: parent_path }),
            Err(_) => Err(FsError::NotFound { path: parent_path }),
        }
    }
}

#[async_trait]
impl FileSystem for VirtualFs {
    fn backend(&self) -> Backend {
        Backend::Virtual
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let target = self.resolve(path)?;
        if target.is_dir() {
            return Err(FsError::IsADirectory {
                path: path.to_string(),
            });
        }
        tokio::fs::read(&target)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), FsError> {
        let target = self.require_parent(path).await?;
        if target.is_dir() {
            return Err(FsError::IsADirectory {
                path: path.to_string(),
            });
        }
        tokio::fs::write(&target, data)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn mkdir(&self, path: &str) -> Result<(), FsError> {
        let target = self.require_parent(path).await?;
        tokio::fs::create_dir(&target)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn rmdir(&self, path: &str) -> Result<(), FsError> {
        if components(path)?.is_empty() {
            return Err(FsError::OutsideRoot {
                path: path.to_string(),
            });
        }
        let target = self.resolve(path)?;
        let meta = tokio::fs::metadata(&target)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        if !meta.is_dir() {
            return Err(FsError::NotADirectory {
                path: path.to_string(),
            });
        }
        let mut entries = tokio::fs::read_dir(&target)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        if entries
            .next_entry()
            .await
            .map_err(|e| FsError::from_io(path, e))?
            .is_some()
        {
            return Err(FsError::NotEmpty {
                path: path.to_string(),
            });
        }
        tokio::fs::remove_dir(&target)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn unlink(&self, path: &str) -> Result<(), FsError> {
        let target = self.resolve(path)?;
        if target.is_dir() {
            return Err(FsError::IsADirectory {
                path: path.to_string(),
            });
        }
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn stat(&self, path: &str) -> Result<FsStat, FsError> {
        let target = self.resolve(path)?;
        let meta = tokio::fs::metadata(&target)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        Ok(FsStat::from_metadata(&meta))
    }

    async fn lstat(&self, path: &str) -> Result<FsStat, FsError> {
        let target = self.resolve(path)?;
        let meta = tokio::fs::symlink_metadata(&target)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        Ok(FsStat::from_metadata(&meta))
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        let target = self.resolve(path)?;
        if target.is_file() {
            return Err(FsError::NotADirectory {
                path: path.to_string(),
            });
        }
        let mut entries = tokio::fs::read_dir(&target)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FsError::from_io(path, e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn host_path(&self, path: &str) -> Result<PathBuf, FsError> {
        self.resolve(path)
    }
}
