//! Directory-capability backend.
//!
//! Behaves like a granted directory handle: intermediate directories are
//! created on demand and `rmdir` removes whole subtrees. `lstat` reports
//! symlinks on the backing directory as links, the way git records them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{components, resolve_under, Backend, FileSystem, FsError, FsStat};

/// A user-granted directory capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryHandle {
    name: String,
    root: PathBuf,
}

impl DirectoryHandle {
    /// Grant access to an existing directory.
    pub fn grant(root: impl AsRef<Path>) -> Result<Self, FsError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(FsError::InvalidHandle {
                path: root.to_path_buf(),
            });
        }
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());
        Ok(Self {
            name,
            root: root.to_path_buf(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// [`FileSystem`] over a [`DirectoryHandle`].
#[derive(Debug, Clone)]
pub struct DirectoryHandleFs {
    handle: DirectoryHandle,
}

impl DirectoryHandleFs {
    pub fn new(handle: DirectoryHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &DirectoryHandle {
        &self.handle
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FsError> {
        resolve_under(self.handle.root(), path)
    }
}

#[async_trait]
impl FileSystem for DirectoryHandleFs {
    fn backend(&self) -> Backend {
        Backend::DirectoryHandle
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
        if components(path)?.is_empty() {
            return Err(FsError::IsADirectory {
                path: path.to_string(),
            });
        }
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FsError::from_io(path, e))?;
        }
        tokio::fs::write(&target, data)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn mkdir(&self, path: &str) -> Result<(), FsError> {
        let target = self.resolve(path)?;
        tokio::fs::create_dir_all(&target)
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
        tokio::fs::remove_dir_all(&target)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn unlink(&self, path: &str) -> Result<(), FsError> {
        let target = self.resolve(path)?;
        if target.is_dir() && !target.is_symlink() {
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
        let mut entries = tokio::fs::read_dir(&target).await.map_err(|e| {
            if target.is_file() {
                FsError::NotADirectory {
                    path: path.to_string(),
                }
            } else {
                FsError::from_io(path, e)
            }
        })?;

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
