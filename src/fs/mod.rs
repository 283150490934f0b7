//! fs
//!
//! Filesystem adapter: one I/O contract over three storage environments.
//!
//! # Backends
//!
//! - **Native**: the host exposes direct filesystem access. Git work is
//!   delegated to the host entirely, so no handle is built and every git
//!   operation through this crate is a no-op.
//! - **Directory handle**: a user-granted directory capability
//!   ([`DirectoryHandle`]). Paths are relative to the granted root.
//! - **Virtual**: a per-workspace store ([`VirtualFs`]) used when there is
//!   neither native access nor a granted directory.
//!
//! # Architecture
//!
//! [`FsAdapter`] decides which backend applies and constructs handles. It does
//! not cache handles; the session cache owns that. Handles are shared as
//! [`FsHandle`] (`Arc<dyn FileSystem>`) and borrowed per call.
//!
//! # Paths
//!
//! All paths are `/`-separated and interpreted relative to the handle's root.
//! `..` may not climb above the root ([`FsError::OutsideRoot`]).
//!
//! # Example
//!
//! ```no_run
//! use editor_git::fs::{Backend, DirectoryHandle, FsAdapter, HostEnvironment};
//!
//! # async fn demo() -> Result<(), editor_git::fs::FsError> {
//! let adapter = FsAdapter::new(HostEnvironment::sandboxed(), "/tmp/egit-virtual");
//! adapter.register_directory_handle("/projects/notes", DirectoryHandle::grant("/projects/notes")?);
//! assert_eq!(adapter.detect_backend("/projects/notes"), Backend::DirectoryHandle);
//!
//! let handle = adapter.directory_handle("/projects/notes").unwrap();
//! let fs = adapter.build_handle_for_directory(&handle);
//! fs.write_file("/docs/readme.md", b"# notes\n").await?;
//! # Ok(())
//! # }
//! ```

mod directory;
mod virtual_store;

pub use directory::{DirectoryHandle, DirectoryHandleFs};
pub use virtual_store::VirtualFs;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

/// Namespace used for the virtual store when no workspace path is set.
pub const DEFAULT_VIRTUAL_NAMESPACE: &str = "editor-git-default";

/// Errors from filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file or directory: {path}")]
    NotFound { path: String },

    #[error("file already exists: {path}")]
    AlreadyExists { path: String },

    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    #[error("is a directory: {path}")]
    IsADirectory { path: String },

    #[error("directory not empty: {path}")]
    NotEmpty { path: String },

    #[error("path escapes the filesystem root: {path}")]
    OutsideRoot { path: String },

    #[error("not a directory capability: {path}")]
    InvalidHandle { path: PathBuf },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl FsError {
    /// Map an I/O error onto the backend-neutral variants.
    pub(crate) fn from_io(path: &str, err: std::io::Error) -> Self {
        let path = path.to_string();
        match err.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound { path },
            std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists { path },
            _ => FsError::Io { path, source: err },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }
}

/// Which storage environment a handle talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Native,
    DirectoryHandle,
    Virtual,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::DirectoryHandle => "directory-handle",
            Backend::Virtual => "virtual",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// Result of `stat`/`lstat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsStat {
    pub kind: EntryKind,
    pub size: u64,
    pub mode: u32,
    pub mtime_ms: i64,
}

impl FsStat {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_symbolic_link(&self) -> bool {
        self.kind == EntryKind::Symlink
    }

    pub(crate) fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let kind = if meta.file_type().is_symlink() {
            EntryKind::Symlink
        } else if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let mode = match kind {
            EntryKind::Directory => 0o040755,
            EntryKind::Symlink => 0o120000,
            EntryKind::File => 0o100644,
        };
        let mtime_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        Self {
            kind,
            size: if kind == EntryKind::File { meta.len() } else { 0 },
            mode,
            mtime_ms,
        }
    }
}

/// The capability set every backend implements.
#[async_trait]
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    /// The backend behind this handle.
    fn backend(&self) -> Backend;

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError>;

    /// Read a file as text, replacing invalid UTF-8.
    async fn read_to_string(&self, path: &str) -> Result<String, FsError> {
        let bytes = self.read_file(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), FsError>;

    async fn mkdir(&self, path: &str) -> Result<(), FsError>;

    async fn rmdir(&self, path: &str) -> Result<(), FsError>;

    async fn unlink(&self, path: &str) -> Result<(), FsError>;

    async fn stat(&self, path: &str) -> Result<FsStat, FsError>;

    async fn lstat(&self, path: &str) -> Result<FsStat, FsError> {
        self.stat(path).await
    }

    /// Entry names (not paths) of a directory.
    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError>;

    /// Host location backing `path`, for libgit2 which needs real paths.
    fn host_path(&self, path: &str) -> Result<PathBuf, FsError>;
}

/// Shared handle to a filesystem backend.
pub type FsHandle = Arc<dyn FileSystem>;

/// Split a `/`-separated path into normalized components.
///
/// `.` and empty components are dropped; `..` pops, and may not climb above
/// the root.
pub(crate) fn components(path: &str) -> Result<Vec<&str>, FsError> {
    let mut parts = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(FsError::OutsideRoot {
                        path: path.to_string(),
                    });
                }
            }
            other if other.contains('\0') => {
                return Err(FsError::OutsideRoot {
                    path: path.to_string(),
                })
            }
            other => parts.push(other),
        }
    }
    Ok(parts)
}

/// Resolve `path` beneath `root`.
pub(crate) fn resolve_under(root: &Path, path: &str) -> Result<PathBuf, FsError> {
    let mut resolved = root.to_path_buf();
    for part in components(path)? {
        resolved.push(part);
    }
    Ok(resolved)
}

/// Description of the runtime the adapter runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostEnvironment {
    /// The host performs git work with direct filesystem access
    pub native_fs: bool,
}

impl HostEnvironment {
    /// A host that owns git work itself.
    pub fn native() -> Self {
        Self { native_fs: true }
    }

    /// A host without direct access: directory capabilities or virtual store.
    pub fn sandboxed() -> Self {
        Self { native_fs: false }
    }
}

/// Backend selection and handle construction.
#[derive(Debug)]
pub struct FsAdapter {
    host: HostEnvironment,
    virtual_root: PathBuf,
    handles: RwLock<HashMap<String, DirectoryHandle>>,
}

impl FsAdapter {
    pub fn new(host: HostEnvironment, virtual_root: impl Into<PathBuf>) -> Self {
        Self {
            host,
            virtual_root: virtual_root.into(),
            handles: RwLock::new(HashMap::new()),
        }
    }

    pub fn host(&self) -> HostEnvironment {
        self.host
    }

    pub fn is_native(&self) -> bool {
        self.host.native_fs
    }

    /// Whether `workspace_path` would be served by a directory capability.
    pub fn is_directory_handle(&self, workspace_path: &str) -> bool {
        self.detect_backend(workspace_path) == Backend::DirectoryHandle
    }

    /// Whether `workspace_path` would be served by the virtual store.
    pub fn is_virtual(&self, workspace_path: &str) -> bool {
        self.detect_backend(workspace_path) == Backend::Virtual
    }

    /// Pick the backend for a workspace: native, then a registered directory
    /// capability, then the virtual store.
    pub fn detect_backend(&self, workspace_path: &str) -> Backend {
        if self.host.native_fs {
            Backend::Native
        } else if self.directory_handle(workspace_path).is_some() {
            Backend::DirectoryHandle
        } else {
            Backend::Virtual
        }
    }

    /// Associate a granted directory with a workspace path.
    ///
    /// Replaces any earlier registration for the same path. Callers must
    /// invalidate the session cache afterwards.
    pub fn register_directory_handle(&self, workspace_path: &str, handle: DirectoryHandle) {
        tracing::debug!(workspace = workspace_path, root = %handle.root().display(), "registered directory handle");
        self.handles
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(workspace_path.to_string(), handle);
    }

    pub fn directory_handle(&self, workspace_path: &str) -> Option<DirectoryHandle> {
        self.handles
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(workspace_path)
            .cloned()
    }

    /// Build a handle over a granted directory.
    pub fn build_handle_for_directory(&self, handle: &DirectoryHandle) -> FsHandle {
        Arc::new(DirectoryHandleFs::new(handle.clone()))
    }

    /// Build a handle over the virtual store for `workspace_id`.
    ///
    /// An empty id selects [`DEFAULT_VIRTUAL_NAMESPACE`].
    pub fn build_virtual_handle(&self, workspace_id: &str) -> Result<FsHandle, FsError> {
        let namespace = virtual_namespace(workspace_id);
        Ok(Arc::new(VirtualFs::open(&self.virtual_root, namespace)?))
    }

    /// Wipe the virtual store for `workspace_id`.
    pub fn delete_virtual_store(&self, workspace_id: &str) -> Result<(), FsError> {
        let namespace = virtual_namespace(workspace_id);
        VirtualFs::destroy(&self.virtual_root, namespace)
    }
}

fn virtual_namespace(workspace_id: &str) -> &str {
    if workspace_id.is_empty() {
        DEFAULT_VIRTUAL_NAMESPACE
    } else {
        workspace_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    mod paths {
        use super::*;

        #[test]
        fn components_normalize() {
            assert_eq!(components("/a/./b//c/").unwrap(), vec!["a", "b", "c"]);
            assert_eq!(components("a/b/../c").unwrap(), vec!["a", "c"]);
            assert!(components("/").unwrap().is_empty());
            assert!(components("").unwrap().is_empty());
        }

        #[test]
        fn components_reject_escape() {
            assert!(matches!(
                components("../etc/passwd"),
                Err(FsError::OutsideRoot { .. })
            ));
            assert!(matches!(
                components("/a/../../b"),
                Err(FsError::OutsideRoot { .. })
            ));
        }

        #[test]
        fn resolve_under_joins() {
            let resolved = resolve_under(Path::new("/root"), "/x/y.txt").unwrap();
            assert_eq!(resolved, PathBuf::from("/root/x/y.txt"));
        }
    }

    mod detection {
        use super::*;

        #[test]
        fn native_wins() {
            let tmp = TempDir::new().unwrap();
            let adapter = FsAdapter::new(HostEnvironment::native(), tmp.path());
            adapter.register_directory_handle("/ws", DirectoryHandle::grant(tmp.path()).unwrap());
            assert_eq!(adapter.detect_backend("/ws"), Backend::Native);
            assert!(adapter.is_native());
        }

        #[test]
        fn registered_directory_beats_virtual() {
            let tmp = TempDir::new().unwrap();
            let adapter = FsAdapter::new(HostEnvironment::sandboxed(), tmp.path().join("v"));
            assert_eq!(adapter.detect_backend("/ws"), Backend::Virtual);

            adapter.register_directory_handle("/ws", DirectoryHandle::grant(tmp.path()).unwrap());
            assert_eq!(adapter.detect_backend("/ws"), Backend::DirectoryHandle);
            assert!(adapter.is_directory_handle("/ws"));
            assert!(adapter.is_virtual("/other"));
        }
    }

    mod construction {
        use super::*;

        #[tokio::test]
        async fn virtual_handles_share_a_namespace_store() {
            let tmp = TempDir::new().unwrap();
            let adapter = FsAdapter::new(HostEnvironment::sandboxed(), tmp.path());

            let first = adapter.build_virtual_handle("/ws").unwrap();
            first.write_file("/hello.txt", b"hi").await.unwrap();

            let second = adapter.build_virtual_handle("/ws").unwrap();
            assert_eq!(second.read_file("/hello.txt").await.unwrap(), b"hi");
            assert_eq!(second.backend(), Backend::Virtual);

            let other = adapter.build_virtual_handle("/elsewhere").unwrap();
            assert!(other.read_file("/hello.txt").await.unwrap_err().is_not_found());
        }

        #[tokio::test]
        async fn empty_workspace_uses_default_namespace() {
            let tmp = TempDir::new().unwrap();
            let adapter = FsAdapter::new(HostEnvironment::sandboxed(), tmp.path());
            let a = adapter.build_virtual_handle("").unwrap();
            let b = adapter.build_virtual_handle(DEFAULT_VIRTUAL_NAMESPACE).unwrap();
            a.write_file("/x", b"1").await.unwrap();
            assert_eq!(b.read_file("/x").await.unwrap(), b"1");
        }

        #[tokio::test]
        async fn delete_virtual_store_wipes_data() {
            let tmp = TempDir::new().unwrap();
            let adapter = FsAdapter::new(HostEnvironment::sandboxed(), tmp.path());
            let fs = adapter.build_virtual_handle("/ws").unwrap();
            fs.write_file("/a.txt", b"a").await.unwrap();

            adapter.delete_virtual_store("/ws").unwrap();
            let fresh = adapter.build_virtual_handle("/ws").unwrap();
            assert!(fresh.read_file("/a.txt").await.is_err());
        }
    }
}
