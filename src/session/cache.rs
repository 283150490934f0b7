//! session::cache
//!
//! Handle resolution and repository lifecycle.
//!
//! The cache holds one entry keyed by workspace path. An entry is replaced
//! wholesale when the path changes and cleared only by
//! [`GitSession::invalidate_cache`]; failures never evict it.

use std::sync::{Mutex, MutexGuard};

use crate::core::config::{DEFAULT_BRANCH, DEFAULT_COMMIT_LOG_LIMIT};
use crate::core::events::GitEvent;
use crate::core::types::{Credentials, OperationKind};
use crate::fs::{Backend, DirectoryHandle, FsError, FsHandle};
use crate::git::{Git, Transport};

use super::{GitSession, SessionError};

#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    workspace_path: String,
    handle: Option<FsHandle>,
    root_dir: String,
    backend: Backend,
}

#[derive(Debug, Default)]
pub(crate) struct SessionCache {
    entry: Mutex<Option<CacheEntry>>,
}

impl SessionCache {
    fn lock(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        self.entry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Root dir for backends addressed by workspace path.
fn path_root(workspace: &str) -> String {
    if workspace.is_empty() {
        "/".to_string()
    } else {
        workspace.to_string()
    }
}

impl GitSession {
    fn current_workspace_path(&self) -> String {
        self.state.workspace_path().unwrap_or_default()
    }

    fn resolve(&self, workspace: &str) -> Result<CacheEntry, FsError> {
        let backend = self.adapter.detect_backend(workspace);
        let directory = match backend {
            Backend::DirectoryHandle => self.adapter.directory_handle(workspace),
            _ => None,
        };

        let entry = match (backend, directory) {
            (Backend::Native, _) => CacheEntry {
                workspace_path: workspace.to_string(),
                handle: None,
                root_dir: path_root(workspace),
                backend,
            },
            (Backend::DirectoryHandle, Some(handle)) => CacheEntry {
                workspace_path: workspace.to_string(),
                handle: Some(self.adapter.build_handle_for_directory(&handle)),
                root_dir: "/".to_string(),
                backend,
            },
            _ => CacheEntry {
                workspace_path: workspace.to_string(),
                handle: Some(self.adapter.build_virtual_handle(workspace)?),
                root_dir: path_root(workspace),
                backend: Backend::Virtual,
            },
        };

        tracing::debug!(
            workspace,
            backend = %entry.backend,
            root = %entry.root_dir,
            "resolved git filesystem"
        );
        Ok(entry)
    }

    /// The cache entry for the current workspace, resolving it if stale.
    fn entry(&self) -> Option<CacheEntry> {
        let workspace = self.current_workspace_path();
        let mut cached = self.cache.lock();
        if let Some(entry) = cached.as_ref().filter(|e| e.workspace_path == workspace) {
            return Some(entry.clone());
        }

        match self.resolve(&workspace) {
            Ok(entry) => {
                *cached = Some(entry.clone());
                Some(entry)
            }
            Err(e) => {
                tracing::warn!(workspace = %workspace, error = %e, "could not open git filesystem");
                None
            }
        }
    }

    /// Filesystem handle for the current workspace.
    ///
    /// `None` under a native host, where git work belongs to the host.
    pub fn get_handle(&self) -> Option<FsHandle> {
        self.entry().and_then(|entry| entry.handle)
    }

    /// Directory the repository lives in, relative to the handle.
    ///
    /// `/` for directory capabilities; the workspace path otherwise.
    pub fn get_root_dir(&self) -> String {
        self.entry()
            .map(|entry| entry.root_dir)
            .unwrap_or_else(|| path_root(&self.current_workspace_path()))
    }

    /// Backend serving the current workspace.
    pub fn backend(&self) -> Backend {
        self.entry()
            .map(|entry| entry.backend)
            .unwrap_or_else(|| self.adapter.detect_backend(&self.current_workspace_path()))
    }

    /// Forget the resolved handle and root dir.
    pub fn invalidate_cache(&self) {
        *self.cache.lock() = None;
    }

    /// Whether the workspace root is inside a repository. Never fails.
    pub fn detect_repository(&self) -> bool {
        let Some(ws) = self.workspace() else {
            return false;
        };
        match ws.open_git() {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(root = %ws.root, error = %e, "no repository");
                false
            }
        }
    }

    /// Set up git state for the current workspace.
    ///
    /// Registers `directory` (if given) under the workspace path, re-resolves
    /// the handle and, when a repository is present, refreshes status,
    /// branches and log in that order.
    pub async fn initialize_for_workspace(&self, directory: Option<DirectoryHandle>) {
        if let Some(directory) = directory {
            let key = self
                .state
                .workspace_path()
                .filter(|path| !path.is_empty())
                .unwrap_or_else(|| directory.name().to_string());
            self.adapter.register_directory_handle(&key, directory);
        }

        self.invalidate_cache();
        if self.get_handle().is_none() {
            self.state.set_repo_initialized(false);
            return;
        }

        let is_repo = self.detect_repository();
        self.state.set_repo_initialized(is_repo);
        if is_repo {
            self.refresh_status().await;
            self.refresh_branches().await;
            self.fetch_commit_log(DEFAULT_COMMIT_LOG_LIMIT).await;
        }
    }

    /// Create a repository at the root dir with a `main` branch.
    ///
    /// Failures are recorded, not returned. Partial state is not rolled back.
    pub async fn initialize_repository(&self) {
        let Some(ws) = self.workspace() else {
            return;
        };
        let _guard = match self.begin(None) {
            Ok(guard) => guard,
            Err(e) => {
                self.record_error(&e);
                return;
            }
        };

        if let Err(e) = Git::init(&ws.host, DEFAULT_BRANCH) {
            self.record_error(&e);
            return;
        }
        tracing::info!(root = %ws.root, "initialized repository");

        self.state.set_repo_initialized(true);
        self.state.set_current_branch(DEFAULT_BRANCH.to_string());
        self.refresh_status().await;
        self.dispatch(GitEvent::StatusChanged);
    }

    /// Clone `url` into `dir` on `fs`.
    ///
    /// Shallow and single-branch. Progress is published as a percentage.
    /// Unlike most operations, failure is returned to the caller.
    pub async fn clone_repository(
        &self,
        url: &str,
        fs: &FsHandle,
        dir: &str,
        credentials: Option<Credentials>,
    ) -> Result<(), SessionError> {
        let _guard = self
            .begin(Some(OperationKind::Clone))
            .inspect_err(|e| self.record_error(e))?;

        let result = async {
            let dest = fs.host_path(dir)?;
            let transport = self
                .transport(credentials)
                .with_progress(self.progress_reporter());
            let url = url.to_string();
            tokio::task::spawn_blocking(move || {
                Git::clone_repo(&url, &dest, DEFAULT_BRANCH, &transport).map(|_| ())
            })
            .await
            .map_err(|e| SessionError::Task(e.to_string()))??;
            Ok::<(), SessionError>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.state.set_repo_initialized(true);
                self.dispatch(GitEvent::OperationComplete {
                    operation: OperationKind::Clone,
                    oid: None,
                });
                Ok(())
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Transport configured from settings and the given or stored credentials.
    pub(crate) fn transport(&self, credentials: Option<Credentials>) -> Transport {
        Transport::new()
            .with_cors_proxy(self.state.git_settings().cors_proxy_or_default())
            .with_auth(self.build_on_auth(credentials))
    }
}
