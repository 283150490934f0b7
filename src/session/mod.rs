//! session
//!
//! The per-workspace git session.
//!
//! # Architecture
//!
//! A [`GitSession`] owns everything with a lifetime longer than one call:
//! the filesystem adapter, the cached `(handle, root dir)` pair, the
//! operation slot and the auto-fetch timer. Controllers are methods on the
//! session, grouped by concern:
//!
//! - [`cache`]: handle resolution, repository detection, init and clone
//! - [`status`]: the status matrix and index mutation
//! - [`commit`]: commits
//! - [`branch`]: checkout, create, delete, listing
//! - [`remote`]: push, pull, fetch, remotes
//! - [`log`]: history, blobs at HEAD, staged-change summary
//! - [`auto_fetch`]: background fetch timer
//!
//! Results flow out only through [`GitStateStore`] setters and
//! [`EventBus`] events.
//!
//! # Invariants
//!
//! - At most one long-running operation (commit, push, pull, fetch, clone,
//!   init) runs at a time; the slot's release hook always resets
//!   in-progress, kind and progress
//! - A missing filesystem handle turns every controller into a no-op, except
//!   `create_commit` which fails with [`SessionError::NoFilesystem`]
//! - Dropping the session stops auto-fetch
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use editor_git::core::config::Config;
//! use editor_git::core::events::EventBus;
//! use editor_git::core::state::MemoryStateStore;
//! use editor_git::fs::{DirectoryHandle, HostEnvironment};
//! use editor_git::session::GitSession;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStateStore::new());
//! store.set_workspace_path(Some("/projects/notes".into()));
//!
//! let session = GitSession::new(&Config::load()?, HostEnvironment::sandboxed(), store.clone(), EventBus::new());
//! session
//!     .initialize_for_workspace(Some(DirectoryHandle::grant("/projects/notes")?))
//!     .await;
//!
//! if let Some(status) = store.snapshot().git_status {
//!     println!("{} changed files", status.changed_count());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auto_fetch;
pub mod branch;
pub mod cache;
pub mod commit;
pub mod log;
pub mod remote;
pub mod status;

pub use auto_fetch::AutoFetchScheduler;
pub use status::{classify, Classification, StatusRow};

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::core::config::Config;
use crate::core::events::{EventBus, GitEvent};
use crate::core::ops::{OperationSlot, SlotError, SlotGuard};
use crate::core::state::GitStateStore;
use crate::core::types::{OperationKind, TypeError};
use crate::fs::{FsAdapter, FsError, FsHandle, HostEnvironment};
use crate::git::{Git, GitError};

use cache::SessionCache;

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No filesystem handle could be resolved for the workspace.
    #[error("no filesystem available")]
    NoFilesystem,

    /// Another long-running operation holds the slot.
    #[error(transparent)]
    OperationInProgress(#[from] SlotError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    InvalidName(#[from] TypeError),

    /// A blocking git task panicked or was cancelled.
    #[error("background git task failed: {0}")]
    Task(String),
}

/// A resolved workspace: handle, root dir and the host path libgit2 uses.
#[derive(Debug, Clone)]
pub(crate) struct Workspace {
    pub fs: FsHandle,
    pub root: String,
    /// Host location of `root`
    pub host: PathBuf,
    /// Host location of the handle root; repository discovery stops here
    pub boundary: PathBuf,
}

impl Workspace {
    fn open_git(&self) -> Result<Git, GitError> {
        Git::open_within(&self.host, &self.boundary)
    }
}

/// Per-workspace git session.
pub struct GitSession {
    adapter: FsAdapter,
    state: Arc<dyn GitStateStore>,
    events: EventBus,
    slot: OperationSlot,
    cache: SessionCache,
    auto_fetch: AutoFetchScheduler,
}

impl std::fmt::Debug for GitSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitSession")
            .field("adapter", &self.adapter)
            .field("slot", &self.slot)
            .field("auto_fetch", &self.auto_fetch.is_running())
            .finish()
    }
}

impl GitSession {
    pub fn new(
        config: &Config,
        host: HostEnvironment,
        state: Arc<dyn GitStateStore>,
        events: EventBus,
    ) -> Self {
        Self {
            adapter: FsAdapter::new(host, config.virtual_root()),
            state,
            events,
            slot: OperationSlot::new(),
            cache: SessionCache::default(),
            auto_fetch: AutoFetchScheduler::new(),
        }
    }

    pub fn adapter(&self) -> &FsAdapter {
        &self.adapter
    }

    pub fn state(&self) -> &Arc<dyn GitStateStore> {
        &self.state
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn slot(&self) -> &OperationSlot {
        &self.slot
    }

    /// Resolve the workspace, or `None` when there is no handle.
    pub(crate) fn workspace(&self) -> Option<Workspace> {
        let fs = self.get_handle()?;
        let root = self.get_root_dir();
        let paths = fs.host_path(&root).and_then(|host| Ok((host, fs.host_path("/")?)));
        match paths {
            Ok((host, boundary)) => Some(Workspace {
                fs,
                root,
                host,
                boundary,
            }),
            Err(e) => {
                tracing::warn!(root = %root, error = %e, "workspace root is not addressable");
                None
            }
        }
    }

    /// Occupy the operation slot and publish the in-progress state.
    ///
    /// The returned guard resets in-progress, kind and progress on release.
    pub(crate) fn begin(&self, kind: Option<OperationKind>) -> Result<SlotGuard, SlotError> {
        let label = kind.map(|k| k.as_str()).unwrap_or("init");
        let guard = self.slot.acquire(label)?;

        self.state.set_git_operation_in_progress(true);
        self.state.set_current_git_operation(kind);
        self.state.set_git_operation_progress(0);
        self.state.set_git_operation_error(None);

        let state = self.state.clone();
        Ok(guard.on_release(move || {
            state.set_git_operation_in_progress(false);
            state.set_current_git_operation(None);
            state.set_git_operation_progress(0);
        }))
    }

    /// Write an error's display form to the shared error field.
    pub(crate) fn record_error(&self, err: &dyn std::fmt::Display) {
        let message = err.to_string();
        tracing::warn!(error = %message, "git operation failed");
        self.state.set_git_operation_error(Some(message));
    }

    pub(crate) fn dispatch(&self, event: GitEvent) {
        self.events.dispatch(event);
    }

    /// Run a blocking git operation against the workspace repository.
    pub(crate) async fn run_blocking<T, F>(&self, ws: &Workspace, op: F) -> Result<T, SessionError>
    where
        T: Send + 'static,
        F: FnOnce(&Git) -> Result<T, GitError> + Send + 'static,
    {
        let ws = ws.clone();
        tokio::task::spawn_blocking(move || {
            let git = ws.open_git()?;
            op(&git)
        })
        .await
        .map_err(|e| SessionError::Task(e.to_string()))?
        .map_err(SessionError::from)
    }
}

impl Drop for GitSession {
    fn drop(&mut self) {
        self.auto_fetch.stop();
    }
}
