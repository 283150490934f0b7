//! core::state
//!
//! Contract with the host application's state container.
//!
//! # Design
//!
//! The git core never owns application state. It reads the workspace path,
//! author, credentials and settings through [`GitStateStore`] and publishes
//! results exclusively through its typed setters. The host decides how the
//! state is stored and rendered.
//!
//! [`MemoryStateStore`] is a thread-safe in-process implementation used by the
//! `egit` binary and by tests.
//!
//! # Example
//!
//! ```
//! use editor_git::core::state::{GitStateStore, MemoryStateStore};
//!
//! let store = MemoryStateStore::new();
//! store.set_workspace_path(Some("/projects/notes".to_string()));
//! store.set_current_branch("main".to_string());
//!
//! let snapshot = store.snapshot();
//! assert_eq!(snapshot.current_branch, "main");
//! assert!(!snapshot.is_repo_initialized);
//! ```

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::core::config::{default_author, GitSettings, DEFAULT_BRANCH};
use crate::core::types::{
    Author, Branch, CommitRecord, Credentials, OpenBuffer, OperationKind, OperationState, Remote,
    RepositoryStatus,
};

/// Reads and typed setters the git core uses on the host's state container.
///
/// Implementations must be thread-safe: progress callbacks fire from the
/// blocking transport thread.
pub trait GitStateStore: Send + Sync {
    // Reads

    /// Current workspace identity, `None` when no workspace is open.
    fn workspace_path(&self) -> Option<String>;
    fn git_author(&self) -> Author;
    fn git_credentials(&self) -> Option<Credentials>;
    fn git_settings(&self) -> GitSettings;
    fn is_repo_initialized(&self) -> bool;
    fn is_git_operation_in_progress(&self) -> bool;
    fn current_branch(&self) -> String;
    fn git_status(&self) -> Option<RepositoryStatus>;
    /// Contents of open editor buffers.
    fn open_buffers(&self) -> Vec<OpenBuffer>;

    // Setters

    fn set_repo_initialized(&self, initialized: bool);
    fn set_current_branch(&self, branch: String);
    fn set_branches(&self, branches: Vec<Branch>);
    fn set_remotes(&self, remotes: Vec<Remote>);
    fn set_git_status(&self, status: Option<RepositoryStatus>);
    fn set_commit_log(&self, commits: Vec<CommitRecord>);
    fn set_git_operation_in_progress(&self, in_progress: bool);
    fn set_current_git_operation(&self, operation: Option<OperationKind>);
    fn set_git_operation_progress(&self, progress: u8);
    fn set_git_operation_error(&self, error: Option<String>);
}

/// Everything [`MemoryStateStore`] holds, as a plain value.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitStateSnapshot {
    pub workspace_path: Option<String>,
    pub git_author: Author,
    #[serde(skip)]
    pub git_credentials: Option<Credentials>,
    pub git_settings: GitSettings,
    pub is_repo_initialized: bool,
    pub current_branch: String,
    pub branches: Vec<Branch>,
    pub remotes: Vec<Remote>,
    pub git_status: Option<RepositoryStatus>,
    pub commit_log: Vec<CommitRecord>,
    pub operation: OperationState,
    #[serde(skip)]
    pub open_buffers: Vec<OpenBuffer>,
}

impl Default for GitStateSnapshot {
    fn default() -> Self {
        Self {
            workspace_path: None,
            git_author: default_author(),
            git_credentials: None,
            git_settings: GitSettings::default(),
            is_repo_initialized: false,
            current_branch: DEFAULT_BRANCH.to_string(),
            branches: Vec::new(),
            remotes: Vec::new(),
            git_status: None,
            commit_log: Vec::new(),
            operation: OperationState::default(),
            open_buffers: Vec::new(),
        }
    }
}

/// Thread-safe in-memory state container.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    inner: Mutex<GitStateSnapshot>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed author and settings (typically from [`crate::core::config::Config`]).
    pub fn with_defaults(author: Author, settings: GitSettings) -> Self {
        let store = Self::new();
        store.set_git_author(author);
        store.update_git_settings(settings);
        store
    }

    fn lock(&self) -> MutexGuard<'_, GitStateSnapshot> {
        // A panicking writer cannot leave a snapshot half-updated: every
        // setter replaces whole fields.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the full state.
    pub fn snapshot(&self) -> GitStateSnapshot {
        self.lock().clone()
    }

    // Host-side setters, not part of the core contract.

    pub fn set_workspace_path(&self, path: Option<String>) {
        self.lock().workspace_path = path;
    }

    pub fn set_git_credentials(&self, credentials: Option<Credentials>) {
        self.lock().git_credentials = credentials;
    }

    pub fn set_git_author(&self, author: Author) {
        self.lock().git_author = author;
    }

    pub fn update_git_settings(&self, settings: GitSettings) {
        self.lock().git_settings = settings;
    }

    pub fn set_open_buffers(&self, buffers: Vec<OpenBuffer>) {
        self.lock().open_buffers = buffers;
    }
}

impl GitStateStore for MemoryStateStore {
    fn workspace_path(&self) -> Option<String> {
        self.lock().workspace_path.clone()
    }

    fn git_author(&self) -> Author {
        self.lock().git_author.clone()
    }

    fn git_credentials(&self) -> Option<Credentials> {
        self.lock().git_credentials.clone()
    }

    fn git_settings(&self) -> GitSettings {
        self.lock().git_settings.clone()
    }

    fn is_repo_initialized(&self) -> bool {
        self.lock().is_repo_initialized
    }

    fn is_git_operation_in_progress(&self) -> bool {
        self.lock().operation.in_progress
    }

    fn current_branch(&self) -> String {
        self.lock().current_branch.clone()
    }

    fn git_status(&self) -> Option<RepositoryStatus> {
        self.lock().git_status.clone()
    }

    fn open_buffers(&self) -> Vec<OpenBuffer> {
        self.lock().open_buffers.clone()
    }

    fn set_repo_initialized(&self, initialized: bool) {
        self.lock().is_repo_initialized = initialized;
    }

    fn set_current_branch(&self, branch: String) {
        self.lock().current_branch = branch;
    }

    fn set_branches(&self, branches: Vec<Branch>) {
        self.lock().branches = branches;
    }

    fn set_remotes(&self, remotes: Vec<Remote>) {
        self.lock().remotes = remotes;
    }

    fn set_git_status(&self, status: Option<RepositoryStatus>) {
        self.lock().git_status = status;
    }

    fn set_commit_log(&self, commits: Vec<CommitRecord>) {
        self.lock().commit_log = commits;
    }

    fn set_git_operation_in_progress(&self, in_progress: bool) {
        self.lock().operation.in_progress = in_progress;
    }

    fn set_current_git_operation(&self, operation: Option<OperationKind>) {
        self.lock().operation.kind = operation;
    }

    fn set_git_operation_progress(&self, progress: u8) {
        self.lock().operation.progress = progress;
    }

    fn set_git_operation_error(&self, error: Option<String>) {
        self.lock().operation.error = error;
    }
}
