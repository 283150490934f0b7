//! Shared fixtures for session integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;

use editor_git::core::config::Config;
use editor_git::core::events::EventBus;
use editor_git::core::state::MemoryStateStore;
use editor_git::fs::{DirectoryHandle, HostEnvironment};
use editor_git::session::GitSession;

/// A workspace directory reached through a directory capability.
pub struct TestWorkspace {
    pub dir: TempDir,
    pub store: Arc<MemoryStateStore>,
    pub events: EventBus,
    pub session: Arc<GitSession>,
}

impl TestWorkspace {
    /// An empty workspace at `<tmp>/ws`, initialized but without a repository.
    pub async fn new() -> Self {
        Self::with_host(HostEnvironment::sandboxed()).await
    }

    pub async fn with_host(host: HostEnvironment) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::create_dir_all(dir.path().join("ws")).unwrap();

        let store = Arc::new(MemoryStateStore::new());
        store.set_workspace_path(Some("/projects/ws".into()));
        let config = Config::default().with_virtual_root(dir.path().join("virtual"));
        let events = EventBus::new();
        let session = Arc::new(GitSession::new(&config, host, store.clone(), events.clone()));

        let ws = Self {
            dir,
            store,
            events,
            session,
        };
        if !host.native_fs {
            let handle = DirectoryHandle::grant(ws.path()).unwrap();
            ws.session.initialize_for_workspace(Some(handle)).await;
        }
        ws
    }

    /// A workspace holding a repository with one commit of `README.md`.
    pub async fn with_commit() -> Self {
        let ws = Self::new().await;
        ws.session.initialize_repository().await;
        ws.write("README.md", "# test\n");
        ws.session.stage_file("README.md").await;
        ws.session.create_commit("Initial commit").await.unwrap();
        ws
    }

    /// Host location of the workspace.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("ws")
    }

    pub fn write(&self, path: &str, content: &str) {
        let full = self.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path)).unwrap()
    }

    /// Stage `path` and commit it.
    pub async fn commit_file(&self, path: &str, content: &str, message: &str) -> String {
        self.write(path, content);
        self.session.stage_file(path).await;
        self.session.create_commit(message).await.unwrap()
    }

    /// Last recorded operation error.
    pub fn error(&self) -> Option<String> {
        self.store.snapshot().operation.error
    }
}

/// An empty bare repository whose HEAD names `main`.
pub fn bare_remote(parent: &Path) -> PathBuf {
    let path = parent.join("remote.git");
    std::fs::create_dir_all(&path).unwrap();
    run_git(&path, &["init", "--bare"]);
    run_git(&path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    path
}

/// Run a git command in the given directory.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
