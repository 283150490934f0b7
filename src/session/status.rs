//! session::status
//!
//! The status matrix and index mutation.
//!
//! # Status matrix
//!
//! Each path known to HEAD, the index or the working tree yields a row
//! `(head, workdir, stage)`:
//!
//! | column  | 0      | 1                 | 2                  | 3         |
//! |---------|--------|-------------------|--------------------|-----------|
//! | head    | absent | present           |                    |           |
//! | workdir | absent | identical to HEAD | differs from HEAD  |           |
//! | stage   | absent | identical to HEAD | identical to workdir | neither |
//!
//! [`classify`] maps rows onto status buckets. Rows it does not recognize,
//! including the clean `(1,1,1)`, contribute nothing.

use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::core::events::GitEvent;
use crate::core::types::{FileChange, FileStatusEntry, RepositoryStatus};
use crate::fs::{FileSystem, FsError};
use crate::git::{BlobMap, Git, GitError};

use super::{GitSession, SessionError, Workspace};

/// One row of the status matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub path: String,
    pub head: u8,
    pub workdir: u8,
    pub stage: u8,
}

impl StatusRow {
    pub fn new(path: impl Into<String>, head: u8, workdir: u8, stage: u8) -> Self {
        Self {
            path: path.into(),
            head,
            workdir,
            stage,
        }
    }
}

/// How a status row is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Untracked,
    StagedAdded,
    StagedModified,
    /// Staged modification with further unstaged edits on top
    StagedAndUnstagedModified,
    UnstagedModified,
    StagedDeleted,
    UnstagedDeleted,
}

/// Classify a `(head, workdir, stage)` tuple.
pub fn classify(head: u8, workdir: u8, stage: u8) -> Option<Classification> {
    match (head, workdir, stage) {
        (0, 2, 0) => Some(Classification::Untracked),
        (0, 2, 2) | (0, 0, 2) => Some(Classification::StagedAdded),
        (1, 2, 2) => Some(Classification::StagedModified),
        (1, 2, 3) => Some(Classification::StagedAndUnstagedModified),
        (1, 2, 1) => Some(Classification::UnstagedModified),
        (1, 0, 0) => Some(Classification::StagedDeleted),
        (1, 0, 1) => Some(Classification::UnstagedDeleted),
        _ => None,
    }
}

/// Build a status from matrix rows.
///
/// `show_untracked = false` leaves the untracked bucket empty.
pub fn assemble_status(branch: &str, rows: &[StatusRow], show_untracked: bool) -> RepositoryStatus {
    let mut status = RepositoryStatus {
        branch: branch.to_string(),
        ..Default::default()
    };

    for row in rows {
        let path = row.path.as_str();
        match classify(row.head, row.workdir, row.stage) {
            Some(Classification::Untracked) => {
                if show_untracked {
                    status
                        .untracked_files
                        .push(FileStatusEntry::unstaged(path, FileChange::Untracked));
                }
            }
            Some(Classification::StagedAdded) => status
                .staged_files
                .push(FileStatusEntry::staged(path, FileChange::Added)),
            Some(Classification::StagedModified) => status
                .staged_files
                .push(FileStatusEntry::staged(path, FileChange::Modified)),
            Some(Classification::StagedAndUnstagedModified) => {
                status
                    .staged_files
                    .push(FileStatusEntry::staged(path, FileChange::Modified));
                status
                    .unstaged_files
                    .push(FileStatusEntry::unstaged(path, FileChange::Modified));
            }
            Some(Classification::UnstagedModified) => status
                .unstaged_files
                .push(FileStatusEntry::unstaged(path, FileChange::Modified)),
            Some(Classification::StagedDeleted) => status
                .staged_files
                .push(FileStatusEntry::staged(path, FileChange::Deleted)),
            Some(Classification::UnstagedDeleted) => status
                .unstaged_files
                .push(FileStatusEntry::unstaged(path, FileChange::Deleted)),
            None => {}
        }
    }

    status.is_dirty = status.changed_count() > 0;
    status
}

/// Compare HEAD, worktree and index blob maps.
pub(crate) fn build_rows(head: &BlobMap, workdir: &BlobMap, index: &BlobMap) -> Vec<StatusRow> {
    let paths: BTreeSet<&String> = head.keys().chain(workdir.keys()).chain(index.keys()).collect();

    paths
        .into_iter()
        .map(|path| {
            let h = head.get(path);
            let w = workdir.get(path);
            let s = index.get(path);

            let workdir_col = match w {
                None => 0,
                Some(_) if w == h => 1,
                Some(_) => 2,
            };
            let stage_col = match s {
                None => 0,
                Some(_) if s == h => 1,
                Some(_) if s == w => 2,
                Some(_) => 3,
            };
            StatusRow::new(path.as_str(), u8::from(h.is_some()), workdir_col, stage_col)
        })
        .collect()
}

fn join(base: &str, rel: &str) -> String {
    match (base.trim_end_matches('/'), rel) {
        (b, "") if b.is_empty() => "/".to_string(),
        (b, "") => b.to_string(),
        (b, r) => format!("{b}/{r}"),
    }
}

/// Hash every non-ignored file under `base`, keyed by repository path.
///
/// The repository sits behind a mutex so the walk stays `Send`.
async fn walk_workdir(
    fs: &dyn FileSystem,
    git: &Mutex<Git>,
    base: &str,
    tracked: &BTreeSet<String>,
) -> Result<BlobMap, SessionError> {
    let mut files = BlobMap::new();
    let mut pending = vec![String::new()];

    while let Some(rel_dir) = pending.pop() {
        for name in fs.readdir(&join(base, &rel_dir)).await? {
            if rel_dir.is_empty() && name == ".git" {
                continue;
            }
            let rel = if rel_dir.is_empty() {
                name
            } else {
                format!("{rel_dir}/{name}")
            };

            // Links are never descended into, even when they point at a directory.
            let stat = fs.lstat(&join(base, &rel)).await?;
            let ignored = git
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .is_ignored(&rel)?;
            if stat.is_directory() {
                let prefix = format!("{rel}/");
                if !ignored || tracked.iter().any(|p| p.starts_with(&prefix)) {
                    pending.push(rel);
                }
                continue;
            }
            if ignored && !tracked.contains(&rel) {
                continue;
            }

            let full = join(base, &rel);
            let data = if stat.is_symbolic_link() {
                // Links are stored as their target path.
                let target = std::fs::read_link(fs.host_path(&full)?)
                    .map_err(|e| FsError::from_io(&full, e))?;
                target.to_string_lossy().into_owned().into_bytes()
            } else {
                fs.read_file(&full).await?
            };
            files.insert(rel, Git::hash_blob(&data)?);
        }
    }
    Ok(files)
}

/// Filesystem path of the repository work dir, relative to the handle.
fn repo_dir(ws: &Workspace, git: &Git) -> String {
    let canonical = |p: &std::path::Path| std::fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
    let work_dir = match git.work_dir() {
        Ok(dir) => canonical(dir),
        Err(_) => return ws.root.clone(),
    };
    match work_dir.strip_prefix(canonical(&ws.boundary)) {
        Ok(rel) => {
            let parts: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            format!("/{}", parts.join("/"))
        }
        Err(_) => ws.root.clone(),
    }
}

impl GitSession {
    /// Compute the status matrix for the workspace repository.
    pub async fn status_matrix(&self) -> Result<Vec<StatusRow>, SessionError> {
        let ws = self.workspace().ok_or(SessionError::NoFilesystem)?;
        let git = ws.open_git()?;
        let head = git.head_entries()?;
        let index = git.index_entries()?;
        let tracked: BTreeSet<String> = head.keys().chain(index.keys()).cloned().collect();

        let base = repo_dir(&ws, &git);
        let git = Mutex::new(git);
        let workdir = walk_workdir(ws.fs.as_ref(), &git, &base, &tracked).await?;
        Ok(build_rows(&head, &workdir, &index))
    }

    /// Recompute and publish the repository status.
    ///
    /// No-op without a handle or a detected repository. A failed matrix
    /// clears the published status.
    pub async fn refresh_status(&self) {
        if self.workspace().is_none() || !self.state.is_repo_initialized() {
            return;
        }

        let branch = self
            .workspace()
            .and_then(|ws| ws.open_git().ok())
            .and_then(|git| match git.current_branch() {
                Ok(branch) => Some(branch),
                Err(GitError::DetachedHead) => Some("HEAD".to_string()),
                Err(_) => None,
            });
        if let Some(branch) = branch {
            self.state.set_current_branch(branch);
        }

        match self.status_matrix().await {
            Ok(rows) => {
                let settings = self.state.git_settings();
                let status =
                    assemble_status(&self.state.current_branch(), &rows, settings.show_untracked);
                tracing::debug!(
                    staged = status.staged_files.len(),
                    unstaged = status.unstaged_files.len(),
                    untracked = status.untracked_files.len(),
                    "status refreshed"
                );
                self.state.set_git_status(Some(status));
                self.dispatch(GitEvent::StatusChanged);
            }
            Err(e) => {
                tracing::warn!(error = %e, "status matrix failed");
                self.state.set_git_status(None);
            }
        }
    }

    /// Run a single-path index operation, record failure, then refresh.
    async fn mutate_path(&self, path: &str, op: fn(&Git, &str) -> Result<(), GitError>) {
        let Some(ws) = self.workspace() else {
            return;
        };
        let result = ws.open_git().and_then(|git| op(&git, path));
        if let Err(e) = result {
            self.record_error(&e);
        }
        self.refresh_status().await;
    }

    pub async fn stage_file(&self, path: &str) {
        self.mutate_path(path, Git::add).await;
    }

    pub async fn unstage_file(&self, path: &str) {
        self.mutate_path(path, Git::reset_index).await;
    }

    /// Restore `path` from HEAD, dropping staged and unstaged edits.
    pub async fn discard_file_changes(&self, path: &str) {
        self.mutate_path(path, Git::discard).await;
    }

    /// Stage every unstaged and untracked path from the published status.
    ///
    /// Individual failures are logged and skipped.
    pub async fn stage_all_files(&self) {
        let Some(status) = self.state.git_status() else {
            return;
        };
        let Some(ws) = self.workspace() else {
            return;
        };

        let paths: Vec<String> = status
            .unstaged_files
            .iter()
            .chain(status.untracked_files.iter())
            .map(|entry| entry.path.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        match ws.open_git().and_then(|git| git.add_paths(&paths)) {
            Ok(failures) => {
                for (path, e) in failures {
                    tracing::debug!(path = %path, error = %e, "skipped while staging all");
                }
            }
            Err(e) => tracing::debug!(error = %e, "stage all failed"),
        }
        self.refresh_status().await;
    }

    /// Number of staged entries in the published status.
    pub fn staged_file_count(&self) -> usize {
        self.state
            .git_status()
            .map(|status| status.staged_files.len())
            .unwrap_or(0)
    }

    /// Number of entries across all buckets of the published status.
    pub fn changed_file_count(&self) -> usize {
        self.state
            .git_status()
            .map(|status| status.changed_count())
            .unwrap_or(0)
    }
}
