//! git::interface
//!
//! Local repository operations over git2.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::UnbornHead`]: HEAD points at a branch with no commits
//! - [`GitError::BranchNotFound`] / [`GitError::RemoteNotFound`]: Missing names
//! - [`GitError::MergeConflict`]: A pull could not be merged automatically
//! - [`GitError::Transport`]: Network or authentication failure
//!
//! # Example
//!
//! ```ignore
//! use editor_git::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! println!("on {}", git.current_branch()?);
//! for record in git.log(10)? {
//!     println!("{} {}", &record.oid[..7], record.summary());
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{Author, BranchName, CommitRecord, Remote, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// HEAD names a branch that has no commits yet.
    #[error("HEAD has no commits yet")]
    UnbornHead,

    /// HEAD is not attached to a branch.
    #[error("HEAD is detached")]
    DetachedHead,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// No local or remote-tracking branch with this name.
    #[error("branch not found: {name}")]
    BranchNotFound { name: String },

    /// No remote with this name.
    #[error("remote not found: {name}")]
    RemoteNotFound { name: String },

    /// Path does not exist in the requested tree.
    #[error("path not found: {path}")]
    PathNotFound { path: String },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// A pull produced conflicts. Nothing was written.
    #[error("merge conflict pulling {branch}: resolve manually")]
    MergeConflict { branch: String },

    /// The remote refused a pushed ref.
    #[error("push of {refname} rejected: {message}")]
    PushRejected { refname: String, message: String },

    /// Network or authentication failure.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    pub(super) fn from_git2(err: git2::Error, context: &str) -> Self {
        match (err.code(), err.class()) {
            (git2::ErrorCode::UnbornBranch, _) => GitError::UnbornHead,
            (git2::ErrorCode::Auth, _)
            | (_, git2::ErrorClass::Net)
            | (_, git2::ErrorClass::Http)
            | (_, git2::ErrorClass::Ssl) => GitError::Transport {
                message: format!("{}: {}", context, err.message()),
            },
            (git2::ErrorCode::NotFound, _) if context.starts_with("refs/") => {
                GitError::RefNotFound {
                    refname: context.to_string(),
                }
            }
            (git2::ErrorCode::InvalidSpec, _) => GitError::InvalidRefName {
                message: format!("{}: {}", context, err.message()),
            },
            (git2::ErrorCode::Locked, _) => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::UnbornBranch => GitError::UnbornHead,
            git2::ErrorCode::NotFound => GitError::RefNotFound {
                refname: err.message().to_string(),
            },
            _ => GitError::Internal {
                message: err.message().to_string(),
            },
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidBranchName(msg) => GitError::InvalidRefName { message: msg },
        }
    }
}

/// A branch name with the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchTip {
    /// Short name (`main`, or `feature` for `origin/feature`)
    pub name: String,
    /// Tip commit, empty for symbolic refs
    pub oid: String,
}

/// Path to blob id, for one side of the status comparison.
pub type BlobMap = BTreeMap<String, String>;

/// The Git interface.
///
/// This is the only type that talks to libgit2. Sessions open one per call
/// from the host path of their filesystem handle and drop it afterwards.
pub struct Git {
    pub(super) repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Open the repository containing `path` without searching above
    /// `boundary`.
    ///
    /// Used for capability-backed filesystems, whose root must not leak into
    /// the host directories around it.
    pub fn open_within(path: &Path, boundary: &Path) -> Result<Self, GitError> {
        let ceiling = boundary.parent().unwrap_or(boundary);
        let repo = git2::Repository::open_ext(path, git2::RepositoryOpenFlags::empty(), [ceiling])
            .map_err(|_| GitError::NotARepo {
                path: path.to_path_buf(),
            })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Create a repository at `path` whose HEAD names `default_branch`.
    ///
    /// Re-initializing an existing repository is harmless.
    pub fn init(path: &Path, default_branch: &str) -> Result<Self, GitError> {
        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head(default_branch);
        let repo = git2::Repository::init_opts(path, &opts)
            .map_err(|e| GitError::from_git2(e, &path.display().to_string()))?;
        Ok(Self { repo })
    }

    /// Working directory root.
    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    // =========================================================================
    // HEAD
    // =========================================================================

    /// Name of the checked-out branch.
    ///
    /// Works on an unborn HEAD by reading the symbolic target.
    ///
    /// # Errors
    ///
    /// - [`GitError::DetachedHead`] if HEAD is not on a branch
    pub fn current_branch(&self) -> Result<String, GitError> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => head
                .shorthand()
                .map(str::to_string)
                .ok_or(GitError::DetachedHead),
            Ok(_) => Err(GitError::DetachedHead),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                let head = self
                    .repo
                    .find_reference("HEAD")
                    .map_err(|e| GitError::from_git2(e, "HEAD"))?;
                head.symbolic_target()
                    .and_then(|t| t.strip_prefix("refs/heads/"))
                    .map(str::to_string)
                    .ok_or(GitError::DetachedHead)
            }
            Err(e) => Err(GitError::from_git2(e, "HEAD")),
        }
    }

    /// The commit HEAD points at, `None` when unborn.
    fn head_commit(&self) -> Result<Option<git2::Commit<'_>>, GitError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(
                head.peel_to_commit()
                    .map_err(|e| GitError::from_git2(e, "HEAD"))?,
            )),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(GitError::from_git2(e, "HEAD")),
        }
    }

    // =========================================================================
    // Status inputs
    // =========================================================================

    /// Every blob in the HEAD tree. Empty when HEAD is unborn.
    pub fn head_entries(&self) -> Result<BlobMap, GitError> {
        let mut entries = BlobMap::new();
        let Some(commit) = self.head_commit()? else {
            return Ok(entries);
        };
        let tree = commit.tree()?;
        tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(git2::ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    entries.insert(format!("{root}{name}"), entry.id().to_string());
                }
            }
            git2::TreeWalkResult::Ok
        })?;
        Ok(entries)
    }

    /// Every path in the index.
    pub fn index_entries(&self) -> Result<BlobMap, GitError> {
        let index = self.repo.index()?;
        Ok(index
            .iter()
            .map(|entry| {
                (
                    String::from_utf8_lossy(&entry.path).into_owned(),
                    entry.id.to_string(),
                )
            })
            .collect())
    }

    /// Whether ignore rules exclude `path`.
    pub fn is_ignored(&self, path: &str) -> Result<bool, GitError> {
        Ok(self.repo.is_path_ignored(Path::new(path))?)
    }

    /// Blob id git would assign to `data`.
    pub fn hash_blob(data: &[u8]) -> Result<String, GitError> {
        Ok(git2::Oid::hash_object(git2::ObjectType::Blob, data)?.to_string())
    }

    // =========================================================================
    // Index and worktree
    // =========================================================================

    /// Stage `path`. A path missing from the worktree stages its deletion.
    pub fn add(&self, path: &str) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        if in_worktree(&self.work_dir()?.join(path)) {
            index
                .add_path(Path::new(path))
                .map_err(|e| GitError::from_git2(e, path))?;
        } else {
            index
                .remove_path(Path::new(path))
                .map_err(|e| GitError::from_git2(e, path))?;
        }
        index.write()?;
        Ok(())
    }

    /// Stage many paths with a single index write.
    ///
    /// Paths that fail are skipped and returned with their error.
    pub fn add_paths(&self, paths: &[String]) -> Result<Vec<(String, GitError)>, GitError> {
        let mut index = self.repo.index()?;
        let workdir = self.work_dir()?.to_path_buf();
        let mut failures = Vec::new();
        for path in paths {
            let result = if in_worktree(&workdir.join(path)) {
                index.add_path(Path::new(path))
            } else {
                index.remove_path(Path::new(path))
            };
            if let Err(e) = result {
                failures.push((path.clone(), GitError::from_git2(e, path)));
            }
        }
        index.write()?;
        Ok(failures)
    }

    /// Reset the index entry for `path` to HEAD.
    ///
    /// Paths absent from HEAD leave the index.
    pub fn reset_index(&self, path: &str) -> Result<(), GitError> {
        match self.head_commit()? {
            Some(commit) => self
                .repo
                .reset_default(Some(commit.as_object()), [path])
                .map_err(|e| GitError::from_git2(e, path)),
            None => {
                let mut index = self.repo.index()?;
                index
                    .remove_path(Path::new(path))
                    .map_err(|e| GitError::from_git2(e, path))?;
                index.write()?;
                Ok(())
            }
        }
    }

    /// Restore `path` in worktree and index from HEAD.
    pub fn discard(&self, path: &str) -> Result<(), GitError> {
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force().path(path);
        let result = if self.head_commit()?.is_some() {
            self.repo.checkout_head(Some(&mut checkout))
        } else {
            self.repo.checkout_index(None, Some(&mut checkout))
        };
        result.map_err(|e| GitError::from_git2(e, path))
    }

    /// Commit the index on top of HEAD.
    pub fn commit(&self, message: &str, author: &Author) -> Result<String, GitError> {
        let signature = git2::Signature::now(&author.name, &author.email)?;
        let mut index = self.repo.index()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;
        let parent = self.head_commit()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        Ok(oid.to_string())
    }

    // =========================================================================
    // Branches
    // =========================================================================

    /// Switch to `name`.
    ///
    /// A branch that only exists as `origin/<name>` gets a local tracking
    /// branch first.
    pub fn checkout_branch(&self, name: &str) -> Result<(), GitError> {
        let branch = match self.repo.find_branch(name, git2::BranchType::Local) {
            Ok(branch) => branch,
            Err(e) if e.code() == git2::ErrorCode::NotFound => self.track_remote_branch(name)?,
            Err(e) => return Err(GitError::from_git2(e, name)),
        };

        let refname = branch
            .get()
            .name()
            .map(str::to_string)
            .ok_or_else(|| GitError::InvalidRefName {
                message: name.to_string(),
            })?;
        let target = branch.get().peel(git2::ObjectType::Commit)?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .checkout_tree(&target, Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, &refname))?;
        self.repo
            .set_head(&refname)
            .map_err(|e| GitError::from_git2(e, &refname))?;
        Ok(())
    }

    fn track_remote_branch(&self, name: &str) -> Result<git2::Branch<'_>, GitError> {
        let upstream = format!("origin/{name}");
        let remote = self
            .repo
            .find_branch(&upstream, git2::BranchType::Remote)
            .map_err(|_| GitError::BranchNotFound {
                name: name.to_string(),
            })?;
        let commit = remote.get().peel_to_commit()?;
        let mut local = self
            .repo
            .branch(name, &commit, false)
            .map_err(|e| GitError::from_git2(e, name))?;
        local.set_upstream(Some(&upstream))?;
        Ok(local)
    }

    /// Create `name` at HEAD without switching to it.
    pub fn create_branch(&self, name: &BranchName) -> Result<(), GitError> {
        let head = self.head_commit()?.ok_or(GitError::UnbornHead)?;
        self.repo
            .branch(name.as_str(), &head, false)
            .map_err(|e| GitError::from_git2(e, name.as_str()))?;
        Ok(())
    }

    pub fn delete_branch(&self, name: &str) -> Result<(), GitError> {
        let mut branch = self
            .repo
            .find_branch(name, git2::BranchType::Local)
            .map_err(|_| GitError::BranchNotFound {
                name: name.to_string(),
            })?;
        branch
            .delete()
            .map_err(|e| GitError::from_git2(e, name))
    }

    /// Local branches, sorted by name.
    pub fn list_branches(&self) -> Result<Vec<BranchTip>, GitError> {
        let mut tips = Vec::new();
        for item in self.repo.branches(Some(git2::BranchType::Local))? {
            let (branch, _) = item?;
            if let Some(name) = branch.name()? {
                tips.push(BranchTip {
                    name: name.to_string(),
                    oid: tip_of(&branch),
                });
            }
        }
        tips.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tips)
    }

    /// Remote-tracking branches of `remote`, names without the remote prefix.
    ///
    /// # Errors
    ///
    /// - [`GitError::RemoteNotFound`] if `remote` is not configured
    pub fn list_remote_branches(&self, remote: &str) -> Result<Vec<BranchTip>, GitError> {
        self.repo
            .find_remote(remote)
            .map_err(|_| GitError::RemoteNotFound {
                name: remote.to_string(),
            })?;

        let prefix = format!("{remote}/");
        let mut tips = Vec::new();
        for item in self.repo.branches(Some(git2::BranchType::Remote))? {
            let (branch, _) = item?;
            let Some(full) = branch.name()? else { continue };
            match full.strip_prefix(&prefix) {
                Some("HEAD") | None => {}
                Some(short) => tips.push(BranchTip {
                    name: short.to_string(),
                    oid: tip_of(&branch),
                }),
            }
        }
        tips.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tips)
    }

    // =========================================================================
    // Remotes
    // =========================================================================

    pub fn list_remotes(&self) -> Result<Vec<Remote>, GitError> {
        let names = self.repo.remotes()?;
        let mut remotes = Vec::new();
        for name in names.iter().flatten() {
            let remote = self.repo.find_remote(name)?;
            remotes.push(Remote {
                name: name.to_string(),
                url: remote.url().unwrap_or_default().to_string(),
            });
        }
        Ok(remotes)
    }

    pub fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.repo
            .remote(name, url)
            .map_err(|e| GitError::from_git2(e, name))?;
        Ok(())
    }

    /// URL configured for `name`.
    pub fn remote_url(&self, name: &str) -> Result<String, GitError> {
        let remote = self
            .repo
            .find_remote(name)
            .map_err(|_| GitError::RemoteNotFound {
                name: name.to_string(),
            })?;
        Ok(remote.url().unwrap_or_default().to_string())
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Up to `limit` commits reachable from HEAD, newest first.
    pub fn log(&self, limit: usize) -> Result<Vec<CommitRecord>, GitError> {
        let mut walk = self.repo.revwalk()?;
        walk.push_head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        walk.set_sorting(git2::Sort::TIME)?;

        let mut records = Vec::new();
        for oid in walk.take(limit) {
            let commit = self.repo.find_commit(oid?)?;
            let author = commit.author();
            records.push(CommitRecord {
                oid: commit.id().to_string(),
                message: commit.message().unwrap_or_default().to_string(),
                author: Author {
                    name: author.name().unwrap_or_default().to_string(),
                    email: author.email().unwrap_or_default().to_string(),
                },
                timestamp: author.when().seconds(),
            });
        }
        Ok(records)
    }

    /// Text of `path` as committed at HEAD. Invalid UTF-8 is replaced.
    pub fn read_blob_at_head(&self, path: &str) -> Result<String, GitError> {
        let commit = self.head_commit()?.ok_or(GitError::UnbornHead)?;
        let entry = commit
            .tree()?
            .get_path(Path::new(path))
            .map_err(|_| GitError::PathNotFound {
                path: path.to_string(),
            })?;
        let blob = self
            .repo
            .find_blob(entry.id())
            .map_err(|_| GitError::ObjectNotFound {
                oid: entry.id().to_string(),
            })?;
        Ok(String::from_utf8_lossy(blob.content()).into_owned())
    }
}

/// Whether `path` has a worktree entry. Dangling links count.
fn in_worktree(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

fn tip_of(branch: &git2::Branch<'_>) -> String {
    branch
        .get()
        .target()
        .map(|oid| oid.to_string())
        .unwrap_or_default()
}
