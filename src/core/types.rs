//! core::types
//!
//! Domain types shared by every layer of the git core.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`FileChange`] / [`FileStatusEntry`] - One classified path in the status view
//! - [`RepositoryStatus`] - The derived status published to the state container
//! - [`Branch`], [`Remote`], [`CommitRecord`] - Listing results
//! - [`Credentials`], [`Author`] - Identity read from the state container
//! - [`OperationKind`] / [`OperationState`] - The single in-flight operation
//!
//! # Validation
//!
//! Branch names are validated at construction time so that `create_branch`
//! never hands libgit2 a name it would reject halfway through.
//!
//! # Example
//!
//! ```
//! use editor_git::core::types::{BranchName, FileChange};
//!
//! let branch = BranchName::new("feature/my-branch").unwrap();
//! assert_eq!(branch.as_str(), "feature/my-branch");
//! assert!(BranchName::new("invalid..name").is_err());
//!
//! assert_eq!(FileChange::Untracked.as_str(), "untracked");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
/// - Cannot be exactly `@`
///
/// # Example
///
/// ```
/// use editor_git::core::types::BranchName;
///
/// let name = BranchName::new("feature/login").unwrap();
/// assert_eq!(name.as_str(), "feature/login");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("@").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject =
            |why: &str| -> Result<(), TypeError> { Err(TypeError::InvalidBranchName(why.into())) };

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') || name.starts_with('-') {
            return reject("branch name cannot start with '.' or '-'");
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return reject("branch name cannot end with '.lock' or '/'");
        }
        for bad in ["..", "@{", "//"] {
            if name.contains(bad) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{bad}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain '{c}'"
            )));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("branch name cannot contain control characters");
        }

        for component in name.split('/').filter(|c| !c.is_empty()) {
            if component.starts_with('.') || component.ends_with(".lock") {
                return reject("path component cannot start with '.' or end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a path differs from the last commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChange {
    Added,
    Modified,
    Deleted,
    Untracked,
}

impl FileChange {
    /// The lowercase label used in status views and diff summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileChange::Added => "added",
            FileChange::Modified => "modified",
            FileChange::Deleted => "deleted",
            FileChange::Untracked => "untracked",
        }
    }
}

impl std::fmt::Display for FileChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single classified path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatusEntry {
    /// Repository-relative path, `/`-separated
    pub path: String,
    /// Kind of change
    pub status: FileChange,
    /// Whether this entry describes the index side
    pub is_staged: bool,
}

impl FileStatusEntry {
    pub fn staged(path: impl Into<String>, status: FileChange) -> Self {
        Self {
            path: path.into(),
            status,
            is_staged: true,
        }
    }

    pub fn unstaged(path: impl Into<String>, status: FileChange) -> Self {
        Self {
            path: path.into(),
            status,
            is_staged: false,
        }
    }
}

/// Derived repository status, recomputed wholesale on every refresh.
///
/// `ahead_by`, `behind_by` and `merge_in_progress` are reserved: nothing in
/// this crate computes them and they always hold their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStatus {
    pub branch: String,
    pub is_dirty: bool,
    pub staged_files: Vec<FileStatusEntry>,
    pub unstaged_files: Vec<FileStatusEntry>,
    pub untracked_files: Vec<FileStatusEntry>,
    pub ahead_by: u32,
    pub behind_by: u32,
    pub merge_in_progress: bool,
}

impl RepositoryStatus {
    /// Total number of entries across all three buckets.
    pub fn changed_count(&self) -> usize {
        self.staged_files.len() + self.unstaged_files.len() + self.untracked_files.len()
    }
}

/// A local or remote branch.
///
/// Remote branches are named `origin/<name>` and flagged `is_remote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub name: String,
    pub is_remote: bool,
    pub is_current_branch: bool,
    /// Tip commit, empty when not resolved
    pub last_commit_oid: String,
}

/// A configured remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    pub url: String,
}

/// Commit author identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// One entry of the commit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub oid: String,
    pub message: String,
    pub author: Author,
    /// Author time, seconds since the Unix epoch
    pub timestamp: i64,
}

impl CommitRecord {
    /// Author time as a UTC datetime.
    pub fn authored_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.timestamp, 0)
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Where a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Oauth,
    Pat,
}

/// HTTP credentials owned by the state container.
///
/// Never persisted or logged by this crate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "type")]
    pub kind: CredentialKind,
    pub username: String,
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("kind", &self.kind)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// The kind of long-running operation currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Commit,
    Push,
    Pull,
    Fetch,
    Clone,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Commit => "commit",
            OperationKind::Push => "push",
            OperationKind::Pull => "pull",
            OperationKind::Fetch => "fetch",
            OperationKind::Clone => "clone",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-progress flag, kind, progress percentage and last error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationState {
    pub in_progress: bool,
    pub kind: Option<OperationKind>,
    pub progress: u8,
    pub error: Option<String>,
}

/// An editor buffer, used to estimate line deltas for staged files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBuffer {
    /// Absolute or workspace path of the buffer, if it has one
    pub path: Option<String>,
    pub content: String,
}
