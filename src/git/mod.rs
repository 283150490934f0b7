//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to Git. No other module imports
//! `git2`. Sessions open a [`Git`] from the host location behind their
//! filesystem handle, call one operation and drop it.
//!
//! # Responsibilities
//!
//! - Repository discovery, initialization and cloning
//! - HEAD, tree and index reads that feed the status matrix
//! - Index mutation (stage, unstage, discard) and commits
//! - Branch and remote management
//! - Network transport with CORS proxying, authentication and progress
//!
//! # Invariants
//!
//! - No other module calls git2 directly
//! - Transport functions block and are run off the async runtime
//! - Configured remote URLs are never rewritten by proxying
//!
//! # Example
//!
//! ```ignore
//! use editor_git::git::{Git, Transport};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let transport = Transport::new().with_cors_proxy("https://cors.isomorphic-git.org");
//! git.fetch("origin", None, &transport)?;
//! ```

mod interface;
mod transport;

pub use interface::{BlobMap, BranchTip, Git, GitError};
pub use transport::{HttpAuth, ProgressFn, PullOutcome, TransferProgress, Transport};
