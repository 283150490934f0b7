//! editor-git - Git integration core for editors
//!
//! Repository detection, status, staging, commits, branches and remote sync
//! for an editor workspace, whether the workspace is reached natively,
//! through a granted directory capability or through a private virtual store.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to the session)
//! - [`session`] - Per-workspace controllers, cache and auto-fetch timer
//! - [`fs`] - Filesystem adapter and backends
//! - [`git`] - Single interface for all Git operations
//! - [`core`] - Domain types, configuration, state contract and events
//!
//! # Correctness Invariants
//!
//! 1. At most one long-running git operation runs per session
//! 2. Derived state is replaced wholesale, never patched
//! 3. A missing filesystem or repository is a no-op, not an error
//! 4. Only the `git` module talks to libgit2

pub mod cli;
pub mod core;
pub mod fs;
pub mod git;
pub mod session;
