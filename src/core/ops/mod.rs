//! core::ops
//!
//! Mutual exclusion for long-running git operations.
//!
//! # Modules
//!
//! - [`lock`] - Single-slot operation lock with release hooks
//!
//! # Architecture
//!
//! Every operation that reports itself through the shared operation state:
//! 1. Acquires the session's slot (fails fast if another operation runs)
//! 2. Registers a release hook that resets in-progress, kind and progress
//! 3. Runs; the hook fires on every exit path, including early returns

pub mod lock;

pub use lock::{OperationSlot, SlotError, SlotGuard};
