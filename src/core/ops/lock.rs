//! core::ops::lock
//!
//! Single-slot operation lock for a git session.
//!
//! # Architecture
//!
//! Long-running git operations (commit, push, pull, fetch, clone, init) must
//! never overlap within one workspace. Instead of relying on callers to check
//! an in-progress flag, every such operation acquires the session's
//! [`OperationSlot`] first.
//!
//! # Invariants
//!
//! - At most one [`SlotGuard`] exists per slot at any time
//! - Acquisition is non-blocking (fails fast if held)
//! - The slot is released on drop (RAII pattern), after the guard's release
//!   hooks have run, so observers never see a free slot with stale state
//!
//! # Example
//!
//! ```
//! use editor_git::core::ops::{OperationSlot, SlotError};
//!
//! let slot = OperationSlot::new();
//! let guard = slot.acquire("push").unwrap();
//! assert!(matches!(slot.acquire("fetch"), Err(SlotError::Busy { running: "push" })));
//!
//! drop(guard);
//! assert!(slot.acquire("fetch").is_ok());
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

/// Errors from slot acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Another operation holds the slot.
    #[error("a git {running} operation is already in progress")]
    Busy {
        /// Label of the operation holding the slot
        running: &'static str,
    },
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A non-blocking, single-occupant lock.
///
/// Cloning yields another handle to the same slot.
#[derive(Debug, Clone, Default)]
pub struct OperationSlot {
    holder: Arc<Mutex<Option<&'static str>>>,
}

impl OperationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<&'static str>> {
        self.holder
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Attempt to occupy the slot.
    ///
    /// # Errors
    ///
    /// [`SlotError::Busy`] naming the current holder.
    pub fn acquire(&self, label: &'static str) -> Result<SlotGuard, SlotError> {
        let mut holder = self.lock();
        if let Some(running) = *holder {
            return Err(SlotError::Busy { running });
        }
        *holder = Some(label);

        Ok(SlotGuard {
            slot: Some(self.clone()),
            hooks: Vec::new(),
        })
    }

    /// Try to occupy the slot, returning `None` if it is held.
    pub fn try_acquire(&self, label: &'static str) -> Option<SlotGuard> {
        self.acquire(label).ok()
    }

    /// Label of the current holder, if any.
    pub fn holder(&self) -> Option<&'static str> {
        *self.lock()
    }

    pub fn is_held(&self) -> bool {
        self.holder().is_some()
    }
}

/// Proof of slot ownership.
///
/// Release hooks run in registration order when the guard is released or
/// dropped, including during unwinding.
pub struct SlotGuard {
    slot: Option<OperationSlot>,
    hooks: Vec<ReleaseHook>,
}

impl std::fmt::Debug for SlotGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotGuard")
            .field("held", &self.is_held())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl SlotGuard {
    /// Register a hook to run on release.
    pub fn on_release(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn is_held(&self) -> bool {
        self.slot.is_some()
    }

    /// Release the slot early. Safe to call more than once.
    pub fn release(&mut self) {
        for hook in self.hooks.drain(..) {
            hook();
        }
        if let Some(slot) = self.slot.take() {
            *slot.lock() = None;
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.release();
    }
}
