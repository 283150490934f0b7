//! core::events
//!
//! Fire-and-forget notifications published after git state changes.
//!
//! Events carry no contract beyond their named fields. Dispatch never fails:
//! an event published while nobody is subscribed is dropped.

use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::core::types::OperationKind;

/// Capacity of the broadcast buffer. Slow subscribers lose the oldest events.
const EVENT_BUFFER: usize = 64;

/// A notification emitted by the git core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitEvent {
    /// The checked-out branch changed.
    BranchChanged { branch: String },
    /// A fresh status was published.
    StatusChanged,
    /// A long-running operation finished successfully.
    OperationComplete {
        operation: OperationKind,
        oid: Option<String>,
    },
}

impl GitEvent {
    /// Stable event name for hosts that dispatch by string.
    pub fn name(&self) -> &'static str {
        match self {
            GitEvent::BranchChanged { .. } => "git-branch-changed",
            GitEvent::StatusChanged => "git-status-changed",
            GitEvent::OperationComplete { .. } => "git-operation-complete",
        }
    }

    /// JSON payload (`null` for payload-less events).
    pub fn payload(&self) -> Value {
        match self {
            GitEvent::BranchChanged { branch } => json!({ "branch": branch }),
            GitEvent::StatusChanged => Value::Null,
            GitEvent::OperationComplete {
                operation,
                oid: Some(oid),
            } => json!({ "operation": operation.as_str(), "oid": oid }),
            GitEvent::OperationComplete { operation, oid: None } => {
                json!({ "operation": operation.as_str() })
            }
        }
    }
}

/// Broadcast fan-out of [`GitEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GitEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }

    /// Publish an event.
    pub fn dispatch(&self, event: GitEvent) {
        tracing::trace!(event = event.name(), "dispatch");
        // Err only means there are no subscribers right now.
        let _ = self.sender.send(event);
    }

    /// Receive every event dispatched from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GitEvent> {
        self.sender.subscribe()
    }
}
