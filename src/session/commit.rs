//! session::commit
//!
//! Commit creation.

use crate::core::config::DEFAULT_COMMIT_LOG_LIMIT;
use crate::core::events::GitEvent;
use crate::core::types::OperationKind;

use super::{GitSession, SessionError};

impl GitSession {
    /// Commit the index with the configured author.
    ///
    /// On success refreshes status and log and returns the new commit id.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoFilesystem`] when the workspace has no handle
    /// - [`SessionError::OperationInProgress`] when another operation runs
    /// - Any git failure
    ///
    /// Every failure except a missing handle is recorded before returning.
    pub async fn create_commit(&self, message: &str) -> Result<String, SessionError> {
        let ws = self.workspace().ok_or(SessionError::NoFilesystem)?;
        let _guard = self
            .begin(Some(OperationKind::Commit))
            .inspect_err(|e| self.record_error(e))?;

        let author = self.state.git_author();
        let message = message.to_string();
        let result = self
            .run_blocking(&ws, move |git| git.commit(&message, &author))
            .await;

        match result {
            Ok(oid) => {
                tracing::info!(oid = %oid, "created commit");
                self.refresh_status().await;
                self.fetch_commit_log(DEFAULT_COMMIT_LOG_LIMIT).await;
                self.dispatch(GitEvent::OperationComplete {
                    operation: OperationKind::Commit,
                    oid: Some(oid.clone()),
                });
                Ok(oid)
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::events::EventBus;
    use crate::core::state::{GitStateStore, MemoryStateStore};
    use crate::fs::{DirectoryHandle, HostEnvironment};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn native_host_refuses_without_touching_state() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(MemoryStateStore::new());
        store.set_workspace_path(Some("/ws".into()));
        let config = Config::default().with_virtual_root(tmp.path());
        let session = GitSession::new(&config, HostEnvironment::native(), store.clone(), EventBus::new());

        let err = session.create_commit("msg").await.unwrap_err();
        assert_eq!(err.to_string(), "no filesystem available");
        assert!(!store.snapshot().operation.in_progress);
        assert!(store.snapshot().commit_log.is_empty());
    }

    #[tokio::test]
    async fn commit_publishes_log_and_event() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();

        let store = Arc::new(MemoryStateStore::new());
        store.set_workspace_path(Some("/repo".into()));
        let config = Config::default().with_virtual_root(tmp.path().join("virtual"));
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let session = GitSession::new(&config, HostEnvironment::sandboxed(), store.clone(), events);

        session
            .initialize_for_workspace(Some(DirectoryHandle::grant(&repo).unwrap()))
            .await;
        session.initialize_repository().await;
        std::fs::write(repo.join("a.txt"), "hello\n").unwrap();
        session.stage_file("a.txt").await;

        let oid = session.create_commit("first").await.unwrap();
        assert_eq!(oid.len(), 40);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.commit_log.len(), 1);
        assert_eq!(snapshot.commit_log[0].oid, oid);
        assert!(!snapshot.git_status.unwrap().is_dirty);
        assert!(!snapshot.operation.in_progress);

        let mut saw_complete = false;
        while let Ok(event) = rx.try_recv() {
            if let GitEvent::OperationComplete { operation, oid: Some(event_oid) } = event {
                assert_eq!(operation, OperationKind::Commit);
                assert_eq!(event_oid, oid);
                saw_complete = true;
            }
        }
        assert!(saw_complete);
    }

    #[tokio::test]
    async fn busy_slot_is_rethrown() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(MemoryStateStore::new());
        store.set_workspace_path(Some("/ws".into()));
        let config = Config::default().with_virtual_root(tmp.path());
        let session = GitSession::new(&config, HostEnvironment::sandboxed(), store.clone(), EventBus::new());

        let _held = session.begin(Some(OperationKind::Push)).unwrap();
        let err = session.create_commit("msg").await.unwrap_err();
        assert!(matches!(err, SessionError::OperationInProgress(_)));
        assert!(store.is_git_operation_in_progress());
        assert_eq!(store.snapshot().operation.error, Some(err.to_string()));
    }
}
