//! session::remote
//!
//! Push, pull, fetch and remote management.
//!
//! Push and pull move the current branch; fetch brings in every remote
//! branch. All transfers go through the configured CORS proxy. Push and pull return their failures; fetch only records them so
//! background fetches stay silent.

use std::sync::Arc;

use crate::core::config::DEFAULT_COMMIT_LOG_LIMIT;
use crate::core::events::GitEvent;
use crate::core::types::{Credentials, OperationKind, Remote};
use crate::git::{HttpAuth, ProgressFn, PullOutcome, TransferProgress};

use super::{GitSession, SessionError};

impl GitSession {
    /// Credentials answered to authentication challenges.
    ///
    /// Uses `explicit` when given, otherwise the stored credentials. The
    /// token doubles as username when no username is set.
    pub fn build_on_auth(&self, explicit: Option<Credentials>) -> Option<HttpAuth> {
        let credentials = explicit.or_else(|| self.state.git_credentials())?;
        let username = if credentials.username.is_empty() {
            credentials.token.clone()
        } else {
            credentials.username
        };
        Some(HttpAuth {
            username,
            password: credentials.token,
        })
    }

    /// Progress callback that publishes percentages once totals are known.
    pub fn progress_reporter(&self) -> ProgressFn {
        let state = self.state.clone();
        Arc::new(move |progress: TransferProgress| {
            if let Some(percent) = progress.percent() {
                state.set_git_operation_progress(percent);
            }
        })
    }

    fn remote_transport(&self) -> crate::git::Transport {
        self.transport(None).with_progress(self.progress_reporter())
    }

    /// Push the current branch to `remote`.
    pub async fn push_to_remote(&self, remote: &str) -> Result<(), SessionError> {
        let Some(ws) = self.workspace() else {
            return Ok(());
        };
        let _guard = self
            .begin(Some(OperationKind::Push))
            .inspect_err(|e| self.record_error(e))?;

        let branch = self.state.current_branch();
        let transport = self.remote_transport();
        let name = remote.to_string();
        let result = self
            .run_blocking(&ws, move |git| git.push(&name, &branch, &transport))
            .await;

        match result {
            Ok(()) => {
                self.refresh_status().await;
                self.dispatch(GitEvent::OperationComplete {
                    operation: OperationKind::Push,
                    oid: None,
                });
                Ok(())
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Fetch and integrate the current branch from `remote`.
    ///
    /// Does nothing unless a repository has been detected.
    pub async fn pull_from_remote(&self, remote: &str) -> Result<(), SessionError> {
        let Some(ws) = self.workspace() else {
            return Ok(());
        };
        if !self.state.is_repo_initialized() {
            return Ok(());
        }
        let _guard = self
            .begin(Some(OperationKind::Pull))
            .inspect_err(|e| self.record_error(e))?;

        let branch = self.state.current_branch();
        let author = self.state.git_author();
        let transport = self.remote_transport();
        let name = remote.to_string();
        let result = self
            .run_blocking(&ws, move |git| git.pull(&name, &branch, &author, &transport))
            .await;

        match result {
            Ok(outcome) => {
                tracing::debug!(?outcome, "pull finished");
                self.refresh_status().await;
                self.fetch_commit_log(DEFAULT_COMMIT_LOG_LIMIT).await;
                let oid = match outcome {
                    PullOutcome::UpToDate => None,
                    PullOutcome::FastForward { oid } | PullOutcome::Merged { oid } => Some(oid),
                };
                self.dispatch(GitEvent::OperationComplete {
                    operation: OperationKind::Pull,
                    oid,
                });
                Ok(())
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Fetch every branch from `remote`. Failures are recorded only.
    pub async fn fetch_from_remote(&self, remote: &str) {
        if let Err(e) = self.try_fetch(remote).await {
            self.record_error(&e);
        }
    }

    /// Fetch without recording failures. A busy slot skips the fetch.
    pub(crate) async fn try_fetch(&self, remote: &str) -> Result<(), SessionError> {
        let Some(ws) = self.workspace() else {
            return Ok(());
        };
        let _guard = match self.begin(Some(OperationKind::Fetch)) {
            Ok(guard) => guard,
            Err(e) => {
                tracing::debug!(reason = %e, "fetch skipped");
                return Ok(());
            }
        };

        let transport = self.remote_transport();
        let name = remote.to_string();
        self.run_blocking(&ws, move |git| git.fetch(&name, None, &transport))
            .await?;

        self.refresh_branches().await;
        self.dispatch(GitEvent::OperationComplete {
            operation: OperationKind::Fetch,
            oid: None,
        });
        Ok(())
    }

    /// Configured remotes, empty on failure.
    pub async fn list_remotes(&self) -> Vec<Remote> {
        let Some(ws) = self.workspace() else {
            return Vec::new();
        };
        self.run_blocking(&ws, |git| git.list_remotes())
            .await
            .unwrap_or_else(|e| {
                tracing::debug!(error = %e, "could not list remotes");
                Vec::new()
            })
    }

    /// Add a remote, then refresh branches.
    pub async fn add_remote(&self, name: &str, url: &str) {
        let Some(ws) = self.workspace() else {
            return;
        };
        let (name, url) = (name.to_string(), url.to_string());
        if let Err(e) = self
            .run_blocking(&ws, move |git| git.add_remote(&name, &url))
            .await
        {
            self.record_error(&e);
            return;
        }
        self.refresh_branches().await;
    }
}
