//! session::branch
//!
//! Checkout, create, delete and list branches.
//!
//! None of these return errors; failures land in the shared error field.

use crate::core::config::{DEFAULT_COMMIT_LOG_LIMIT, DEFAULT_REMOTE};
use crate::core::events::GitEvent;
use crate::core::types::{Branch, BranchName};

use super::GitSession;

impl GitSession {
    /// Switch to `name`, then refresh status, log and branches.
    ///
    /// On failure the current branch is left unchanged.
    pub async fn checkout_branch(&self, name: &str) {
        let Some(ws) = self.workspace() else {
            return;
        };
        let target = name.to_string();
        if let Err(e) = self
            .run_blocking(&ws, move |git| git.checkout_branch(&target))
            .await
        {
            self.record_error(&e);
            return;
        }

        tracing::info!(branch = name, "checked out branch");
        self.state.set_current_branch(name.to_string());
        self.refresh_status().await;
        self.fetch_commit_log(DEFAULT_COMMIT_LOG_LIMIT).await;
        self.refresh_branches().await;
        self.dispatch(GitEvent::BranchChanged {
            branch: name.to_string(),
        });
    }

    /// Create `name` at HEAD, optionally switching to it.
    pub async fn create_branch(&self, name: &str, checkout: bool) {
        let Some(ws) = self.workspace() else {
            return;
        };
        let branch = match BranchName::new(name) {
            Ok(branch) => branch,
            Err(e) => {
                self.record_error(&e);
                return;
            }
        };

        if let Err(e) = self
            .run_blocking(&ws, move |git| git.create_branch(&branch))
            .await
        {
            self.record_error(&e);
            return;
        }

        if checkout {
            self.checkout_branch(name).await;
        } else {
            self.refresh_branches().await;
        }
    }

    pub async fn delete_branch(&self, name: &str) {
        let Some(ws) = self.workspace() else {
            return;
        };
        let target = name.to_string();
        if let Err(e) = self
            .run_blocking(&ws, move |git| git.delete_branch(&target))
            .await
        {
            self.record_error(&e);
            return;
        }
        self.refresh_branches().await;
    }

    /// Publish local branches, `origin/` remote branches and remotes.
    ///
    /// Remote listings that fail are published as empty.
    pub async fn refresh_branches(&self) {
        let Some(ws) = self.workspace() else {
            return;
        };

        let local = match self.run_blocking(&ws, |git| git.list_branches()).await {
            Ok(local) => local,
            Err(e) => {
                self.record_error(&e);
                return;
            }
        };
        let remote = self
            .run_blocking(&ws, |git| git.list_remote_branches(DEFAULT_REMOTE))
            .await
            .unwrap_or_else(|e| {
                tracing::debug!(error = %e, "no remote branches");
                Vec::new()
            });

        let current = self.state.current_branch();
        let mut branches: Vec<Branch> = local
            .into_iter()
            .map(|tip| Branch {
                is_current_branch: tip.name == current,
                name: tip.name,
                is_remote: false,
                last_commit_oid: tip.oid,
            })
            .collect();
        branches.extend(remote.into_iter().map(|tip| Branch {
            name: format!("{DEFAULT_REMOTE}/{}", tip.name),
            is_remote: true,
            is_current_branch: false,
            last_commit_oid: tip.oid,
        }));
        tracing::debug!(count = branches.len(), "branches refreshed");
        self.state.set_branches(branches);

        let remotes = self
            .run_blocking(&ws, |git| git.list_remotes())
            .await
            .unwrap_or_default();
        self.state.set_remotes(remotes);
    }
}
