//! git::transport
//!
//! Network operations: clone, fetch, pull and push over HTTP(S).
//!
//! Every URL is routed through the configured CORS proxy before libgit2 sees
//! it, using an anonymous remote so the configured remote URL is never
//! rewritten. Credentials are answered as user/password plaintext. All
//! functions here block; callers run them on a blocking thread.

use std::path::Path;
use std::sync::Arc;

use crate::core::types::Author;

use super::interface::{Git, GitError};

/// Authentication attempts before libgit2 is told to give up.
const MAX_AUTH_ATTEMPTS: usize = 3;

/// Username and password answered to an authentication challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Objects (or bytes, for push) transferred so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub loaded: usize,
    pub total: usize,
}

impl TransferProgress {
    /// `round(loaded / total * 100)`, `None` while the total is unknown.
    pub fn percent(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let pct = (self.loaded as f64 / self.total as f64 * 100.0).round();
        Some(pct.clamp(0.0, 100.0) as u8)
    }
}

/// Callback receiving transfer progress. Must not block.
pub type ProgressFn = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Result of a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    UpToDate,
    FastForward { oid: String },
    Merged { oid: String },
}

/// How to reach a remote.
#[derive(Clone, Default)]
pub struct Transport {
    cors_proxy: Option<String>,
    auth: Option<HttpAuth>,
    progress: Option<ProgressFn>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("cors_proxy", &self.cors_proxy)
            .field("auth", &self.auth)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route HTTP(S) URLs through `proxy`. Blank disables proxying.
    pub fn with_cors_proxy(mut self, proxy: impl Into<String>) -> Self {
        let proxy = proxy.into();
        self.cors_proxy = (!proxy.trim().is_empty()).then_some(proxy);
        self
    }

    pub fn with_auth(mut self, auth: Option<HttpAuth>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The URL libgit2 actually connects to.
    ///
    /// `https://github.com/o/r.git` through `https://proxy.example/` becomes
    /// `https://proxy.example/github.com/o/r.git`. Local paths and `file://`
    /// URLs are returned unchanged.
    pub fn effective_url(&self, url: &str) -> String {
        let Some(proxy) = &self.cors_proxy else {
            return url.to_string();
        };
        match strip_http_scheme(url) {
            Some(rest) => format!("{}/{}", proxy.trim_end_matches('/'), rest),
            None => url.to_string(),
        }
    }

    fn callbacks(&self) -> git2::RemoteCallbacks<'static> {
        let mut callbacks = git2::RemoteCallbacks::new();

        let auth = self.auth.clone();
        let mut attempts = 0;
        callbacks.credentials(move |_url, _username, allowed| {
            attempts += 1;
            let Some(auth) = &auth else {
                return Err(git2::Error::from_str(
                    "authentication required but no credentials are configured",
                ));
            };
            if attempts > MAX_AUTH_ATTEMPTS {
                return Err(git2::Error::from_str("authentication failed"));
            }
            if !allowed.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
                return Err(git2::Error::from_str(
                    "remote does not accept username/password authentication",
                ));
            }
            git2::Cred::userpass_plaintext(&auth.username, &auth.password)
        });

        if let Some(progress) = self.progress.clone() {
            let on_fetch = progress.clone();
            callbacks.transfer_progress(move |stats| {
                on_fetch(TransferProgress {
                    loaded: stats.received_objects(),
                    total: stats.total_objects(),
                });
                true
            });
            callbacks.push_transfer_progress(move |current, total, _bytes| {
                progress(TransferProgress {
                    loaded: current,
                    total,
                });
            });
        }

        callbacks
    }

    fn fetch_options(&self) -> git2::FetchOptions<'static> {
        let mut opts = git2::FetchOptions::new();
        opts.remote_callbacks(self.callbacks());
        opts
    }
}

fn strip_http_scheme(url: &str) -> Option<&str> {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
}

fn is_network_url(url: &str) -> bool {
    strip_http_scheme(url).is_some()
}

impl Git {
    // =========================================================================
    // Clone
    // =========================================================================

    /// Clone the remote default branch of `url` into `dest`.
    ///
    /// Only that branch is fetched, at depth 1 over HTTP(S). `origin` keeps
    /// the original URL. A remote without any branch yields an empty
    /// repository with `origin` configured.
    pub fn clone_repo(
        url: &str,
        dest: &Path,
        default_branch: &str,
        transport: &Transport,
    ) -> Result<Self, GitError> {
        let effective = transport.effective_url(url);
        tracing::info!(url, dest = %dest.display(), "cloning");

        let branch = match remote_default_branch(&effective, default_branch, transport) {
            Ok(branch) => branch,
            Err(GitError::RefNotFound { .. }) => {
                let git = Git::init(dest, default_branch)?;
                git.add_remote("origin", url)?;
                tracing::info!(url, "remote is empty; initialized repository");
                return Ok(git);
            }
            Err(e) => return Err(e),
        };

        let mut fetch = transport.fetch_options();
        if is_network_url(&effective) {
            fetch.depth(1);
        }

        let refspec_branch = branch.clone();
        let mut builder = git2::build::RepoBuilder::new();
        builder
            .branch(&branch)
            .fetch_options(fetch)
            .remote_create(move |repo, name, remote_url| {
                let refspec =
                    format!("+refs/heads/{refspec_branch}:refs/remotes/{name}/{refspec_branch}");
                repo.remote_with_fetch(name, remote_url, &refspec)
            });

        let repo = builder
            .clone(&effective, dest)
            .map_err(|e| GitError::from_git2(e, url))?;
        repo.remote_set_url("origin", url)?;

        tracing::info!(url, branch = %branch, "clone complete");
        Ok(Self { repo })
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    /// Fetch `remote`. With `branch`, only that branch is fetched; otherwise
    /// every branch on the remote.
    pub fn fetch(
        &self,
        remote: &str,
        branch: Option<&str>,
        transport: &Transport,
    ) -> Result<(), GitError> {
        let configured = self
            .repo
            .find_remote(remote)
            .map_err(|_| GitError::RemoteNotFound {
                name: remote.to_string(),
            })?;
        let url = configured.url().unwrap_or_default().to_string();

        // Clones configure a single-branch refspec, so a full fetch names
        // every head explicitly.
        let refspecs = match branch {
            Some(branch) => vec![format!("+refs/heads/{branch}:refs/remotes/{remote}/{branch}")],
            None => vec![format!("+refs/heads/*:refs/remotes/{remote}/*")],
        };

        let mut anonymous = self
            .repo
            .remote_anonymous(&transport.effective_url(&url))?;
        tracing::debug!(remote, ?refspecs, "fetching");
        anonymous
            .fetch(&refspecs, Some(&mut transport.fetch_options()), None)
            .map_err(|e| GitError::from_git2(e, remote))?;
        Ok(())
    }

    // =========================================================================
    // Pull
    // =========================================================================

    /// Fetch `branch` from `remote` and integrate it into the local branch.
    ///
    /// Fast-forwards when possible; otherwise merges in memory and commits
    /// with `author`. Conflicts leave the repository untouched.
    pub fn pull(
        &self,
        remote: &str,
        branch: &str,
        author: &Author,
        transport: &Transport,
    ) -> Result<PullOutcome, GitError> {
        self.fetch(remote, Some(branch), transport)?;

        let tracking = format!("refs/remotes/{remote}/{branch}");
        let theirs = self
            .repo
            .find_reference(&tracking)
            .map_err(|e| GitError::from_git2(e, &tracking))?
            .peel_to_commit()?;
        let annotated = self.repo.find_annotated_commit(theirs.id())?;
        let (analysis, _) = self.repo.merge_analysis(&[&annotated])?;

        if analysis.is_up_to_date() {
            tracing::info!(remote, branch, "already up to date");
            return Ok(PullOutcome::UpToDate);
        }

        let local_ref = format!("refs/heads/{branch}");
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.safe();

        if analysis.is_fast_forward() || analysis.is_unborn() {
            self.repo
                .checkout_tree(theirs.as_object(), Some(&mut checkout))
                .map_err(|e| GitError::from_git2(e, &local_ref))?;
            self.repo
                .reference(&local_ref, theirs.id(), true, "pull: fast-forward")?;
            self.repo.set_head(&local_ref)?;
            tracing::info!(remote, branch, "fast-forwarded");
            return Ok(PullOutcome::FastForward {
                oid: theirs.id().to_string(),
            });
        }

        let ours = self.repo.head()?.peel_to_commit()?;
        let mut merged = self.repo.merge_commits(&ours, &theirs, None)?;
        if merged.has_conflicts() {
            tracing::warn!(remote, branch, "pull would conflict; aborted");
            return Err(GitError::MergeConflict {
                branch: branch.to_string(),
            });
        }

        let tree_oid = merged.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_oid)?;
        self.repo
            .checkout_tree(tree.as_object(), Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, &local_ref))?;

        let signature = git2::Signature::now(&author.name, &author.email)?;
        let message = format!("Merge branch '{branch}' of {remote}");
        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, &message, &tree, &[&ours, &theirs])?;
        tracing::info!(remote, branch, %oid, "merged");
        Ok(PullOutcome::Merged {
            oid: oid.to_string(),
        })
    }

    // =========================================================================
    // Push
    // =========================================================================

    /// Push the local `branch` to `remote` under the same name.
    pub fn push(&self, remote: &str, branch: &str, transport: &Transport) -> Result<(), GitError> {
        let url = self.remote_url(remote)?;
        let local_ref = format!("refs/heads/{branch}");
        let local_oid = self
            .repo
            .refname_to_id(&local_ref)
            .map_err(|e| GitError::from_git2(e, &local_ref))?;

        let rejection = Arc::new(std::sync::Mutex::new(None::<(String, String)>));
        let mut callbacks = transport.callbacks();
        let record = rejection.clone();
        callbacks.push_update_reference(move |refname, status| {
            if let Some(message) = status {
                if let Ok(mut slot) = record.lock() {
                    *slot = Some((refname.to_string(), message.to_string()));
                }
            }
            Ok(())
        });
        let mut opts = git2::PushOptions::new();
        opts.remote_callbacks(callbacks);

        let mut anonymous = self
            .repo
            .remote_anonymous(&transport.effective_url(&url))?;
        let refspec = format!("{local_ref}:{local_ref}");
        tracing::debug!(remote, branch, "pushing");
        anonymous
            .push(&[refspec.as_str()], Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, remote))?;

        let rejected = rejection
            .lock()
            .map(|mut slot| slot.take())
            .unwrap_or_default();
        if let Some((refname, message)) = rejected {
            return Err(GitError::PushRejected { refname, message });
        }

        self.repo.reference(
            &format!("refs/remotes/{remote}/{branch}"),
            local_oid,
            true,
            "push",
        )?;
        tracing::info!(remote, branch, "pushed");
        Ok(())
    }
}

/// Ask the remote which branch to clone.
///
/// Prefers the branch the remote HEAD names, then `fallback`, then the first
/// advertised branch.
fn remote_default_branch(
    url: &str,
    fallback: &str,
    transport: &Transport,
) -> Result<String, GitError> {
    let mut remote = git2::Remote::create_detached(url)?;
    let connection = remote
        .connect_auth(git2::Direction::Fetch, Some(transport.callbacks()), None)
        .map_err(|e| GitError::from_git2(e, url))?;

    let advertised: Vec<String> = connection
        .list()
        .map_err(|e| GitError::from_git2(e, url))?
        .iter()
        .filter_map(|head| head.name().strip_prefix("refs/heads/"))
        .map(str::to_string)
        .collect();
    let head = connection
        .default_branch()
        .ok()
        .and_then(|buf| buf.as_str().map(str::to_string))
        .and_then(|name| name.strip_prefix("refs/heads/").map(str::to_string));
    drop(connection);

    head.filter(|name| advertised.contains(name))
        .or_else(|| advertised.iter().find(|b| *b == fallback).cloned())
        .or_else(|| advertised.first().cloned())
        .ok_or_else(|| GitError::RefNotFound {
            refname: "HEAD".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::interface::tests::{author, Fixture};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// A bare repository seeded from a fixture's `main`.
    fn bare_remote(seed: &Fixture) -> TempDir {
        let dir = TempDir::new().unwrap();
        let bare = git2::Repository::init_bare(dir.path()).unwrap();
        bare.set_head("refs/heads/main").unwrap();
        let url = dir.path().to_str().unwrap().to_string();
        seed.git.add_remote("origin", &url).unwrap();
        seed.git.push("origin", "main", &Transport::new()).unwrap();
        dir
    }

    mod urls {
        use super::*;

        #[test]
        fn proxy_rewrites_http_urls() {
            let t = Transport::new().with_cors_proxy("https://cors.example/");
            assert_eq!(
                t.effective_url("https://github.com/o/r.git"),
                "https://cors.example/github.com/o/r.git"
            );
            assert_eq!(
                t.effective_url("http://host/r"),
                "https://cors.example/host/r"
            );
        }

        #[test]
        fn local_urls_are_not_proxied() {
            let t = Transport::new().with_cors_proxy("https://cors.example");
            assert_eq!(t.effective_url("/srv/repo.git"), "/srv/repo.git");
            assert_eq!(t.effective_url("file:///srv/r"), "file:///srv/r");
        }

        #[test]
        fn blank_proxy_disables_rewriting() {
            let t = Transport::new().with_cors_proxy("  ");
            assert_eq!(t.effective_url("https://h/r"), "https://h/r");
        }
    }

    mod progress {
        use super::*;

        #[test]
        fn percent_rounds() {
            let p = TransferProgress {
                loaded: 100,
                total: 500,
            };
            assert_eq!(p.percent(), Some(20));
            let p = TransferProgress { loaded: 1, total: 3 };
            assert_eq!(p.percent(), Some(33));
            let p = TransferProgress { loaded: 5, total: 0 };
            assert_eq!(p.percent(), None);
        }

        #[test]
        fn auth_debug_redacts_password() {
            let auth = HttpAuth {
                username: "octo".into(),
                password: "hunter2".into(),
            };
            assert!(!format!("{auth:?}").contains("hunter2"));
        }
    }

    mod sync {
        use super::*;

        #[test]
        fn push_updates_remote_and_tracking_ref() {
            let fx = Fixture::new();
            let oid = fx.commit_file("a.txt", "a", "first");
            let remote = bare_remote(&fx);

            let bare = git2::Repository::open_bare(remote.path()).unwrap();
            assert_eq!(
                bare.refname_to_id("refs/heads/main").unwrap().to_string(),
                oid
            );
            assert_eq!(
                fx.git
                    .repo
                    .refname_to_id("refs/remotes/origin/main")
                    .unwrap()
                    .to_string(),
                oid
            );
        }

        #[test]
        fn push_to_unknown_remote_fails() {
            let fx = Fixture::new();
            fx.commit_file("a.txt", "a", "first");
            assert!(matches!(
                fx.git.push("nowhere", "main", &Transport::new()),
                Err(GitError::RemoteNotFound { .. })
            ));
        }

        #[test]
        fn clone_then_pull_fast_forward() {
            let upstream = Fixture::new();
            upstream.commit_file("a.txt", "a", "first");
            let remote = bare_remote(&upstream);
            let url = remote.path().to_str().unwrap();

            let dest = TempDir::new().unwrap();
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = seen.clone();
            let transport = Transport::new().with_progress(Arc::new(move |p| {
                sink.lock().unwrap().push(p);
            }));
            let clone = Git::clone_repo(url, &dest.path().join("c"), "main", &transport).unwrap();
            assert_eq!(clone.current_branch().unwrap(), "main");
            assert_eq!(clone.remote_url("origin").unwrap(), url);
            assert!(seen.lock().unwrap().iter().all(|p| p.loaded <= p.total));

            let newer = upstream.commit_file("b.txt", "b", "second");
            upstream.git.push("origin", "main", &Transport::new()).unwrap();

            let outcome = clone
                .pull("origin", "main", &author(), &Transport::new())
                .unwrap();
            assert_eq!(outcome, PullOutcome::FastForward { oid: newer });
            assert!(dest.path().join("c/b.txt").exists());

            let again = clone
                .pull("origin", "main", &author(), &Transport::new())
                .unwrap();
            assert_eq!(again, PullOutcome::UpToDate);
        }

        #[test]
        fn pull_merges_divergent_history() {
            let upstream = Fixture::new();
            upstream.commit_file("a.txt", "a", "first");
            let remote = bare_remote(&upstream);
            let url = remote.path().to_str().unwrap();

            let dest = TempDir::new().unwrap();
            let path = dest.path().join("c");
            let clone = Git::clone_repo(url, &path, "main", &Transport::new()).unwrap();

            upstream.commit_file("theirs.txt", "t", "theirs");
            upstream.git.push("origin", "main", &Transport::new()).unwrap();

            std::fs::write(path.join("ours.txt"), "o").unwrap();
            clone.add("ours.txt").unwrap();
            clone.commit("ours", &author()).unwrap();

            let outcome = clone
                .pull("origin", "main", &author(), &Transport::new())
                .unwrap();
            assert!(matches!(outcome, PullOutcome::Merged { .. }));
            assert!(path.join("theirs.txt").exists());
            assert!(path.join("ours.txt").exists());
            assert_eq!(clone.log(10).unwrap()[0].summary(), "Merge branch 'main' of origin");
        }

        #[test]
        fn pull_conflict_leaves_head_alone() {
            let upstream = Fixture::new();
            upstream.commit_file("a.txt", "base\n", "first");
            let remote = bare_remote(&upstream);
            let url = remote.path().to_str().unwrap();

            let dest = TempDir::new().unwrap();
            let path = dest.path().join("c");
            let clone = Git::clone_repo(url, &path, "main", &Transport::new()).unwrap();

            upstream.commit_file("a.txt", "theirs\n", "theirs");
            upstream.git.push("origin", "main", &Transport::new()).unwrap();

            std::fs::write(path.join("a.txt"), "ours\n").unwrap();
            clone.add("a.txt").unwrap();
            let ours = clone.commit("ours", &author()).unwrap();

            let err = clone
                .pull("origin", "main", &author(), &Transport::new())
                .unwrap_err();
            assert!(matches!(err, GitError::MergeConflict { .. }));
            assert_eq!(clone.log(1).unwrap()[0].oid, ours);
            assert_eq!(std::fs::read_to_string(path.join("a.txt")).unwrap(), "ours\n");
        }

        #[test]
        fn fetch_updates_tracking_branches() {
            let upstream = Fixture::new();
            upstream.commit_file("a.txt", "a", "first");
            let remote = bare_remote(&upstream);
            let url = remote.path().to_str().unwrap();

            let dest = TempDir::new().unwrap();
            let clone =
                Git::clone_repo(url, &dest.path().join("c"), "main", &Transport::new()).unwrap();

            let newer = upstream.commit_file("b.txt", "b", "second");
            upstream.git.push("origin", "main", &Transport::new()).unwrap();

            clone.fetch("origin", None, &Transport::new()).unwrap();
            let tips = clone.list_remote_branches("origin").unwrap();
            assert_eq!(tips.len(), 1);
            assert_eq!(tips[0].name, "main");
            assert_eq!(tips[0].oid, newer);
        }

        #[test]
        fn full_fetch_picks_up_new_remote_branches() {
            let upstream = Fixture::new();
            upstream.commit_file("a.txt", "a", "first");
            let remote = bare_remote(&upstream);
            let url = remote.path().to_str().unwrap();

            let dest = TempDir::new().unwrap();
            let clone =
                Git::clone_repo(url, &dest.path().join("c"), "main", &Transport::new()).unwrap();

            let feature = crate::core::types::BranchName::new("feature").unwrap();
            upstream.git.create_branch(&feature).unwrap();
            upstream.git.push("origin", "feature", &Transport::new()).unwrap();

            clone.fetch("origin", Some("main"), &Transport::new()).unwrap();
            assert_eq!(clone.list_remote_branches("origin").unwrap().len(), 1);

            clone.fetch("origin", None, &Transport::new()).unwrap();
            let names: Vec<_> = clone
                .list_remote_branches("origin")
                .unwrap()
                .into_iter()
                .map(|tip| tip.name)
                .collect();
            assert_eq!(names, vec!["feature".to_string(), "main".to_string()]);
        }

        #[test]
        fn clone_of_empty_remote_initializes() {
            let remote = TempDir::new().unwrap();
            git2::Repository::init_bare(remote.path()).unwrap();
            let url = remote.path().to_str().unwrap();

            let dest = TempDir::new().unwrap();
            let git =
                Git::clone_repo(url, &dest.path().join("c"), "main", &Transport::new()).unwrap();
            assert_eq!(git.current_branch().unwrap(), "main");
            assert_eq!(git.remote_url("origin").unwrap(), url);
        }
    }
}
