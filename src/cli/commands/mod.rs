//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Calls one session operation
//! 2. Reads what the operation published to the state container
//! 3. Formats and displays output
//!
//! Session operations record most failures instead of returning them, so
//! handlers finish with [`Context::check`] to turn a recorded error into a
//! non-zero exit.

mod branch;
mod commit;
mod remote;
mod repo;
mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};

use crate::cli::args::{BackendArg, Command, RemoteAction};
use crate::core::config::Config;
use crate::core::events::EventBus;
use crate::core::state::{GitStateStore, MemoryStateStore};
use crate::core::types::{CredentialKind, Credentials};
use crate::fs::{DirectoryHandle, HostEnvironment};
use crate::session::GitSession;

/// Token used for HTTP authentication.
pub const TOKEN_ENV: &str = "EGIT_TOKEN";
/// Username paired with the token; the token is used when unset.
pub const USERNAME_ENV: &str = "EGIT_USERNAME";

/// Everything a handler needs: the session and the state it publishes to.
pub struct Context {
    pub session: Arc<GitSession>,
    pub store: Arc<MemoryStateStore>,
    pub workspace: PathBuf,
    pub backend: BackendArg,
}

impl Context {
    /// Build a session for `workspace` and run workspace initialization.
    pub async fn open(workspace: Option<PathBuf>, backend: BackendArg) -> Result<Self> {
        let workspace = match workspace {
            Some(path) => path,
            None => std::env::current_dir().context("Failed to read current directory")?,
        };
        let workspace = std::fs::canonicalize(&workspace)
            .with_context(|| format!("Workspace not found: {}", workspace.display()))?;

        let config = Config::load().context("Failed to load configuration")?;
        let store = Arc::new(MemoryStateStore::with_defaults(
            config.author(),
            config.git_settings(),
        ));
        store.set_workspace_path(Some(workspace.display().to_string()));
        store.set_git_credentials(credentials_from_env());

        let host = match backend {
            BackendArg::Native => HostEnvironment::native(),
            BackendArg::Directory | BackendArg::Virtual => HostEnvironment::sandboxed(),
        };
        let session = Arc::new(GitSession::new(&config, host, store.clone(), EventBus::new()));

        let directory = match backend {
            BackendArg::Directory => Some(
                DirectoryHandle::grant(&workspace)
                    .with_context(|| format!("Cannot open {}", workspace.display()))?,
            ),
            _ => None,
        };
        session.initialize_for_workspace(directory).await;

        if backend == BackendArg::Native {
            tracing::warn!("native backend: git work belongs to the host, nothing will happen");
        }

        Ok(Self {
            session,
            store,
            workspace,
            backend,
        })
    }

    /// Fail if the last operation recorded an error.
    pub fn check(&self) -> Result<()> {
        match self.store.snapshot().operation.error {
            Some(error) => bail!("{error}"),
            None => Ok(()),
        }
    }

    /// Fail unless the workspace holds a repository.
    pub fn require_repo(&self) -> Result<()> {
        if self.session.get_handle().is_none() {
            bail!("No filesystem available for the {:?} backend", self.backend);
        }
        if !self.store.is_repo_initialized() {
            bail!(
                "Not a git repository: {} (run `egit init` first)",
                self.workspace.display()
            );
        }
        Ok(())
    }
}

fn credentials_from_env() -> Option<Credentials> {
    let token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty())?;
    Some(Credentials {
        kind: CredentialKind::Pat,
        username: std::env::var(USERNAME_ENV).unwrap_or_default(),
        token,
    })
}

/// Dispatch a command to its handler.
pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        // Read-only
        Command::Status => status::status(ctx),
        Command::Branches => branch::branches(ctx),
        Command::Log { limit } => commit::log(ctx, limit).await,
        Command::DiffSummary => status::diff_summary(ctx).await,
        Command::Show { path } => status::show(ctx, &path).await,

        // Index
        Command::Stage { path } => status::stage(ctx, &path).await,
        Command::StageAll => status::stage_all(ctx).await,
        Command::Unstage { path } => status::unstage(ctx, &path).await,
        Command::Discard { path } => status::discard(ctx, &path).await,
        Command::Commit { message } => commit::commit(ctx, &message).await,

        // Branches
        Command::Checkout { name } => branch::checkout(ctx, &name).await,
        Command::Branch { name, no_checkout } => branch::create(ctx, &name, !no_checkout).await,
        Command::DeleteBranch { name } => branch::delete(ctx, &name).await,

        // Remotes
        Command::Remote { action } => match action {
            RemoteAction::Add { name, url } => remote::add(ctx, &name, &url).await,
            RemoteAction::List => remote::list(ctx).await,
        },
        Command::Fetch { remote } => remote::fetch(ctx, &remote).await,
        Command::Push { remote } => remote::push(ctx, &remote).await,
        Command::Pull { remote } => remote::pull(ctx, &remote).await,

        // Repository
        Command::Init => repo::init(ctx).await,
        Command::Clone { url, dir } => repo::clone(ctx, &url, &dir).await,
        Command::Watch => repo::watch(ctx).await,
    }
}
