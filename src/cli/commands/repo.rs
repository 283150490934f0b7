//! repository commands - init, clone and background fetch

use anyhow::{bail, Context as _, Result};

use crate::core::state::GitStateStore;

use super::Context;

/// Create a repository with a `main` branch in the workspace.
pub async fn init(ctx: &Context) -> Result<()> {
    if ctx.session.get_handle().is_none() {
        bail!("No filesystem available for the {:?} backend", ctx.backend);
    }
    if ctx.store.is_repo_initialized() {
        println!("Already a git repository: {}", ctx.workspace.display());
        return Ok(());
    }
    ctx.session.initialize_repository().await;
    ctx.check()?;
    println!("Initialized empty repository in {}", ctx.workspace.display());
    Ok(())
}

/// Clone `url` into `dir` under the workspace root.
pub async fn clone(ctx: &Context, url: &str, dir: &str) -> Result<()> {
    let Some(fs) = ctx.session.get_handle() else {
        bail!("No filesystem available for the {:?} backend", ctx.backend);
    };
    let root = ctx.session.get_root_dir();
    let target = format!("{}/{}", root.trim_end_matches('/'), dir.trim_start_matches('/'));

    ctx.session
        .clone_repository(url, &fs, &target, None)
        .await
        .with_context(|| format!("Failed to clone {url}"))?;
    println!("Cloned {url} into {dir}");
    Ok(())
}

/// Run auto-fetch until Ctrl-C.
pub async fn watch(ctx: &Context) -> Result<()> {
    ctx.require_repo()?;
    ctx.session.start_auto_fetch();
    if !ctx.session.is_auto_fetch_running() {
        bail!("Auto-fetch is disabled in the configuration");
    }

    let period = ctx.store.snapshot().git_settings.auto_fetch_period();
    println!("Fetching every {}s; press Ctrl-C to stop", period.as_secs());
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    ctx.session.stop_auto_fetch();
    Ok(())
}
