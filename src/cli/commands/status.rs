//! status commands - Inspect and edit the index

use anyhow::{bail, Result};

use crate::core::types::FileStatusEntry;

use super::Context;

fn print_section(title: &str, entries: &[FileStatusEntry]) {
    if entries.is_empty() {
        return;
    }
    println!("{title}:");
    for entry in entries {
        println!("  {:>10}  {}", entry.status.as_str(), entry.path);
    }
}

/// Show the published status.
pub fn status(ctx: &Context) -> Result<()> {
    ctx.require_repo()?;
    let Some(status) = ctx.store.snapshot().git_status else {
        bail!("Status unavailable (see log output with -v)");
    };

    println!("On branch {}", status.branch);
    if !status.is_dirty {
        println!("Nothing to commit, working tree clean");
        return Ok(());
    }
    print_section("Staged", &status.staged_files);
    print_section("Not staged", &status.unstaged_files);
    print_section("Untracked", &status.untracked_files);
    Ok(())
}

pub async fn stage(ctx: &Context, path: &str) -> Result<()> {
    ctx.require_repo()?;
    ctx.session.stage_file(path).await;
    ctx.check()
}

pub async fn stage_all(ctx: &Context) -> Result<()> {
    ctx.require_repo()?;
    ctx.session.stage_all_files().await;
    ctx.check()?;
    println!("{} file(s) staged", ctx.session.staged_file_count());
    Ok(())
}

pub async fn unstage(ctx: &Context, path: &str) -> Result<()> {
    ctx.require_repo()?;
    ctx.session.unstage_file(path).await;
    ctx.check()
}

pub async fn discard(ctx: &Context, path: &str) -> Result<()> {
    ctx.require_repo()?;
    ctx.session.discard_file_changes(path).await;
    ctx.check()
}

pub async fn diff_summary(ctx: &Context) -> Result<()> {
    ctx.require_repo()?;
    let summary = ctx.session.get_staged_diff().await;
    if summary.is_empty() {
        println!("No staged changes");
    } else {
        println!("{summary}");
    }
    Ok(())
}

/// Print `path` as committed at HEAD.
pub async fn show(ctx: &Context, path: &str) -> Result<()> {
    ctx.require_repo()?;
    match ctx.session.get_file_at_head(path).await {
        Some(content) => {
            print!("{content}");
            Ok(())
        }
        None => bail!("{path} is not in HEAD"),
    }
}
