//! branch commands - List, switch, create and delete branches

use anyhow::Result;

use super::Context;

/// List branches, marking the current one with an asterisk.
pub fn branches(ctx: &Context) -> Result<()> {
    ctx.require_repo()?;
    for branch in ctx.store.snapshot().branches {
        let marker = if branch.is_current_branch { "*" } else { " " };
        let tip = &branch.last_commit_oid[..7.min(branch.last_commit_oid.len())];
        println!("{marker} {:<30} {tip}", branch.name);
    }
    Ok(())
}

pub async fn checkout(ctx: &Context, name: &str) -> Result<()> {
    ctx.require_repo()?;
    ctx.session.checkout_branch(name).await;
    ctx.check()?;
    println!("Switched to branch '{name}'");
    Ok(())
}

pub async fn create(ctx: &Context, name: &str, checkout: bool) -> Result<()> {
    ctx.require_repo()?;
    ctx.session.create_branch(name, checkout).await;
    ctx.check()?;
    if checkout {
        println!("Switched to a new branch '{name}'");
    } else {
        println!("Created branch '{name}'");
    }
    Ok(())
}

pub async fn delete(ctx: &Context, name: &str) -> Result<()> {
    ctx.require_repo()?;
    ctx.session.delete_branch(name).await;
    ctx.check()?;
    println!("Deleted branch {name}");
    Ok(())
}
