//! remote commands - Manage remotes and sync the current branch

use anyhow::Result;

use super::Context;

pub async fn add(ctx: &Context, name: &str, url: &str) -> Result<()> {
    ctx.require_repo()?;
    ctx.session.add_remote(name, url).await;
    ctx.check()
}

pub async fn list(ctx: &Context) -> Result<()> {
    ctx.require_repo()?;
    for remote in ctx.session.list_remotes().await {
        println!("{}\t{}", remote.name, remote.url);
    }
    Ok(())
}

pub async fn fetch(ctx: &Context, remote: &str) -> Result<()> {
    ctx.require_repo()?;
    ctx.session.fetch_from_remote(remote).await;
    ctx.check()?;
    println!("Fetched {} from {remote}", ctx.store.snapshot().current_branch);
    Ok(())
}

pub async fn push(ctx: &Context, remote: &str) -> Result<()> {
    ctx.require_repo()?;
    ctx.session.push_to_remote(remote).await?;
    println!("Pushed {} to {remote}", ctx.store.snapshot().current_branch);
    Ok(())
}

pub async fn pull(ctx: &Context, remote: &str) -> Result<()> {
    ctx.require_repo()?;
    ctx.session.pull_from_remote(remote).await?;
    let snapshot = ctx.store.snapshot();
    match snapshot.commit_log.first() {
        Some(head) => println!(
            "{} is at {} {}",
            snapshot.current_branch,
            &head.oid[..7.min(head.oid.len())],
            head.summary()
        ),
        None => println!("Pulled {} from {remote}", snapshot.current_branch),
    }
    Ok(())
}
