//! commit and log commands

use anyhow::Result;

use super::Context;

/// Commit staged changes and print the short id.
pub async fn commit(ctx: &Context, message: &str) -> Result<()> {
    ctx.require_repo()?;
    let oid = ctx.session.create_commit(message).await?;
    let branch = ctx.store.snapshot().current_branch;
    println!("[{} {}] {}", branch, &oid[..7.min(oid.len())], message.lines().next().unwrap_or(""));
    Ok(())
}

/// Show up to `limit` commits, newest first.
pub async fn log(ctx: &Context, limit: usize) -> Result<()> {
    ctx.require_repo()?;
    ctx.session.fetch_commit_log(limit).await;

    for record in ctx.store.snapshot().commit_log {
        let when = record
            .authored_at()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{}  {}  {:<20}  {}",
            &record.oid[..7.min(record.oid.len())],
            when,
            record.author.name,
            record.summary()
        );
    }
    Ok(())
}
