//! Integration tests for the git session.
//!
//! Every test drives a real repository in a temporary directory reached
//! through a directory capability, and asserts on what the session
//! published to the state container.

mod common;

use common::{bare_remote, run_git, TestWorkspace};

use editor_git::core::events::GitEvent;
use editor_git::core::state::GitStateStore;
use editor_git::core::types::{FileChange, FileStatusEntry, OperationKind};
use editor_git::fs::{Backend, DirectoryHandle, HostEnvironment};
use editor_git::session::SessionError;

// =============================================================================
// Status
// =============================================================================

#[tokio::test]
async fn untracked_file_in_new_repository() {
    let ws = TestWorkspace::new().await;
    ws.session.initialize_repository().await;
    ws.write("a.txt", "hello\n");
    ws.session.refresh_status().await;

    let status = ws.store.git_status().unwrap();
    assert_eq!(
        status.untracked_files,
        vec![FileStatusEntry::unstaged("a.txt", FileChange::Untracked)]
    );
    assert!(status.staged_files.is_empty());
    assert!(status.unstaged_files.is_empty());
    assert!(status.is_dirty);
}

#[tokio::test]
async fn committed_repository_is_clean() {
    let ws = TestWorkspace::with_commit().await;
    let status = ws.store.git_status().unwrap();
    assert!(!status.is_dirty);
    assert_eq!(status.branch, "main");
    assert_eq!(ws.session.changed_file_count(), 0);
}

#[tokio::test]
async fn stage_then_unstage_restores_status() {
    let ws = TestWorkspace::with_commit().await;
    ws.write("README.md", "# changed\n");
    ws.session.refresh_status().await;
    let before = ws.store.git_status().unwrap();
    assert_eq!(
        before.unstaged_files,
        vec![FileStatusEntry::unstaged("README.md", FileChange::Modified)]
    );

    ws.session.stage_file("README.md").await;
    let staged = ws.store.git_status().unwrap();
    assert_eq!(
        staged.staged_files,
        vec![FileStatusEntry::staged("README.md", FileChange::Modified)]
    );
    assert!(staged.unstaged_files.is_empty());

    ws.session.unstage_file("README.md").await;
    assert_eq!(ws.store.git_status().unwrap(), before);
}

#[tokio::test]
async fn partially_staged_file_is_in_both_buckets() {
    let ws = TestWorkspace::with_commit().await;
    ws.write("README.md", "# staged\n");
    ws.session.stage_file("README.md").await;
    ws.write("README.md", "# staged and then edited\n");
    ws.session.refresh_status().await;

    let status = ws.store.git_status().unwrap();
    assert_eq!(status.staged_files.len(), 1);
    assert_eq!(status.unstaged_files.len(), 1);
    assert_eq!(ws.session.staged_file_count(), 1);
    assert_eq!(ws.session.changed_file_count(), 2);
}

#[tokio::test]
async fn deletions_before_and_after_staging() {
    let ws = TestWorkspace::with_commit().await;
    std::fs::remove_file(ws.path().join("README.md")).unwrap();
    ws.session.refresh_status().await;
    assert_eq!(
        ws.store.git_status().unwrap().unstaged_files,
        vec![FileStatusEntry::unstaged("README.md", FileChange::Deleted)]
    );

    ws.session.stage_file("README.md").await;
    assert_eq!(
        ws.store.git_status().unwrap().staged_files,
        vec![FileStatusEntry::staged("README.md", FileChange::Deleted)]
    );
}

#[tokio::test]
async fn discard_restores_committed_content() {
    let ws = TestWorkspace::with_commit().await;
    ws.write("README.md", "# scribbles\n");
    ws.session.stage_file("README.md").await;
    ws.write("README.md", "# more scribbles\n");

    ws.session.discard_file_changes("README.md").await;
    assert_eq!(ws.read("README.md"), "# test\n");
    assert!(!ws.store.git_status().unwrap().is_dirty);
}

#[tokio::test]
async fn stage_all_stages_modified_and_untracked() {
    let ws = TestWorkspace::with_commit().await;
    ws.write("README.md", "# changed\n");
    ws.write("src/lib.rs", "pub fn f() {}\n");
    ws.session.refresh_status().await;

    ws.session.stage_all_files().await;
    let status = ws.store.git_status().unwrap();
    assert_eq!(
        status.staged_files,
        vec![
            FileStatusEntry::staged("README.md", FileChange::Modified),
            FileStatusEntry::staged("src/lib.rs", FileChange::Added),
        ]
    );
    assert!(status.unstaged_files.is_empty());
    assert!(status.untracked_files.is_empty());
}

#[tokio::test]
async fn ignored_paths_are_not_reported() {
    let ws = TestWorkspace::with_commit().await;
    ws.write(".gitignore", "target/\n*.log\n");
    ws.write("target/debug/app", "binary");
    ws.write("build.log", "noise");
    ws.session.refresh_status().await;

    let untracked: Vec<_> = ws
        .store
        .git_status()
        .unwrap()
        .untracked_files
        .into_iter()
        .map(|e| e.path)
        .collect();
    assert_eq!(untracked, vec![".gitignore".to_string()]);
}

#[tokio::test]
async fn hidden_untracked_setting() {
    let ws = TestWorkspace::with_commit().await;
    let mut settings = ws.store.git_settings();
    settings.show_untracked = false;
    ws.store.update_git_settings(settings);

    ws.write("a.txt", "hello\n");
    ws.session.refresh_status().await;
    let status = ws.store.git_status().unwrap();
    assert!(status.untracked_files.is_empty());
    assert!(!status.is_dirty);
}

#[tokio::test]
async fn status_refresh_emits_event() {
    let ws = TestWorkspace::with_commit().await;
    let mut rx = ws.events.subscribe();
    ws.session.refresh_status().await;
    assert_eq!(rx.recv().await.unwrap(), GitEvent::StatusChanged);
}

#[tokio::test]
async fn stage_all_skips_failing_paths_and_stages_the_rest() {
    let ws = TestWorkspace::with_commit().await;
    ws.write("README.md", "# changed\n");
    ws.write("gone.txt", "soon a directory\n");
    ws.session.refresh_status().await;

    std::fs::remove_file(ws.path().join("gone.txt")).unwrap();
    ws.write("gone.txt/inner.txt", "inner\n");
    ws.session.stage_all_files().await;

    let status = ws.store.git_status().unwrap();
    assert_eq!(
        status.staged_files,
        vec![FileStatusEntry::staged("README.md", FileChange::Modified)]
    );
    assert_eq!(
        status.untracked_files,
        vec![FileStatusEntry::unstaged("gone.txt/inner.txt", FileChange::Untracked)]
    );
    assert!(ws.error().is_none());
    assert!(!ws.store.snapshot().operation.in_progress);
}

#[cfg(unix)]
mod symlinks {
    use super::*;
    use std::os::unix::fs::symlink;

    #[tokio::test]
    async fn committed_link_is_clean() {
        let ws = TestWorkspace::with_commit().await;
        symlink("README.md", ws.path().join("link")).unwrap();
        ws.session.stage_file("link").await;
        ws.session.create_commit("Add link").await.unwrap();

        ws.session.refresh_status().await;
        let status = ws.store.git_status().unwrap();
        assert!(!status.is_dirty, "{status:?}");
    }

    #[tokio::test]
    async fn retargeted_link_is_modified() {
        let ws = TestWorkspace::with_commit().await;
        ws.write("other.md", "other\n");
        symlink("README.md", ws.path().join("link")).unwrap();
        ws.session.stage_file("other.md").await;
        ws.session.stage_file("link").await;
        ws.session.create_commit("Add link").await.unwrap();

        std::fs::remove_file(ws.path().join("link")).unwrap();
        symlink("other.md", ws.path().join("link")).unwrap();
        ws.session.refresh_status().await;
        assert_eq!(
            ws.store.git_status().unwrap().unstaged_files,
            vec![FileStatusEntry::unstaged("link", FileChange::Modified)]
        );
    }

    #[tokio::test]
    async fn dangling_link_is_untracked_and_stageable() {
        let ws = TestWorkspace::with_commit().await;
        symlink("nope", ws.path().join("dangling")).unwrap();

        ws.session.refresh_status().await;
        let status = ws.store.git_status().expect("status published");
        assert_eq!(
            status.untracked_files,
            vec![FileStatusEntry::unstaged("dangling", FileChange::Untracked)]
        );

        ws.session.stage_file("dangling").await;
        assert_eq!(
            ws.store.git_status().unwrap().staged_files,
            vec![FileStatusEntry::staged("dangling", FileChange::Added)]
        );
    }

    #[tokio::test]
    async fn linked_directory_is_not_descended() {
        let ws = TestWorkspace::with_commit().await;
        symlink(".", ws.path().join("loop")).unwrap();
        ws.write("sub/file.txt", "x\n");
        symlink("sub", ws.path().join("sub-link")).unwrap();

        ws.session.refresh_status().await;
        let untracked: Vec<_> = ws
            .store
            .git_status()
            .expect("status published")
            .untracked_files
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(untracked, vec!["loop", "sub-link", "sub/file.txt"]);
    }
}

// =============================================================================
// Backends and absence
// =============================================================================

#[tokio::test]
async fn native_host_turns_controllers_into_noops() {
    let ws = TestWorkspace::with_host(HostEnvironment::native()).await;
    assert_eq!(ws.session.backend(), Backend::Native);
    assert!(ws.session.get_handle().is_none());

    ws.session.refresh_status().await;
    ws.session.stage_file("a.txt").await;
    ws.session.checkout_branch("main").await;
    assert!(ws.store.git_status().is_none());
    assert!(ws.error().is_none());

    let err = ws.session.create_commit("msg").await.unwrap_err();
    assert!(matches!(err, SessionError::NoFilesystem));
    assert_eq!(err.to_string(), "no filesystem available");
}

#[tokio::test]
async fn virtual_store_holds_its_own_repository() {
    let ws = TestWorkspace::new().await;
    ws.store.set_workspace_path(Some("/elsewhere".into()));

    assert_eq!(ws.session.backend(), Backend::Virtual);
    assert_eq!(ws.session.get_root_dir(), "/elsewhere");
    assert!(!ws.session.detect_repository());

    ws.session.initialize_repository().await;
    assert!(ws.session.detect_repository());
    assert!(!ws.path().join(".git").exists());

    ws.store.set_workspace_path(Some("/projects/ws".into()));
    assert_eq!(ws.session.backend(), Backend::DirectoryHandle);
    assert!(!ws.session.detect_repository());
}

// =============================================================================
// Commits and branches
// =============================================================================

#[tokio::test]
async fn commit_updates_log_and_status() {
    let ws = TestWorkspace::with_commit().await;
    let oid = ws.commit_file("notes.md", "notes\n", "Add notes").await;

    let snapshot = ws.store.snapshot();
    assert_eq!(snapshot.commit_log.len(), 2);
    assert_eq!(snapshot.commit_log[0].oid, oid);
    assert_eq!(snapshot.commit_log[0].summary(), "Add notes");
    assert_eq!(snapshot.commit_log[0].author, snapshot.git_author);
    assert!(!snapshot.git_status.unwrap().is_dirty);
    assert!(!snapshot.operation.in_progress);
    assert_eq!(snapshot.operation.kind, None);
}

#[tokio::test]
async fn failed_checkout_leaves_branch_and_records_error() {
    let ws = TestWorkspace::with_commit().await;
    ws.session.checkout_branch("nonexistent").await;
    assert_eq!(ws.store.current_branch(), "main");
    assert!(ws.error().unwrap().contains("nonexistent"));
}

#[tokio::test]
async fn checkout_switches_content_and_emits_event() {
    let ws = TestWorkspace::with_commit().await;
    ws.session.create_branch("feature", true).await;
    ws.commit_file("feature.txt", "f\n", "Feature work").await;

    let mut rx = ws.events.subscribe();
    ws.session.checkout_branch("main").await;
    assert_eq!(ws.store.current_branch(), "main");
    assert!(!ws.path().join("feature.txt").exists());
    assert_eq!(ws.store.snapshot().commit_log.len(), 1);

    let mut saw = false;
    while let Ok(event) = rx.try_recv() {
        if event == (GitEvent::BranchChanged { branch: "main".into() }) {
            saw = true;
        }
    }
    assert!(saw);
}

// =============================================================================
// Remotes
// =============================================================================

/// A workspace with one commit pushed to a bare `origin`.
async fn published() -> (TestWorkspace, std::path::PathBuf) {
    let ws = TestWorkspace::with_commit().await;
    let remote = bare_remote(ws.dir.path());
    ws.session
        .add_remote("origin", remote.to_str().unwrap())
        .await;
    ws.session.push_to_remote("origin").await.unwrap();
    (ws, remote)
}

/// A second workspace cloned from `remote`.
async fn cloned(remote: &std::path::Path) -> TestWorkspace {
    let ws = TestWorkspace::new().await;
    let fs = ws.session.get_handle().unwrap();
    ws.session
        .clone_repository(remote.to_str().unwrap(), &fs, "/", None)
        .await
        .unwrap();
    ws.session
        .initialize_for_workspace(Some(DirectoryHandle::grant(ws.path()).unwrap()))
        .await;
    ws
}

#[tokio::test]
async fn push_publishes_branch() {
    let (ws, remote) = published().await;
    let head = ws.store.snapshot().commit_log[0].oid.clone();
    assert_eq!(run_git(&remote, &["rev-parse", "main"]), head);

    ws.session.refresh_branches().await;
    let branches = ws.store.snapshot().branches;
    let origin_main = branches.iter().find(|b| b.name == "origin/main").unwrap();
    assert!(origin_main.is_remote);
    assert!(!origin_main.is_current_branch);
    assert_eq!(origin_main.last_commit_oid, head);
    assert!(branches.iter().any(|b| b.name == "main" && b.is_current_branch));
    assert_eq!(ws.store.snapshot().remotes[0].name, "origin");
}

#[tokio::test]
async fn clone_checks_out_default_branch() {
    let (_origin, remote) = published().await;
    let ws = cloned(&remote).await;

    assert!(ws.store.is_repo_initialized());
    assert_eq!(ws.read("README.md"), "# test\n");
    assert_eq!(ws.store.current_branch(), "main");
    assert_eq!(ws.store.snapshot().commit_log.len(), 1);
    let remotes = ws.session.list_remotes().await;
    assert_eq!(remotes[0].url, remote.to_str().unwrap());
}

#[tokio::test]
async fn pull_fast_forwards_and_refreshes_log() {
    let (origin, remote) = published().await;
    let ws = cloned(&remote).await;

    let oid = origin.commit_file("later.txt", "later\n", "Later").await;
    origin.session.push_to_remote("origin").await.unwrap();

    let mut rx = ws.events.subscribe();
    ws.session.pull_from_remote("origin").await.unwrap();
    assert_eq!(ws.read("later.txt"), "later\n");
    assert_eq!(ws.store.snapshot().commit_log[0].oid, oid);
    assert!(!ws.store.git_status().unwrap().is_dirty);

    let mut complete = None;
    while let Ok(event) = rx.try_recv() {
        if let GitEvent::OperationComplete { operation, oid } = event {
            complete = Some((operation, oid));
        }
    }
    assert_eq!(complete, Some((OperationKind::Pull, Some(oid))));
}

#[tokio::test]
async fn fetch_updates_remote_branches_only() {
    let (origin, remote) = published().await;
    let ws = cloned(&remote).await;
    let before = ws.store.snapshot().commit_log[0].oid.clone();

    let oid = origin.commit_file("later.txt", "later\n", "Later").await;
    origin.session.push_to_remote("origin").await.unwrap();

    ws.session.fetch_from_remote("origin").await;
    assert!(ws.error().is_none());
    let branches = ws.store.snapshot().branches;
    let origin_main = branches.iter().find(|b| b.name == "origin/main").unwrap();
    assert_eq!(origin_main.last_commit_oid, oid);
    assert_eq!(ws.store.snapshot().commit_log[0].oid, before);
    assert!(!ws.path().join("later.txt").exists());
}

#[tokio::test]
async fn fetch_lists_branches_created_after_clone() {
    let (origin, remote) = published().await;
    let ws = cloned(&remote).await;

    origin.session.create_branch("feature", true).await;
    assert_eq!(origin.store.current_branch(), "feature");
    let oid = origin.commit_file("feature.txt", "f\n", "Feature").await;
    origin.session.push_to_remote("origin").await.unwrap();

    ws.session.fetch_from_remote("origin").await;
    assert!(ws.error().is_none());
    let branches = ws.store.snapshot().branches;
    let feature = branches
        .iter()
        .find(|b| b.name == "origin/feature")
        .expect("new remote branch listed");
    assert!(feature.is_remote);
    assert_eq!(feature.last_commit_oid, oid);
    assert!(branches.iter().any(|b| b.name == "origin/main"));
    assert_eq!(ws.store.current_branch(), "main");
}

#[tokio::test]
async fn rejected_push_is_returned_and_recorded() {
    let (origin, remote) = published().await;
    let ws = cloned(&remote).await;

    origin.commit_file("a.txt", "a\n", "Origin side").await;
    origin.session.push_to_remote("origin").await.unwrap();
    ws.commit_file("b.txt", "b\n", "Clone side").await;

    let err = ws.session.push_to_remote("origin").await.unwrap_err();
    assert!(matches!(err, SessionError::Git(_)));
    assert!(ws.error().is_some());
    assert!(!ws.store.snapshot().operation.in_progress);
}

#[tokio::test]
async fn pull_without_repository_changes_nothing() {
    let ws = TestWorkspace::new().await;
    assert!(!ws.store.is_repo_initialized());
    let before = ws.store.snapshot();

    ws.session.pull_from_remote("origin").await.unwrap();
    let after = ws.store.snapshot();
    assert_eq!(after.git_status, before.git_status);
    assert_eq!(after.branches, before.branches);
    assert_eq!(after.commit_log, before.commit_log);
    assert!(after.operation.error.is_none());
}

// =============================================================================
// Auto-fetch
// =============================================================================

#[tokio::test]
async fn auto_fetch_restart_and_stop() {
    let ws = TestWorkspace::with_commit().await;
    ws.session.start_auto_fetch();
    ws.session.start_auto_fetch();
    assert!(ws.session.is_auto_fetch_running());

    ws.session.stop_auto_fetch();
    assert!(!ws.session.is_auto_fetch_running());
    ws.session.stop_auto_fetch();
}

#[tokio::test]
async fn auto_fetch_disabled_in_settings() {
    let ws = TestWorkspace::with_commit().await;
    let mut settings = ws.store.git_settings();
    settings.auto_fetch = false;
    ws.store.update_git_settings(settings);

    ws.session.start_auto_fetch();
    assert!(!ws.session.is_auto_fetch_running());
}
