//! session::log
//!
//! History, committed file contents and the staged-change summary.

use super::GitSession;

impl GitSession {
    /// Publish up to `limit` commits from HEAD.
    ///
    /// A failed walk publishes an empty log rather than keeping stale entries.
    pub async fn fetch_commit_log(&self, limit: usize) {
        let Some(ws) = self.workspace() else {
            return;
        };
        let commits = match self.run_blocking(&ws, move |git| git.log(limit)).await {
            Ok(commits) => commits,
            Err(e) => {
                tracing::debug!(error = %e, "commit log unavailable");
                Vec::new()
            }
        };
        self.state.set_commit_log(commits);
    }

    /// Content of `path` as committed at HEAD.
    pub async fn get_file_at_head(&self, path: &str) -> Option<String> {
        let ws = self.workspace()?;
        let path = path.to_string();
        self.run_blocking(&ws, move |git| git.read_blob_at_head(&path))
            .await
            .ok()
    }

    /// One line per staged file, with line deltas for modified files open
    /// in an editor buffer.
    ///
    /// ```text
    /// modified: src/lib.rs
    ///   (+3 lines)
    /// added: notes.md
    /// ```
    pub async fn get_staged_diff(&self) -> String {
        let Some(status) = self.state.git_status() else {
            return String::new();
        };
        if status.staged_files.is_empty() {
            return String::new();
        }

        let buffers = self.state.open_buffers();
        let mut lines = Vec::new();
        for file in &status.staged_files {
            lines.push(format!("{}: {}", file.status, file.path));
            if file.status != crate::core::types::FileChange::Modified {
                continue;
            }

            let Some(head) = self.get_file_at_head(&file.path).await else {
                continue;
            };
            let buffer = buffers.iter().find(|b| {
                b.path
                    .as_deref()
                    .is_some_and(|p| p.ends_with(file.path.as_str()))
            });
            let Some(buffer) = buffer else {
                continue;
            };

            let delta = line_count(&buffer.content) as i64 - line_count(&head) as i64;
            match delta {
                0 => {}
                d if d > 0 => lines.push(format!("  (+{d} lines)")),
                d => lines.push(format!("  ({d} lines)")),
            }
        }
        lines.join("\n")
    }
}

fn line_count(text: &str) -> usize {
    text.split('\n').count()
}
