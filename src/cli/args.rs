//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--workspace <path>`: Operate on this directory instead of the cwd
//! - `--backend <kind>`: Filesystem backend serving the workspace
//! - `--verbose` / `-v`: Enable debug logging

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// egit - drive the editor git core from a terminal
#[derive(Parser, Debug)]
#[command(name = "egit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Workspace directory (defaults to the current directory)
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Filesystem backend serving the workspace
    #[arg(long, global = true, value_enum, default_value_t = BackendArg::Directory)]
    pub backend: BackendArg,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// How the workspace is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Host performs git work itself; every command is a no-op
    Native,
    /// Granted directory capability over the workspace
    Directory,
    /// Private store keyed by the workspace path
    Virtual,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    // ========== Read-Only Commands ==========
    /// Show staged, unstaged and untracked files
    Status,

    /// List local and remote branches
    Branches,

    /// Show recent commits
    Log {
        /// Maximum number of commits
        #[arg(short = 'n', long, default_value_t = 50)]
        limit: usize,
    },

    /// Summarize staged changes
    #[command(name = "diff-summary")]
    DiffSummary,

    /// Print a file as committed at HEAD
    Show {
        /// Repository-relative path
        path: String,
    },

    // ========== Index Commands ==========
    /// Stage a file
    Stage {
        /// Repository-relative path
        path: String,
    },

    /// Stage every unstaged and untracked file
    #[command(name = "stage-all")]
    StageAll,

    /// Unstage a file, keeping working tree changes
    Unstage {
        /// Repository-relative path
        path: String,
    },

    /// Throw away staged and unstaged changes to a file
    Discard {
        /// Repository-relative path
        path: String,
    },

    /// Commit staged changes
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    // ========== Branch Commands ==========
    /// Switch branches
    Checkout {
        /// Branch to check out
        name: String,
    },

    /// Create a branch at HEAD and switch to it
    Branch {
        /// Name of the new branch
        name: String,

        /// Create without switching
        #[arg(long)]
        no_checkout: bool,
    },

    /// Delete a local branch
    #[command(name = "delete-branch")]
    DeleteBranch {
        /// Branch to delete
        name: String,
    },

    // ========== Remote Commands ==========
    /// Manage remotes
    Remote {
        #[command(subcommand)]
        action: RemoteAction,
    },

    /// Fetch the current branch
    Fetch {
        /// Remote name
        #[arg(default_value = "origin")]
        remote: String,
    },

    /// Push the current branch
    Push {
        /// Remote name
        #[arg(default_value = "origin")]
        remote: String,
    },

    /// Fetch and integrate the current branch
    Pull {
        /// Remote name
        #[arg(default_value = "origin")]
        remote: String,
    },

    // ========== Repository Commands ==========
    /// Create a repository in the workspace
    Init,

    /// Clone a repository into a directory of the workspace
    Clone {
        /// Remote URL
        url: String,

        /// Target directory, relative to the workspace
        dir: String,
    },

    /// Fetch in the background until interrupted
    Watch,
}

/// Remote subcommands.
#[derive(Subcommand, Debug)]
pub enum RemoteAction {
    /// Add a remote
    Add {
        /// Remote name
        name: String,
        /// Remote URL
        url: String,
    },
    /// List configured remotes
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["egit", "pull"]).unwrap();
        assert_eq!(cli.backend, BackendArg::Directory);
        assert!(matches!(cli.command, Command::Pull { remote } if remote == "origin"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["egit", "log", "-n", "5", "--backend", "virtual", "-v"]).unwrap();
        assert_eq!(cli.backend, BackendArg::Virtual);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Log { limit: 5 }));
    }

    #[test]
    fn branch_no_checkout() {
        let cli = Cli::try_parse_from(["egit", "branch", "feature", "--no-checkout"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Branch { ref name, no_checkout: true } if name == "feature"
        ));
    }

    #[test]
    fn commit_requires_message() {
        assert!(Cli::try_parse_from(["egit", "commit"]).is_err());
    }
}
