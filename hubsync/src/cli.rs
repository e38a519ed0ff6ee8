use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use hubsync_core::{
    ContentsClient, Credentials, EntryKind, RemoteEntry, RepositoryRef, is_allowed_branch,
};
use tracing::warn;

use crate::config::Config;
use crate::sync::batch::{BatchMode, BatchObserver, BatchOrchestrator, BatchReport};
use crate::sync::outcome::{OutcomeStatus, TransferOutcome};
use crate::sync::paths::normalize_paths;

#[derive(Debug, Parser)]
#[command(
    name = "hubsync",
    version,
    about = "Upload and download single files through a repository contents API"
)]
pub struct Cli {
    /// Account used for basic auth; also the default repository owner.
    #[arg(long, env = "HUBSYNC_USER")]
    pub user: String,
    /// Personal access token.
    #[arg(long, env = "HUBSYNC_TOKEN", hide_env_values = true)]
    pub token: String,
    /// API base URL, e.g. https://git.example.com/api/v3.
    #[arg(long)]
    pub api_url: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RepoArgs {
    #[arg(long)]
    pub repo: String,
    /// Defaults to --user.
    #[arg(long)]
    pub owner: Option<String>,
    /// main or master; anything else uses the configured default branch.
    #[arg(long, default_value = "")]
    pub branch: String,
}

impl RepoArgs {
    pub fn resolve(&self, user: &str, config: &Config) -> RepositoryRef {
        let requested = self.branch.trim();
        if !requested.is_empty() && !is_allowed_branch(requested) {
            warn!(
                branch = requested,
                default = %config.default_branch,
                "unsupported branch, using default"
            );
        }
        RepositoryRef::new(
            self.owner.as_deref().unwrap_or(user).trim(),
            self.repo.trim(),
            requested,
            &config.default_branch,
        )
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create or update remote files from local ones.
    Upload {
        #[command(flatten)]
        target: RepoArgs,
        /// Commit message; "Update file" when empty.
        #[arg(short, long, default_value = "")]
        message: String,
        /// Files to upload, separated by spaces or commas.
        #[arg(required = true, num_args = 1..)]
        paths: Vec<String>,
    },
    /// Fetch remote files without overwriting anything local.
    Download {
        #[command(flatten)]
        target: RepoArgs,
        #[arg(long, default_value = ".")]
        dest: PathBuf,
        /// Files to download, separated by spaces or commas.
        #[arg(required = true, num_args = 1..)]
        paths: Vec<String>,
    },
    /// Show one level of a repository directory.
    List {
        #[command(flatten)]
        target: RepoArgs,
        #[arg(default_value = "")]
        dir: String,
    },
    /// Show the repositories of an account.
    Repos {
        #[arg(long)]
        owner: Option<String>,
    },
}

/// Runs one command. Returns `false` when any transfer item failed.
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<bool> {
    let api_url = cli.api_url.as_deref().unwrap_or(&config.api_url);
    let client = ContentsClient::with_options(
        api_url,
        Credentials::new(cli.user.trim(), cli.token.trim()),
        Some(config.timeout),
    )
    .context("failed to build API client")?;

    match cli.command {
        Command::Upload {
            target,
            message,
            paths,
        } => {
            let repo = target.resolve(&cli.user, &config);
            let paths = normalize_paths(&paths.join(","));
            let report = BatchOrchestrator::new(&client)
                .run_with_observer(
                    &repo,
                    &paths,
                    &BatchMode::Upload { message },
                    &mut ConsoleObserver,
                )
                .await;
            Ok(finish(&report))
        }
        Command::Download {
            target,
            dest,
            paths,
        } => {
            let repo = target.resolve(&cli.user, &config);
            let paths = normalize_paths(&paths.join(","));
            let report = BatchOrchestrator::new(&client)
                .with_local_root(dest)
                .run_with_observer(&repo, &paths, &BatchMode::Download, &mut ConsoleObserver)
                .await;
            Ok(finish(&report))
        }
        Command::List { target, dir } => {
            let repo = target.resolve(&cli.user, &config);
            let entries = client
                .list_directory(&repo, dir.trim_matches('/'))
                .await
                .with_context(|| format!("failed to list {repo}"))?;
            for entry in &entries {
                println!("{}", describe_entry(entry));
            }
            Ok(true)
        }
        Command::Repos { owner } => {
            let owner = owner.as_deref().unwrap_or(&cli.user);
            let names = client
                .list_repositories(owner)
                .await
                .with_context(|| format!("failed to list repositories of {owner}"))?;
            for (index, name) in names.iter().enumerate() {
                println!("{}) {}", index + 1, name);
            }
            Ok(true)
        }
    }
}

struct ConsoleObserver;

impl BatchObserver for ConsoleObserver {
    fn item_finished(&mut self, outcome: &TransferOutcome) {
        println!("{}", describe_outcome(outcome));
    }
}

fn finish(report: &BatchReport) -> bool {
    println!("{}", summary(report));
    report.all_succeeded()
}

pub fn describe_outcome(outcome: &TransferOutcome) -> String {
    match &outcome.status {
        OutcomeStatus::Uploaded { revision } => {
            format!("uploaded {} ({revision})", outcome.path)
        }
        OutcomeStatus::Downloaded { destination } => {
            format!("downloaded {} -> {}", outcome.path, destination.display())
        }
        OutcomeStatus::Failed { error, .. } => format!("failed {}: {error}", outcome.path),
    }
}

pub fn summary(report: &BatchReport) -> String {
    format!("{} succeeded, {} failed", report.succeeded(), report.failed())
}

fn describe_entry(entry: &RemoteEntry) -> String {
    match entry.kind {
        EntryKind::File => format!("file  {}", entry.path),
        EntryKind::Dir => format!("dir   {}/", entry.path),
        EntryKind::Other => format!("other {}", entry.path),
    }
}
