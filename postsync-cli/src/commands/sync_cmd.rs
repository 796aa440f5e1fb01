//! Sync CLI commands for reconciling drafts with the remote repository.

use clap::{Args, Subcommand};
use postsync_core::{
    GatewayError, PullOutcome, PullReport, PushOutcome, PushReport, SyncError, SyncState,
};

use super::{error_hint, open_drafts, open_reconciler};
use crate::config::{Config, ConfigError};

/// Sync with the remote repository
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: SyncSubcommand,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Fetch remote posts; local edits are kept
    Pull,

    /// Send every unsynced draft to the remote
    Push,

    /// Show remote configuration and per-post sync state
    Status,
}

impl SyncCommand {
    pub async fn run(&self, config: &Config) -> Result<(), SyncCommandError> {
        match &self.command {
            SyncSubcommand::Pull => self.pull(config).await,
            SyncSubcommand::Push => self.push(config).await,
            SyncSubcommand::Status => self.status(config),
        }
    }

    async fn pull(&self, config: &Config) -> Result<(), SyncCommandError> {
        let reconciler = open_reconciler(config)?;

        println!("Pulling from {}...", describe_remote(config));
        println!();

        let report = reconciler.pull().await?;
        print_pull_report(&report);

        let failed = report.failures().count();
        if failed > 0 {
            return Err(SyncCommandError::Failures {
                failed,
                total: report.outcomes.len(),
            });
        }
        Ok(())
    }

    async fn push(&self, config: &Config) -> Result<(), SyncCommandError> {
        let reconciler = open_reconciler(config)?;

        println!("Pushing to {}...", describe_remote(config));
        println!();

        let report = reconciler.push().await?;
        print_push_report(&report);

        let failed = report.failures().count();
        if failed > 0 {
            return Err(SyncCommandError::Failures {
                failed,
                total: report.outcomes.len(),
            });
        }
        Ok(())
    }

    fn status(&self, config: &Config) -> Result<(), SyncCommandError> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        if config.remote.is_configured() {
            println!("Remote: {}", describe_remote(config));
        } else {
            println!("Remote: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  remote:");
            println!("    owner: \"your-name\"");
            println!("    repo: \"your-blog\"");
            println!("    token: \"...\"");
            println!();
            println!("Or set environment variables:");
            println!("  POSTSYNC_OWNER, POSTSYNC_REPO, POSTSYNC_TOKEN");
        }
        println!();

        let statuses = open_drafts(config)
            .status()
            .map_err(|e| SyncCommandError::Sync(e.into()))?;
        if statuses.is_empty() {
            println!("No drafts.");
            return Ok(());
        }

        let pending = statuses
            .iter()
            .filter(|s| s.state != SyncState::Synced)
            .count();
        for status in &statuses {
            match (&status.push_error, status.state) {
                (Some(err), _) => println!("  ✗ {} - {}", status.filename, err),
                (None, SyncState::Synced) => println!("  ✓ {}", status.filename),
                (None, state) => println!("  • {} ({})", status.filename, state),
            }
        }

        println!();
        if pending == 0 {
            println!("Everything is synced.");
        } else {
            println!(
                "{} post{} waiting to be pushed.",
                pending,
                if pending == 1 { "" } else { "s" }
            );
        }

        Ok(())
    }
}

fn describe_remote(config: &Config) -> String {
    let remote = &config.remote;
    let mut desc = format!(
        "{} {}/{}",
        remote.provider,
        remote.owner.as_deref().unwrap_or("?"),
        remote.repo.as_deref().unwrap_or("?")
    );
    if let Some(branch) = &remote.branch {
        desc.push_str(&format!("@{}", branch));
    }
    desc.push_str(&format!(" ({})", remote.content_dir()));
    desc
}

fn print_pull_report(report: &PullReport) {
    for (filename, outcome) in &report.outcomes {
        match outcome {
            PullOutcome::Inserted => println!("  ✓ {} (new)", filename),
            PullOutcome::Updated => println!("  ✓ {} (updated)", filename),
            PullOutcome::Unchanged => println!("  ✓ {} (up to date)", filename),
            PullOutcome::KeptLocal => println!("  • {} (local edits kept)", filename),
            PullOutcome::Failed(e) => print_failure(filename, e),
        }
    }
    for filename in &report.missing_remotely {
        println!("  ! {} - missing remotely, kept locally", filename);
    }

    println!();
    let changed = report.count(&PullOutcome::Inserted) + report.count(&PullOutcome::Updated);
    if changed == 0 && report.is_success() {
        println!("Already up to date.");
    } else {
        println!(
            "Pull complete: {} new, {} updated, {} kept local.",
            report.count(&PullOutcome::Inserted),
            report.count(&PullOutcome::Updated),
            report.count(&PullOutcome::KeptLocal)
        );
    }
}

fn print_push_report(report: &PushReport) {
    if report.outcomes.is_empty() {
        println!("Nothing to push.");
        return;
    }

    for (filename, outcome) in &report.outcomes {
        match outcome {
            PushOutcome::Pushed { revision_token } => {
                println!("  ✓ {} ({})", filename, short_token(revision_token))
            }
            PushOutcome::Failed(e) => print_failure(filename, e),
        }
    }

    println!();
    let pushed = report.pushed().count();
    println!(
        "Pushed {} of {} post{}.",
        pushed,
        report.outcomes.len(),
        if report.outcomes.len() == 1 { "" } else { "s" }
    );
}

fn print_failure(filename: &str, e: &GatewayError) {
    println!("  ✗ {} - {}", filename, e);
    if let Some(hint) = error_hint(e) {
        println!("    hint: {}", hint);
    }
}

fn short_token(token: &str) -> &str {
    token.get(..7).unwrap_or(token)
}

/// Errors from sync commands
#[derive(Debug)]
pub enum SyncCommandError {
    Config(ConfigError),
    Sync(SyncError),
    Failures { failed: usize, total: usize },
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::Config(e) => write!(f, "{}", e),
            SyncCommandError::Sync(SyncError::Gateway(e)) => match error_hint(e) {
                Some(hint) => write!(f, "{} ({})", e, hint),
                None => write!(f, "{}", e),
            },
            SyncCommandError::Sync(e) => write!(f, "{}", e),
            SyncCommandError::Failures { failed, total } => {
                write!(f, "{} of {} posts failed to sync", failed, total)
            }
        }
    }
}

impl std::error::Error for SyncCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncCommandError::Config(e) => Some(e),
            SyncCommandError::Sync(e) => Some(e),
            SyncCommandError::Failures { .. } => None,
        }
    }
}

impl From<ConfigError> for SyncCommandError {
    fn from(e: ConfigError) -> Self {
        SyncCommandError::Config(e)
    }
}

impl From<SyncError> for SyncCommandError {
    fn from(e: SyncError) -> Self {
        SyncCommandError::Sync(e)
    }
}
