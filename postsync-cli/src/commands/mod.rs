mod config_cmd;
mod post;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use post::PostCommand;
pub use sync_cmd::SyncCommand;

use clap::ValueEnum;
use postsync_core::{DraftStore, FileKeyValueStore, GatewayError, Reconciler, RepoClient};

use crate::config::{Config, ConfigError};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Opens the draft store under the configured data directory.
pub fn open_drafts(config: &Config) -> DraftStore<FileKeyValueStore> {
    DraftStore::new(FileKeyValueStore::new(config.data_dir.value.clone()))
}

/// Builds a reconciler against the configured remote repository.
pub fn open_reconciler(
    config: &Config,
) -> Result<Reconciler<RepoClient, FileKeyValueStore>, ConfigError> {
    let (target, token) = config.remote.target()?;
    Ok(Reconciler::new(
        RepoClient::new(target, token),
        open_drafts(config),
    ))
}

/// Extra guidance printed next to errors the user can fix themselves.
pub fn error_hint(e: &GatewayError) -> Option<&'static str> {
    match e {
        GatewayError::Unauthorized(_) => {
            Some("check the access token (POSTSYNC_TOKEN or remote.token in the config file)")
        }
        GatewayError::Conflict(_) => Some("run 'postsync sync pull' and retry"),
        e if e.is_retryable() => Some("temporary failure, try again later"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_hint_for_retryable_errors() {
        let rate_limited = GatewayError::RateLimited {
            retry_after: Some(60),
        };
        let transient = GatewayError::Transient("connection reset".to_string());

        assert_eq!(
            error_hint(&rate_limited),
            Some("temporary failure, try again later")
        );
        assert_eq!(
            error_hint(&transient),
            Some("temporary failure, try again later")
        );
    }

    #[test]
    fn test_error_hint_for_other_errors() {
        assert!(error_hint(&GatewayError::Unauthorized("bad".to_string()))
            .unwrap()
            .contains("POSTSYNC_TOKEN"));
        assert!(error_hint(&GatewayError::Conflict("a.md".to_string()))
            .unwrap()
            .contains("sync pull"));
        assert_eq!(
            error_hint(&GatewayError::InvalidFilename("x".to_string())),
            None
        );
    }
}
