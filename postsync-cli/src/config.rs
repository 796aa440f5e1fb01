use postsync_core::{Provider, RepoTarget};
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;

/// Default directory of posts inside the site repository.
pub const DEFAULT_CONTENT_DIR: &str = "src/content/blog";

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Remote repository configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RemoteConfig {
    /// Hosting provider: github (default) or gitea
    pub provider: Provider,
    /// API base URL; required for gitea, defaults to api.github.com
    pub api_url: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    /// Branch to read and commit to (provider default branch if unset)
    pub branch: Option<String>,
    /// Directory holding posts (default: src/content/blog)
    pub content_dir: Option<String>,
    /// Access token used as a bearer credential
    #[serde(serialize_with = "mask_token")]
    pub token: Option<String>,
}

impl RemoteConfig {
    /// Returns true if everything needed to reach the repository is set
    pub fn is_configured(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn content_dir(&self) -> &str {
        self.content_dir.as_deref().unwrap_or(DEFAULT_CONTENT_DIR)
    }

    pub fn api_url(&self) -> Option<&str> {
        self.api_url
            .as_deref()
            .or_else(|| self.provider.default_api_url())
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_url().is_none() {
            missing.push("api_url");
        }
        if self.owner.is_none() {
            missing.push("owner");
        }
        if self.repo.is_none() {
            missing.push("repo");
        }
        if self.token.is_none() {
            missing.push("token");
        }
        missing
    }

    /// Builds the repository target and returns it with the access token.
    pub fn target(&self) -> Result<(RepoTarget, String), ConfigError> {
        let missing = self.missing_fields();
        let (Some(api_url), Some(owner), Some(repo), Some(token)) =
            (self.api_url(), &self.owner, &self.repo, &self.token)
        else {
            return Err(ConfigError::RemoteNotConfigured(missing));
        };

        let mut target = RepoTarget::new(self.provider, api_url, owner, repo, self.content_dir());
        if let Some(branch) = &self.branch {
            target = target.with_branch(branch);
        }

        Ok((target, token.clone()))
    }
}

fn mask_token<S: Serializer>(token: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match token {
        Some(t) => serializer.serialize_some(&mask(t)),
        None => serializer.serialize_none(),
    }
}

/// Shows only the first four characters of a secret. Short secrets are
/// hidden entirely.
pub fn mask(secret: &str) -> String {
    if secret.chars().count() <= 4 {
        return "****".to_string();
    }
    let prefix: String = secret.chars().take(4).collect();
    format!("{}…", prefix)
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the local draft store
    pub data_dir: ConfigValue<PathBuf>,
    /// Default author for new posts
    pub author: ConfigValue<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Remote repository configuration
    pub remote: RemoteConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    author: Option<String>,
    remote: Option<RemoteConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut author = ConfigValue::new("default".to_string(), ConfigSource::Default);
        let mut config_file = None;
        let mut remote = RemoteConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(name) = file_config.author {
                author = ConfigValue::new(name, ConfigSource::File);
            }
            if let Some(remote_config) = file_config.remote {
                remote = remote_config;
            }
        }

        // Apply environment variable overrides
        if let Ok(dir) = std::env::var("POSTSYNC_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(name) = std::env::var("POSTSYNC_AUTHOR") {
            author = ConfigValue::new(name, ConfigSource::Environment);
        }
        if let Ok(provider) = std::env::var("POSTSYNC_PROVIDER") {
            remote.provider = provider
                .parse()
                .map_err(|e| ConfigError::InvalidEnv("POSTSYNC_PROVIDER", e))?;
        }
        for (var, field) in [
            ("POSTSYNC_API_URL", &mut remote.api_url),
            ("POSTSYNC_OWNER", &mut remote.owner),
            ("POSTSYNC_REPO", &mut remote.repo),
            ("POSTSYNC_BRANCH", &mut remote.branch),
            ("POSTSYNC_CONTENT_DIR", &mut remote.content_dir),
            ("POSTSYNC_TOKEN", &mut remote.token),
        ] {
            if let Ok(value) = std::env::var(var) {
                *field = Some(value);
            }
        }

        Ok(Self {
            data_dir,
            author,
            config_file,
            remote,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/postsync/
    /// - macOS: ~/Library/Application Support/postsync/
    /// - Windows: %APPDATA%/postsync/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("postsync")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/postsync/
    /// - macOS: ~/Library/Application Support/postsync/
    /// - Windows: %APPDATA%/postsync/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("postsync")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
    RemoteNotConfigured(Vec<&'static str>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEnv(var, e) => write!(f, "Invalid {}: {}", var, e),
            ConfigError::RemoteNotConfigured(missing) => write!(
                f,
                "Remote not configured. Missing remote.{} (see 'postsync config show').",
                missing.join(", remote.")
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
