use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported Git hosting providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Github,
    Gitea,
}

impl Provider {
    /// Public API endpoint, if the provider has one.
    pub fn default_api_url(&self) -> Option<&'static str> {
        match self {
            Provider::Github => Some("https://api.github.com"),
            Provider::Gitea => None,
        }
    }

    /// Normalizes a user-supplied URL into the API base.
    ///
    /// Gitea serves its API under `/api/v1`; a bare server URL gets that
    /// suffix appended.
    pub fn api_base(&self, url: &str) -> String {
        let url = url.trim_end_matches('/');
        match self {
            Provider::Github => url.to_string(),
            Provider::Gitea if url.ends_with("/api/v1") => url.to_string(),
            Provider::Gitea => format!("{}/api/v1", url),
        }
    }

    /// GitHub creates and updates with PUT; Gitea creates with POST.
    pub fn create_method(&self) -> reqwest::Method {
        match self {
            Provider::Github => reqwest::Method::PUT,
            Provider::Gitea => reqwest::Method::POST,
        }
    }

    pub fn accept_header(&self) -> &'static str {
        match self {
            Provider::Github => "application/vnd.github+json",
            Provider::Gitea => "application/json",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Github => write!(f, "github"),
            Provider::Gitea => write!(f, "gitea"),
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(Provider::Github),
            "gitea" => Ok(Provider::Gitea),
            other => Err(format!("Unknown provider '{}' (expected github or gitea)", other)),
        }
    }
}

/// Where posts live: repository coordinates plus the content directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub provider: Provider,
    /// API base URL, already normalized with [`Provider::api_base`].
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
    /// Directory holding the posts, relative to the repository root.
    pub content_dir: String,
}

impl RepoTarget {
    pub fn new(
        provider: Provider,
        api_url: &str,
        owner: impl Into<String>,
        repo: impl Into<String>,
        content_dir: &str,
    ) -> Self {
        Self {
            provider,
            api_url: provider.api_base(api_url),
            owner: owner.into(),
            repo: repo.into(),
            branch: None,
            content_dir: content_dir.trim_matches('/').to_string(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Repository-relative path of a post file.
    pub fn file_path(&self, filename: &str) -> String {
        if self.content_dir.is_empty() {
            filename.to_string()
        } else {
            format!("{}/{}", self.content_dir, filename)
        }
    }

    /// URL of the repository itself.
    pub fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_url,
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repo)
        )
    }

    /// URL of the contents endpoint for `path` (`""` for the repository root).
    pub fn contents_url(&self, path: &str) -> String {
        let mut url = format!("{}/contents", self.repo_url());
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }
}
