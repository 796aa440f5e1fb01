//! HTTP client for the GitHub and Gitea contents APIs.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{
    delete_message, is_post_filename, update_message, validate_filename, ContentGateway,
    GatewayError, RemoteEntry, RemotePost, RepoTarget,
};
use crate::frontmatter;
use crate::models::FrontMatter;

const CLIENT_USER_AGENT: &str = concat!("postsync/", env!("CARGO_PKG_VERSION"));

/// Content gateway backed by a provider's REST contents API.
///
/// The bearer token is supplied by the caller and never read from the
/// environment.
#[derive(Clone)]
pub struct RepoClient {
    http: reqwest::Client,
    target: RepoTarget,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    sha: String,
    #[serde(default)]
    size: u64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct FileContent {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    message: String,
    sha: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenContent,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Whether a request reads or writes; 422 means a conflict only for writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

impl RepoClient {
    pub fn new(target: RepoTarget, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            target,
            token: token.into(),
        }
    }

    pub fn target(&self) -> &RepoTarget {
        &self.target
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, self.target.provider.accept_header())
            .header(USER_AGENT, CLIENT_USER_AGENT)
    }

    fn with_ref(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.target.branch {
            Some(branch) => builder.query(&[("ref", branch)]),
            None => builder,
        }
    }

    /// Fails with `NotFound` when the repository is missing or hidden.
    async fn check_repository(&self) -> Result<(), GatewayError> {
        let builder = self.request(Method::GET, &self.target.repo_url());
        let repo = format!("{}/{}", self.target.owner, self.target.repo);

        match self.send(builder, Access::Read, &repo).await {
            Ok(_) => Ok(()),
            Err(GatewayError::NotFound(_)) => Err(GatewayError::NotFound(format!(
                "repository {} (missing, or not visible with this token)",
                repo
            ))),
            Err(e) => Err(e),
        }
    }

    async fn send(
        &self,
        builder: RequestBuilder,
        access: Access,
        subject: &str,
    ) -> Result<Response, GatewayError> {
        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!("{} -> {}", response.url(), status);

        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, &headers, &body, access, subject))
    }
}

impl ContentGateway for RepoClient {
    async fn list_posts(&self) -> Result<Vec<RemoteEntry>, GatewayError> {
        let url = self.target.contents_url(&self.target.content_dir);
        let builder = self.with_ref(self.request(Method::GET, &url));

        let response = match self
            .send(builder, Access::Read, &self.target.content_dir)
            .await
        {
            Ok(response) => response,
            // The directory appears with the first committed post, but hosts
            // also answer 404 for repositories the token cannot see.
            Err(GatewayError::NotFound(_)) => {
                self.check_repository().await?;
                tracing::warn!(
                    "Content directory '{}' not found in {}/{}, treating as empty",
                    self.target.content_dir,
                    self.target.owner,
                    self.target.repo
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let entries: Vec<ContentEntry> = response.json().await?;
        let posts: Vec<RemoteEntry> = entries
            .into_iter()
            .filter(|entry| entry.kind == "file" && is_post_filename(&entry.name))
            .map(|entry| RemoteEntry {
                filename: entry.name,
                path: entry.path,
                revision_token: entry.sha,
                size: entry.size,
            })
            .collect();

        tracing::debug!("Listed {} remote post(s)", posts.len());
        Ok(posts)
    }

    async fn get_post(&self, filename: &str) -> Result<RemotePost, GatewayError> {
        validate_filename(filename)?;

        let url = self.target.contents_url(&self.target.file_path(filename));
        let builder = self.with_ref(self.request(Method::GET, &url));
        let file: FileContent = self
            .send(builder, Access::Read, filename)
            .await?
            .json()
            .await?;

        let raw = decode_content(&file)?;
        let (front_matter, content) = frontmatter::decode(&raw);

        Ok(RemotePost {
            filename: filename.to_string(),
            content,
            front_matter,
            revision_token: file.sha,
        })
    }

    async fn upsert_post(
        &self,
        filename: &str,
        content: &str,
        front_matter: &FrontMatter,
        revision_token: Option<&str>,
    ) -> Result<String, GatewayError> {
        validate_filename(filename)?;

        let method = match revision_token {
            Some(_) => Method::PUT,
            None => self.target.provider.create_method(),
        };
        let body = WriteRequest {
            message: update_message(filename),
            content: BASE64.encode(frontmatter::encode(front_matter, content)),
            sha: revision_token,
            branch: self.target.branch.as_deref(),
        };

        let url = self.target.contents_url(&self.target.file_path(filename));
        let builder = self.request(method, &url).json(&body);
        let written: WriteResponse = self
            .send(builder, Access::Write, filename)
            .await?
            .json()
            .await?;

        tracing::debug!("Wrote {} at {}", filename, written.content.sha);
        Ok(written.content.sha)
    }

    async fn delete_post(
        &self,
        filename: &str,
        revision_token: &str,
    ) -> Result<(), GatewayError> {
        validate_filename(filename)?;

        let body = DeleteRequest {
            message: delete_message(filename),
            sha: revision_token,
            branch: self.target.branch.as_deref(),
        };

        let url = self.target.contents_url(&self.target.file_path(filename));
        let builder = self.request(Method::DELETE, &url).json(&body);
        self.send(builder, Access::Write, filename).await?;

        tracing::debug!("Deleted {}", filename);
        Ok(())
    }
}

fn decode_content(file: &FileContent) -> Result<String, GatewayError> {
    let encoding = file.encoding.as_deref().unwrap_or("base64");
    if encoding != "base64" {
        return Err(GatewayError::InvalidResponse(format!(
            "unsupported content encoding '{}'",
            encoding
        )));
    }

    // Providers wrap base64 payloads at 60-76 columns.
    let packed: String = file
        .content
        .as_deref()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = BASE64
        .decode(packed)
        .map_err(|e| GatewayError::InvalidResponse(format!("invalid base64 content: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| GatewayError::InvalidResponse(format!("content is not UTF-8: {}", e)))
}

fn map_status(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    access: Access,
    subject: &str,
) -> GatewayError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string());
    let detail = if message.is_empty() {
        subject.to_string()
    } else {
        format!("{}: {}", subject, message)
    };

    match status.as_u16() {
        401 => GatewayError::Unauthorized(detail),
        403 if header_value(headers, "x-ratelimit-remaining").as_deref() == Some("0") => {
            GatewayError::RateLimited {
                retry_after: retry_after(headers),
            }
        }
        403 => GatewayError::Unauthorized(detail),
        404 => GatewayError::NotFound(detail),
        409 => GatewayError::Conflict(detail),
        422 if access == Access::Write => GatewayError::Conflict(detail),
        429 => GatewayError::RateLimited {
            retry_after: retry_after(headers),
        },
        code if status.is_server_error() => {
            GatewayError::Transient(format!("server error {}: {}", code, detail))
        }
        code => GatewayError::Rejected {
            status: code,
            message: detail,
        },
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

/// Seconds to wait, from `retry-after` or the `x-ratelimit-reset` epoch.
fn retry_after(headers: &HeaderMap) -> Option<u64> {
    if let Some(secs) = header_value(headers, "retry-after").and_then(|v| v.parse().ok()) {
        return Some(secs);
    }

    let reset: i64 = header_value(headers, "x-ratelimit-reset")?.parse().ok()?;
    let now = chrono::Utc::now().timestamp();
    Some(reset.saturating_sub(now).max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Provider;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REPO_PATH: &str = "/repos/me/blog";
    const DIR_PATH: &str = "/repos/me/blog/contents/posts";
    const FILE_PATH: &str = "/repos/me/blog/contents/posts/a.md";

    fn github_client(server: &MockServer) -> RepoClient {
        let target = RepoTarget::new(Provider::Github, &server.uri(), "me", "blog", "posts");
        RepoClient::new(target, "secret-token")
    }

    fn gitea_client(server: &MockServer) -> RepoClient {
        let target = RepoTarget::new(Provider::Gitea, &server.uri(), "me", "blog", "posts");
        RepoClient::new(target, "secret-token")
    }

    const GITEA_FILE_PATH: &str = "/api/v1/repos/me/blog/contents/posts/a.md";

    #[tokio::test]
    async fn test_list_posts_filters_non_markdown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DIR_PATH))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "a.md", "path": "posts/a.md", "sha": "s1", "size": 10, "type": "file"},
                {"name": "b.mdx", "path": "posts/b.mdx", "sha": "s2", "size": 20, "type": "file"},
                {"name": "cover.png", "path": "posts/cover.png", "sha": "s3", "size": 30, "type": "file"},
                {"name": "drafts.md", "path": "posts/drafts.md", "sha": "s4", "size": 0, "type": "dir"}
            ])))
            .mount(&server)
            .await;

        let posts = github_client(&server).list_posts().await.unwrap();

        assert_eq!(
            posts,
            vec![
                RemoteEntry {
                    filename: "a.md".to_string(),
                    path: "posts/a.md".to_string(),
                    revision_token: "s1".to_string(),
                    size: 10,
                },
                RemoteEntry {
                    filename: "b.mdx".to_string(),
                    path: "posts/b.mdx".to_string(),
                    revision_token: "s2".to_string(),
                    size: 20,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_list_posts_missing_directory_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DIR_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(REPO_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"full_name": "me/blog"})))
            .expect(1)
            .mount(&server)
            .await;

        let posts = github_client(&server).list_posts().await.unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_list_posts_missing_repository_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DIR_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(REPO_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let err = github_client(&server).list_posts().await.unwrap_err();

        match err {
            GatewayError::NotFound(message) => assert!(message.contains("repository me/blog")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_posts_sends_branch_ref() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DIR_PATH))
            .and(query_param("ref", "drafts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let target = RepoTarget::new(Provider::Github, &server.uri(), "me", "blog", "posts")
            .with_branch("drafts");
        let posts = RepoClient::new(target, "t").list_posts().await.unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_get_post_decodes_wrapped_base64_and_front_matter() {
        let server = MockServer::start().await;
        let raw = "---\ntitle: \"Hi\"\ntags: [\"x\", \"y\"]\n---\nBody text";
        let encoded = BASE64.encode(raw);
        let (head, tail) = encoded.split_at(20);
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "a.md",
                "sha": "abc123",
                "encoding": "base64",
                "content": format!("{}\n{}\n", head, tail)
            })))
            .mount(&server)
            .await;

        let post = github_client(&server).get_post("a.md").await.unwrap();

        assert_eq!(post.revision_token, "abc123");
        assert_eq!(post.content, "Body text");
        assert_eq!(post.front_matter.title(), Some("Hi"));
        assert_eq!(
            post.front_matter.get("tags").and_then(|v| v.as_list()),
            Some(&["x".to_string(), "y".to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_get_post_invalid_base64() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "abc", "encoding": "base64", "content": "!!!not base64!!!"
            })))
            .mount(&server)
            .await;

        let err = github_client(&server).get_post("a.md").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_get_post_rejects_bad_filename_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = github_client(&server).get_post("../secrets.md").await.unwrap_err();
        assert_eq!(err, GatewayError::InvalidFilename("../secrets.md".to_string()));
    }

    #[tokio::test]
    async fn test_upsert_create_omits_sha() {
        let server = MockServer::start().await;
        let front_matter = FrontMatter::new().with("title", "A");
        let expected = BASE64.encode("---\ntitle: \"A\"\n---\nHello");
        Mock::given(method("PUT"))
            .and(path(FILE_PATH))
            .and(body_partial_json(json!({
                "message": "Update post: a.md",
                "content": expected
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"content": {"sha": "abc123"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = github_client(&server)
            .upsert_post("a.md", "Hello", &front_matter, None)
            .await
            .unwrap();

        assert_eq!(token, "abc123");
        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("sha").is_none());
    }

    #[tokio::test]
    async fn test_upsert_update_sends_sha() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(FILE_PATH))
            .and(body_partial_json(json!({"sha": "old", "message": "Update post: a.md"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"content": {"sha": "new"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = github_client(&server)
            .upsert_post("a.md", "Hello", &FrontMatter::new(), Some("old"))
            .await
            .unwrap();
        assert_eq!(token, "new");
    }

    #[tokio::test]
    async fn test_upsert_stale_token_is_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(FILE_PATH))
            .respond_with(ResponseTemplate::new(409).set_body_json(
                json!({"message": "a.md does not match 0123456789abcdef"}),
            ))
            .mount(&server)
            .await;

        let err = github_client(&server)
            .upsert_post("a.md", "Hello", &FrontMatter::new(), Some("stale"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Conflict(msg) if msg.contains("does not match")));
    }

    #[tokio::test]
    async fn test_create_over_existing_file_is_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(FILE_PATH))
            .respond_with(ResponseTemplate::new(422).set_body_json(
                json!({"message": "Invalid request.\n\n\"sha\" wasn't supplied."}),
            ))
            .mount(&server)
            .await;

        let err = github_client(&server)
            .upsert_post("a.md", "Hello", &FrontMatter::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_gitea_create_uses_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GITEA_FILE_PATH))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"content": {"sha": "g1"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = gitea_client(&server)
            .upsert_post("a.md", "Hello", &FrontMatter::new(), None)
            .await
            .unwrap();
        assert_eq!(token, "g1");
    }

    #[tokio::test]
    async fn test_gitea_update_uses_put() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(GITEA_FILE_PATH))
            .and(header("accept", "application/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"content": {"sha": "g2"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = gitea_client(&server)
            .upsert_post("a.md", "Hello", &FrontMatter::new(), Some("g1"))
            .await
            .unwrap();
        assert_eq!(token, "g2");
    }

    #[tokio::test]
    async fn test_delete_sends_message_and_sha() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(FILE_PATH))
            .and(body_partial_json(json!({"message": "Delete post: a.md", "sha": "abc"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"commit": {}})))
            .expect(1)
            .mount(&server)
            .await;

        github_client(&server).delete_post("a.md", "abc").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(FILE_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let err = github_client(&server)
            .delete_post("a.md", "abc")
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::NotFound("a.md: Not Found".to_string()));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
            )
            .mount(&server)
            .await;

        let err = github_client(&server).get_post("a.md").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_rate_limited_403_with_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("retry-after", "60")
                    .set_body_json(json!({"message": "API rate limit exceeded"})),
            )
            .mount(&server)
            .await;

        let err = github_client(&server).get_post("a.md").await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::RateLimited {
                retry_after: Some(60)
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_rate_limited_429() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DIR_PATH))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = github_client(&server).list_posts().await.unwrap_err();
        assert_eq!(err, GatewayError::RateLimited { retry_after: None });
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DIR_PATH))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = github_client(&server).list_posts().await.unwrap_err();
        assert!(matches!(err, GatewayError::Transient(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        let target = RepoTarget::new(Provider::Github, "http://127.0.0.1:9", "me", "blog", "posts");
        let err = RepoClient::new(target, "t").list_posts().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
