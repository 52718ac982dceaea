use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("not found")]
    NotFound,

    #[error("GitHub API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid access token")]
    InvalidToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Readme {
    pub path: String,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRequest {
    pub message: String,
    /// Base64 of the file contents.
    pub content: String,
    pub branch: String,
    pub committer: CommitAuthor,
    /// Blob SHA of the file being replaced; absent when creating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl FileRequest {
    pub fn new(message: &str, content: &[u8], branch: &str, committer: CommitAuthor) -> Self {
        Self {
            message: message.to_string(),
            content: base64::engine::general_purpose::STANDARD.encode(content),
            branch: branch.to_string(),
            committer,
            sha: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestReviews {
    pub dismiss_stale_reviews: bool,
    pub require_code_owner_reviews: bool,
    pub required_approving_review_count: u32,
}

/// Body of `PUT /repos/{owner}/{repo}/branches/{branch}/protection`.
/// GitHub requires the nullable keys to be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectionRequest {
    pub required_status_checks: Option<serde_json::Value>,
    pub enforce_admins: bool,
    pub required_pull_request_reviews: Option<PullRequestReviews>,
    pub restrictions: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueRequest {
    pub title: String,
    pub body: String,
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
}

/// The GitHub operations repository bootstrap needs.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    async fn get_readme(&self, owner: &str, repo: &str) -> Result<Readme, PlatformError>;

    async fn create_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        request: &FileRequest,
    ) -> Result<(), PlatformError>;

    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &ProtectionRequest,
    ) -> Result<(), PlatformError>;

    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        request: &IssueRequest,
    ) -> Result<Issue, PlatformError>;
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, PlatformError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("orgwatch/", env!("CARGO_PKG_VERSION"))),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| PlatformError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(PlatformError::NotFound);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PlatformError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    async fn get_readme(&self, owner: &str, repo: &str) -> Result<Readme, PlatformError> {
        let url = self.url(&format!("/repos/{owner}/{repo}/readme"));
        debug!(%url, "fetching README");
        let response = Self::check(self.client.get(&url).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn create_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        request: &FileRequest,
    ) -> Result<(), PlatformError> {
        let url = self.url(&format!("/repos/{owner}/{repo}/contents/{path}"));
        Self::check(self.client.put(&url).json(request).send().await?).await?;
        Ok(())
    }

    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &ProtectionRequest,
    ) -> Result<(), PlatformError> {
        let url = self.url(&format!("/repos/{owner}/{repo}/branches/{branch}/protection"));
        Self::check(self.client.put(&url).json(request).send().await?).await?;
        Ok(())
    }

    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        request: &IssueRequest,
    ) -> Result<Issue, PlatformError> {
        let url = self.url(&format!("/repos/{owner}/{repo}/issues"));
        let response = Self::check(self.client.post(&url).json(request).send().await?).await?;
        Ok(response.json().await?)
    }
}
