use std::sync::Arc;
use tracing::{info, warn};

use crate::github::{
    CommitAuthor, FileRequest, IssueRequest, PlatformError, ProtectionRequest, PullRequestReviews,
    RepositoryHost,
};
use crate::types::RepositoryBootstrapRequest;

pub const README_PATH: &str = "README.md";
pub const README_COMMIT_MESSAGE: &str = "Update README.md";
pub const ISSUE_TITLE: &str = "Update Security Rules in Default Branch";
pub const ISSUE_LABEL: &str = "Security";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    /// Nothing to do (README already present).
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub readme: StepOutcome,
    pub protection: StepOutcome,
    pub issue: StepOutcome,
}

/// Seeds a newly created repository: README, default-branch protection and a
/// tracking issue. Each step is best effort and runs even if an earlier one
/// failed. Nothing is retried.
pub struct Bootstrapper {
    host: Arc<dyn RepositoryHost>,
    default_branch: String,
    readme: String,
    force_readme: bool,
}

impl Bootstrapper {
    pub fn new(
        host: Arc<dyn RepositoryHost>,
        default_branch: impl Into<String>,
        readme: impl Into<String>,
    ) -> Self {
        Self {
            host,
            default_branch: default_branch.into(),
            readme: readme.into(),
            force_readme: false,
        }
    }

    /// Replace an existing README with the template instead of leaving it.
    pub fn with_force_readme(mut self, force: bool) -> Self {
        self.force_readme = force;
        self
    }

    pub async fn run(&self, request: &RepositoryBootstrapRequest) -> BootstrapReport {
        let repo = format!("{}/{}", request.organization_login, request.repository_name);
        info!(%repo, "bootstrapping new repository");

        BootstrapReport {
            readme: log_step(&repo, "readme", self.seed_readme(request).await),
            protection: log_step(&repo, "branch_protection", self.protect_branch(request).await),
            issue: log_step(&repo, "tracking_issue", self.open_issue(request).await),
        }
    }

    async fn seed_readme(
        &self,
        request: &RepositoryBootstrapRequest,
    ) -> Result<StepOutcome, PlatformError> {
        let org = &request.organization_login;
        let repo = &request.repository_name;
        let committer = CommitAuthor {
            name: request.owner_login.clone(),
            email: request.admin_email.clone(),
        };
        let mut file = FileRequest::new(
            README_COMMIT_MESSAGE,
            self.readme.as_bytes(),
            &self.default_branch,
            committer,
        );

        match self.host.get_readme(org, repo).await {
            Err(PlatformError::NotFound) => {}
            Err(e) => return Err(e),
            Ok(existing) if self.force_readme => file.sha = Some(existing.sha),
            Ok(_) => return Ok(StepOutcome::Skipped),
        }

        self.host.create_file(org, repo, README_PATH, &file).await?;
        Ok(StepOutcome::Applied)
    }

    async fn protect_branch(
        &self,
        request: &RepositoryBootstrapRequest,
    ) -> Result<StepOutcome, PlatformError> {
        self.host
            .update_branch_protection(
                &request.organization_login,
                &request.repository_name,
                &self.default_branch,
                &protection_policy(),
            )
            .await?;
        Ok(StepOutcome::Applied)
    }

    async fn open_issue(
        &self,
        request: &RepositoryBootstrapRequest,
    ) -> Result<StepOutcome, PlatformError> {
        let issue = self
            .host
            .create_issue(
                &request.organization_login,
                &request.repository_name,
                &tracking_issue(&request.assignee_login),
            )
            .await?;
        info!(number = issue.number, "tracking issue opened");
        Ok(StepOutcome::Applied)
    }
}

fn log_step(repo: &str, step: &str, result: Result<StepOutcome, PlatformError>) -> StepOutcome {
    match result {
        Ok(outcome) => {
            info!(%repo, step, outcome = ?outcome, "bootstrap step done");
            outcome
        }
        Err(e) => {
            warn!(%repo, step, error = %e, "bootstrap step failed");
            StepOutcome::Failed(e.to_string())
        }
    }
}

/// Admins included, code-owner review, stale approvals dismissed, one approval.
pub fn protection_policy() -> ProtectionRequest {
    ProtectionRequest {
        required_status_checks: None,
        enforce_admins: true,
        required_pull_request_reviews: Some(PullRequestReviews {
            dismiss_stale_reviews: true,
            require_code_owner_reviews: true,
            required_approving_review_count: 1,
        }),
        restrictions: None,
    }
}

pub fn tracking_issue(assignee: &str) -> IssueRequest {
    IssueRequest {
        title: ISSUE_TITLE.to_string(),
        body: format!(
            "@{assignee}<br>The following safety rules have been added :<br>\
             * Require a pull request before merging <br>\
             * Require approvals <br>\
             * Dismiss stale pull request approvals when new commits are pushed <br>\
             * Include administrators <br>"
        ),
        assignees: vec![assignee.to_string()],
        labels: vec![ISSUE_LABEL.to_string()],
    }
}
