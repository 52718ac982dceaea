use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base URL used to build actor profile links.
pub const GITHUB_PROFILE_BASE: &str = "https://github.com/";

/// One inbound webhook request, as received. Lives only for the request.
#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    pub event_type: String,
    /// `X-Hub-Signature-256` header value.
    pub signature_256: Option<String>,
    /// Legacy `X-Hub-Signature` (sha1) header value.
    pub signature_sha1: Option<String>,
    pub delivery_id: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Added,
    Removed,
    Modified,
    Created,
    /// Any other repository action label (`deleted`, `renamed`, ...).
    Other(String),
}

impl ActionKind {
    /// Map a repository event `action` label.
    pub fn from_repository_action(action: &str) -> Self {
        match action {
            "created" => ActionKind::Created,
            other => ActionKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Added => f.write_str("Added"),
            ActionKind::Removed => f.write_str("Removed"),
            ActionKind::Modified => f.write_str("Modified"),
            ActionKind::Created => f.write_str("created"),
            ActionKind::Other(label) => f.write_str(label),
        }
    }
}

/// Computed once per delivery; the only source for notification and audit text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSummary {
    pub kind: ActionKind,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub organization: String,
    pub actor_name: String,
    pub actor_profile_url: String,
    pub actor_avatar_url: String,
    pub organization_avatar_url: String,
    pub repository_full_name: String,
    pub summary: ActionSummary,
    pub timestamp: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn new(
        organization: impl Into<String>,
        actor_name: impl Into<String>,
        actor_avatar_url: impl Into<String>,
        organization_avatar_url: impl Into<String>,
        repository_full_name: impl Into<String>,
        summary: ActionSummary,
    ) -> Self {
        let actor_name = actor_name.into();
        Self {
            organization: organization.into(),
            actor_profile_url: format!("{GITHUB_PROFILE_BASE}{actor_name}"),
            actor_name,
            actor_avatar_url: actor_avatar_url.into(),
            organization_avatar_url: organization_avatar_url.into(),
            repository_full_name: repository_full_name.into(),
            summary,
            timestamp: Utc::now(),
        }
    }

    /// Human-readable alert line shared by chat and audit.
    pub fn message(&self) -> String {
        format!(
            "Alert : {} Repository : {} {}",
            self.summary.kind, self.repository_full_name, self.summary.detail
        )
    }
}

/// Persisted audit record. Field names on the wire follow the `loggithub`
/// collection layout the event viewer reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "org")]
    pub organization: String,
    #[serde(rename = "pushername")]
    pub actor_name: String,
    #[serde(rename = "pusherlink")]
    pub actor_profile_url: String,
    #[serde(rename = "actionhook")]
    pub action_kind: String,
    #[serde(rename = "repos")]
    pub repository_full_name: String,
    #[serde(rename = "dateevt")]
    pub recorded_at: DateTime<Utc>,
    #[serde(rename = "messages")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryBootstrapRequest {
    pub organization_login: String,
    pub owner_login: String,
    pub repository_name: String,
    pub admin_email: String,
    pub assignee_login: String,
}

// ─── Payload shapes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pusher {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushRepository {
    pub full_name: String,
    /// Organization login; only present for organization-owned repositories.
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub owner: Account,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub commits: Vec<Commit>,
    pub repository: PushRepository,
    #[serde(default)]
    pub pusher: Pusher,
    #[serde(default)]
    pub sender: Account,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub owner: Account,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryPayload {
    pub action: String,
    pub repository: Repository,
    /// Absent for repositories owned by a user account.
    #[serde(default)]
    pub organization: Option<Account>,
    #[serde(default)]
    pub sender: Account,
}
