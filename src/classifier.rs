use crate::error::HookError;
use crate::types::{
    ActionKind, ActionSummary, NotificationRecord, PushPayload, RepositoryBootstrapRequest,
    RepositoryPayload,
};

#[derive(Debug, Clone)]
pub enum WebhookEvent {
    Push(PushEvent),
    Repository(RepositoryEvent),
    /// A push without commits (branch deletion, tag push).
    NoOp,
    Unknown { raw_type_label: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub organization: String,
    pub actor_name: String,
    pub actor_avatar_url: String,
    pub repository_full_name: String,
    pub added_files: Vec<String>,
    pub removed_files: Vec<String>,
    pub modified_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryEvent {
    pub action: String,
    pub organization_login: String,
    pub actor_login: String,
    pub actor_avatar_url: String,
    pub organization_avatar_url: String,
    pub repository_name: String,
    pub repository_full_name: String,
}

pub fn classify(event_type: &str, body: &[u8]) -> Result<WebhookEvent, HookError> {
    match event_type {
        "push" => {
            let payload: PushPayload = serde_json::from_slice(body)?;
            Ok(PushEvent::from_payload(payload).map_or(WebhookEvent::NoOp, WebhookEvent::Push))
        }
        "repository" => {
            let payload: RepositoryPayload = serde_json::from_slice(body)?;
            Ok(WebhookEvent::Repository(RepositoryEvent::from(payload)))
        }
        other => Ok(WebhookEvent::Unknown {
            raw_type_label: other.to_string(),
        }),
    }
}

/// Pick the reported action for one commit's file lists.
///
/// Precedence is added > removed > modified: only the first non-empty list
/// is reported. With all three empty the result is `Modified` with an empty
/// file list.
pub fn derive_action(added: &[String], removed: &[String], modified: &[String]) -> ActionSummary {
    let (kind, files) = if !added.is_empty() {
        (ActionKind::Added, added)
    } else if !removed.is_empty() {
        (ActionKind::Removed, removed)
    } else {
        (ActionKind::Modified, modified)
    };
    ActionSummary {
        kind,
        detail: format!("File(s) : {}", files.join(",")),
    }
}

impl PushEvent {
    /// Returns `None` when the push carries no commits. Only the first
    /// commit's file lists are kept.
    fn from_payload(payload: PushPayload) -> Option<Self> {
        let first = payload.commits.into_iter().next()?;
        let organization = payload
            .repository
            .organization
            .unwrap_or(payload.repository.owner.login);
        Some(Self {
            organization,
            actor_name: payload.pusher.name,
            actor_avatar_url: payload.sender.avatar_url.unwrap_or_default(),
            repository_full_name: payload.repository.full_name,
            added_files: first.added,
            removed_files: first.removed,
            modified_files: first.modified,
        })
    }

    pub fn summary(&self) -> ActionSummary {
        derive_action(&self.added_files, &self.removed_files, &self.modified_files)
    }

    /// Push payloads carry no organization avatar, so the configured one is used.
    pub fn notification(&self, org_avatar_url: &str) -> NotificationRecord {
        NotificationRecord::new(
            &self.organization,
            &self.actor_name,
            &self.actor_avatar_url,
            org_avatar_url,
            &self.repository_full_name,
            self.summary(),
        )
    }
}

impl From<RepositoryPayload> for RepositoryEvent {
    fn from(payload: RepositoryPayload) -> Self {
        let organization = payload
            .organization
            .unwrap_or(payload.repository.owner);
        Self {
            action: payload.action,
            organization_login: organization.login,
            actor_login: payload.sender.login,
            actor_avatar_url: payload.sender.avatar_url.unwrap_or_default(),
            organization_avatar_url: organization.avatar_url.unwrap_or_default(),
            repository_name: payload.repository.name,
            repository_full_name: payload.repository.full_name,
        }
    }
}

impl RepositoryEvent {
    pub fn summary(&self) -> ActionSummary {
        ActionSummary {
            kind: ActionKind::from_repository_action(&self.action),
            detail: String::new(),
        }
    }

    pub fn notification(&self) -> NotificationRecord {
        NotificationRecord::new(
            &self.organization_login,
            &self.actor_login,
            &self.actor_avatar_url,
            &self.organization_avatar_url,
            &self.repository_full_name,
            self.summary(),
        )
    }

    pub fn is_creation(&self) -> bool {
        self.action == "created"
    }

    pub fn bootstrap_request(
        &self,
        admin_email: &str,
        assignee_login: &str,
    ) -> RepositoryBootstrapRequest {
        RepositoryBootstrapRequest {
            organization_login: self.organization_login.clone(),
            owner_login: self.actor_login.clone(),
            repository_name: self.repository_name.clone(),
            admin_email: admin_email.to_string(),
            assignee_login: assignee_login.to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    pub fn push(added: &[&str], removed: &[&str], modified: &[&str]) -> Value {
        json!({
            "ref": "refs/heads/main",
            "commits": [
                { "id": "c1", "added": added, "removed": removed, "modified": modified },
                { "id": "c2", "added": ["later.go"], "removed": [], "modified": [] }
            ],
            "repository": {
                "name": "repo1",
                "full_name": "org/repo1",
                "organization": "org",
                "owner": { "login": "org" }
            },
            "pusher": { "name": "alice", "email": "alice@example.com" },
            "sender": { "login": "alice", "avatar_url": "https://avatars.test/alice.png" }
        })
    }

    pub fn repository(action: &str) -> Value {
        json!({
            "action": action,
            "repository": { "name": "widgets", "full_name": "acme/widgets" },
            "organization": { "login": "acme", "avatar_url": "https://avatars.test/acme.png" },
            "sender": { "login": "bob", "avatar_url": "https://avatars.test/bob.png" }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn classify_json(event_type: &str, value: serde_json::Value) -> WebhookEvent {
        classify(event_type, &serde_json::to_vec(&value).unwrap()).unwrap()
    }

    #[test]
    fn added_wins_over_removed_and_modified() {
        let summary = derive_action(&files(&["a.go"]), &files(&["b.go"]), &files(&["c.go"]));
        assert_eq!(summary.kind, ActionKind::Added);
        assert_eq!(summary.detail, "File(s) : a.go");
    }

    #[test]
    fn removed_wins_over_modified() {
        let summary = derive_action(&[], &files(&["b.go", "d.go"]), &files(&["c.go"]));
        assert_eq!(summary.kind, ActionKind::Removed);
        assert_eq!(summary.detail, "File(s) : b.go,d.go");
    }

    #[test]
    fn modified_only() {
        let summary = derive_action(&[], &[], &files(&["c.go"]));
        assert_eq!(summary.kind, ActionKind::Modified);
        assert_eq!(summary.detail, "File(s) : c.go");
    }

    #[test]
    fn all_empty_is_modified_with_empty_list() {
        let summary = derive_action(&[], &[], &[]);
        assert_eq!(summary.kind, ActionKind::Modified);
        assert_eq!(summary.detail, "File(s) : ");
    }

    #[test]
    fn push_uses_first_commit_only() {
        let event = classify_json("push", fixtures::push(&[], &["b.go"], &[]));
        let WebhookEvent::Push(push) = event else {
            panic!("expected push, got {event:?}");
        };
        assert_eq!(push.organization, "org");
        assert_eq!(push.actor_name, "alice");
        assert_eq!(push.repository_full_name, "org/repo1");
        assert_eq!(push.summary().kind, ActionKind::Removed);
    }

    #[test]
    fn push_without_commits_is_noop() {
        let mut payload = fixtures::push(&["a.go"], &[], &[]);
        payload["commits"] = json!([]);
        assert!(matches!(classify_json("push", payload), WebhookEvent::NoOp));
    }

    #[test]
    fn push_falls_back_to_owner_login_for_organization() {
        let mut payload = fixtures::push(&["a.go"], &[], &[]);
        payload["repository"]
            .as_object_mut()
            .unwrap()
            .remove("organization");
        payload["repository"]["owner"]["login"] = json!("someone");
        let WebhookEvent::Push(push) = classify_json("push", payload) else {
            panic!("expected push");
        };
        assert_eq!(push.organization, "someone");
    }

    #[test]
    fn repository_event_fields() {
        let WebhookEvent::Repository(repo) = classify_json("repository", fixtures::repository("created"))
        else {
            panic!("expected repository event");
        };
        assert!(repo.is_creation());
        assert_eq!(repo.organization_login, "acme");
        assert_eq!(repo.repository_name, "widgets");
        assert_eq!(repo.organization_avatar_url, "https://avatars.test/acme.png");

        let record = repo.notification();
        assert_eq!(record.message(), "Alert : created Repository : acme/widgets ");

        let request = repo.bootstrap_request("admin@acme.test", "secops");
        assert_eq!(request.owner_login, "bob");
        assert_eq!(request.assignee_login, "secops");
    }

    #[test]
    fn deleted_repository_is_not_a_creation() {
        let WebhookEvent::Repository(repo) = classify_json("repository", fixtures::repository("deleted"))
        else {
            panic!("expected repository event");
        };
        assert!(!repo.is_creation());
        assert_eq!(repo.summary().kind, ActionKind::Other("deleted".into()));
    }

    #[test]
    fn user_owned_repository_uses_owner_as_organization() {
        let mut payload = fixtures::repository("created");
        payload.as_object_mut().unwrap().remove("organization");
        payload["repository"]["owner"] = json!({ "login": "carol", "avatar_url": "https://avatars.test/carol.png" });
        let WebhookEvent::Repository(repo) = classify_json("repository", payload) else {
            panic!("expected repository event");
        };
        assert_eq!(repo.organization_login, "carol");
        assert_eq!(repo.organization_avatar_url, "https://avatars.test/carol.png");
    }

    #[test]
    fn unknown_event_type_keeps_label() {
        let event = classify("ping", b"{\"zen\":\"Keep it logically awesome.\"}").unwrap();
        assert!(matches!(event, WebhookEvent::Unknown { raw_type_label } if raw_type_label == "ping"));
    }

    #[test]
    fn malformed_known_payload_is_unparseable() {
        assert!(matches!(
            classify("push", b"not json"),
            Err(HookError::PayloadUnparseable(_))
        ));
        assert!(matches!(
            classify("repository", b"{\"action\":\"created\"}"),
            Err(HookError::PayloadUnparseable(_))
        ));
    }
}
