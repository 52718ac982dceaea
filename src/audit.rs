use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::store::{AuditStore, StoreError};
use crate::types::{AuditLogEntry, NotificationRecord};

pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub fn entry_for(record: &NotificationRecord) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            organization: record.organization.clone(),
            actor_name: record.actor_name.clone(),
            actor_profile_url: record.actor_profile_url.clone(),
            action_kind: record.summary.kind.to_string(),
            repository_full_name: record.repository_full_name.clone(),
            recorded_at: record.timestamp,
            message: record.message(),
        }
    }

    /// Persist one entry for a handled event. Store failures are logged and
    /// swallowed; `None` means nothing was written.
    pub async fn record(&self, record: &NotificationRecord) -> Option<String> {
        let entry = Self::entry_for(record);
        match self.store.insert(entry).await {
            Ok(id) => {
                info!(id = %id, repo = %record.repository_full_name, "audit entry recorded");
                Some(id)
            }
            Err(e) => {
                warn!(repo = %record.repository_full_name, error = %e, "audit entry not recorded");
                None
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<AuditLogEntry>, StoreError> {
        self.store.get_all().await
    }

    pub async fn delete(&self, ids: &[String]) -> Result<usize, StoreError> {
        let removed = self.store.remove_by_ids(ids).await?;
        info!(requested = ids.len(), removed, "audit entries deleted");
        Ok(removed)
    }
}

/// Split the `;`-delimited id list posted by the event viewer.
///
/// `count` is what the viewer claims to have selected; it is only compared
/// against the parsed list and never trusted over it.
pub fn parse_id_list(count: Option<usize>, raw: &str) -> Vec<String> {
    let ids: Vec<String> = raw
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if let Some(count) = count.filter(|c| *c != ids.len()) {
        warn!(declared = count, parsed = ids.len(), "delete request count mismatch");
    }
    ids
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use async_trait::async_trait;

    /// A store whose every call fails.
    pub struct BrokenStore;

    #[async_trait]
    impl AuditStore for BrokenStore {
        async fn insert(&self, _entry: AuditLogEntry) -> Result<String, StoreError> {
            Err(StoreError::Write {
                path: "broken".into(),
                source: std::io::Error::other("disk full"),
            })
        }

        async fn get_all(&self) -> Result<Vec<AuditLogEntry>, StoreError> {
            Err(StoreError::Read {
                path: "broken".into(),
                source: std::io::Error::other("unreadable"),
            })
        }

        async fn remove_by_ids(&self, _ids: &[String]) -> Result<usize, StoreError> {
            Err(StoreError::Write {
                path: "broken".into(),
                source: std::io::Error::other("disk full"),
            })
        }
    }
}
