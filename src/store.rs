use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::types::AuditLogEntry;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read audit log {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write audit log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("audit log is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Append-only collection of audit entries, deletable in bulk by id.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist an entry and return its identifier.
    async fn insert(&self, entry: AuditLogEntry) -> Result<String, StoreError>;

    /// Every entry in insertion order.
    async fn get_all(&self) -> Result<Vec<AuditLogEntry>, StoreError>;

    /// Remove entries whose id is listed. Unknown ids are ignored; returns
    /// how many entries were removed.
    async fn remove_by_ids(&self, ids: &[String]) -> Result<usize, StoreError>;
}

fn retain_except(entries: &mut Vec<AuditLogEntry>, ids: &[String]) -> usize {
    let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let before = entries.len();
    entries.retain(|e| !doomed.contains(e.id.as_str()));
    before - entries.len()
}

#[derive(Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn insert(&self, entry: AuditLogEntry) -> Result<String, StoreError> {
        let id = entry.id.clone();
        self.entries.write().await.push(entry);
        Ok(id)
    }

    async fn get_all(&self) -> Result<Vec<AuditLogEntry>, StoreError> {
        Ok(self.entries.read().await.clone())
    }

    async fn remove_by_ids(&self, ids: &[String]) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().await;
        Ok(retain_except(&mut entries, ids))
    }
}

/// The collection as one pretty-printed JSON array on disk, rewritten on
/// every mutation.
pub struct JsonFileAuditStore {
    path: PathBuf,
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl JsonFileAuditStore {
    /// Open the file, creating its directory if needed. A missing file is an
    /// empty collection.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| StoreError::Write {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    async fn save(&self, entries: &[AuditLogEntry]) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(entries)?;
        // Write to a sibling file first so a crash never leaves a truncated log.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|source| StoreError::Write {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

#[async_trait]
impl AuditStore for JsonFileAuditStore {
    async fn insert(&self, entry: AuditLogEntry) -> Result<String, StoreError> {
        let id = entry.id.clone();
        let mut entries = self.entries.write().await;
        entries.push(entry);
        if let Err(e) = self.save(&entries).await {
            entries.pop();
            return Err(e);
        }
        Ok(id)
    }

    async fn get_all(&self) -> Result<Vec<AuditLogEntry>, StoreError> {
        Ok(self.entries.read().await.clone())
    }

    async fn remove_by_ids(&self, ids: &[String]) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().await;
        let mut kept = entries.clone();
        let removed = retain_except(&mut kept, ids);
        if removed > 0 {
            self.save(&kept).await?;
            *entries = kept;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: &str) -> AuditLogEntry {
        AuditLogEntry {
            id: id.to_string(),
            organization: "org".into(),
            actor_name: "alice".into(),
            actor_profile_url: "https://github.com/alice".into(),
            action_kind: "Added".into(),
            repository_full_name: "org/repo1".into(),
            recorded_at: Utc::now(),
            message: "Alert : Added Repository : org/repo1 File(s) : a.go".into(),
        }
    }

    async fn exercise(store: &dyn AuditStore) {
        for id in ["a", "b", "c"] {
            assert_eq!(store.insert(entry(id)).await.unwrap(), id);
        }
        let ids: Vec<String> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);

        let removed = store
            .remove_by_ids(&["a".to_string(), "c".to_string(), "zzz".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        let left = store.get_all().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, "b");
    }

    #[tokio::test]
    async fn in_memory_insert_list_remove() {
        exercise(&InMemoryAuditStore::new()).await;
    }

    #[tokio::test]
    async fn json_file_insert_list_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileAuditStore::open(dir.path().join("data/loggithub.json"))
            .await
            .unwrap();
        exercise(&store).await;
    }

    #[tokio::test]
    async fn json_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loggithub.json");
        let original = entry("keep");
        {
            let store = JsonFileAuditStore::open(&path).await.unwrap();
            store.insert(original.clone()).await.unwrap();
        }
        let reopened = JsonFileAuditStore::open(&path).await.unwrap();
        assert_eq!(reopened.get_all().await.unwrap(), vec![original]);
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loggithub.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            JsonFileAuditStore::open(&path).await,
            Err(StoreError::Corrupt(_))
        ));
    }
}
