use std::collections::HashMap;
use std::sync::Mutex;

use crate::cache::{CacheKey, CacheStore, StoredRow};
use crate::error::DgitError;

/// Process-local store; contents are lost on exit.
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    rows: Mutex<HashMap<CacheKey, StoredRow>>,
}

impl MemoryStore {
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<StoredRow>, DgitError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.get(key).cloned())
    }

    async fn put(&self, key: &CacheKey, row: StoredRow) -> Result<bool, DgitError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        if rows.contains_key(key) {
            return Ok(false);
        }
        rows.insert(key.clone(), row);
        Ok(true)
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityType;

    fn row(tag: &str) -> StoredRow {
        StoredRow {
            raw_result_json: format!("{{\"tag\":\"{tag}\"}}"),
            rows_json: "[]".into(),
            interaction_types_json: "[]".into(),
            stored_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[tokio::test]
    async fn put_is_insert_if_absent() {
        let store = MemoryStore::default();
        let key = CacheKey::new("DRD2", EntityType::Gene);

        assert!(store.put(&key, row("a")).await.unwrap());
        assert!(!store.put(&key, row("b")).await.unwrap());
        assert_eq!(store.get(&key).await.unwrap(), Some(row("a")));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let store = MemoryStore::default();
        let key = CacheKey::new("GNB3", EntityType::Gene);
        assert_eq!(store.get(&key).await.unwrap(), None);
    }
}
