//! Result cache keyed by (canonical term, entity type).
//!
//! Entries are write-once: the first stored result for a key is the one every
//! later lookup sees. There is no expiry and no eviction; clearing the
//! backing store is an external concern.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entities::EntityType;
use crate::entities::interaction::{InteractionRow, interaction_type_index};
use crate::entities::lookup::LookupRows;
use crate::entities::protein::ProteinRecord;
use crate::error::DgitError;

pub(crate) mod file;
pub(crate) mod memory;

pub(crate) use file::FileStore;
pub(crate) use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub term: String,
    pub entity_type: EntityType,
}

impl CacheKey {
    pub fn new(term: &str, entity_type: EntityType) -> Self {
        Self {
            term: term.trim().to_lowercase(),
            entity_type,
        }
    }

    /// Stable single-string form used by backends that need a flat key.
    pub fn storage_id(&self) -> String {
        format!("{}:{}", self.entity_type, self.term)
    }
}

/// The value shape handed to the persistence layer: JSON text columns plus
/// the write timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRow {
    pub raw_result_json: String,
    pub rows_json: String,
    pub interaction_types_json: String,
    pub stored_at: String,
}

/// Single-row key-value persistence.
#[async_trait::async_trait]
pub(crate) trait CacheStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<StoredRow>, DgitError>;

    /// Inserts `row` unless the key already has one. Returns whether this
    /// call wrote the row.
    async fn put(&self, key: &CacheKey, row: StoredRow) -> Result<bool, DgitError>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub raw_response: serde_json::Value,
    pub rows: LookupRows,
    pub interaction_types: Vec<String>,
    pub stored_at: String,
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

fn decode_rows(entity: EntityType, rows_json: &str) -> Result<LookupRows, serde_json::Error> {
    Ok(match entity {
        EntityType::Gene | EntityType::Drug => {
            LookupRows::Interactions(serde_json::from_str::<Vec<InteractionRow>>(rows_json)?)
        }
        EntityType::Protein => {
            LookupRows::Proteins(serde_json::from_str::<Vec<ProteinRecord>>(rows_json)?)
        }
    })
}

fn decode_entry(key: CacheKey, row: StoredRow) -> Result<CacheEntry, serde_json::Error> {
    let rows = decode_rows(key.entity_type, &row.rows_json)?;
    Ok(CacheEntry {
        raw_response: serde_json::from_str(&row.raw_result_json)?,
        interaction_types: serde_json::from_str(&row.interaction_types_json)?,
        rows,
        stored_at: row.stored_at,
        key,
    })
}

/// Typed facade over a [`CacheStore`].
#[derive(Clone)]
pub(crate) struct ResultCache {
    store: Arc<dyn CacheStore>,
}

impl ResultCache {
    pub(crate) fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub(crate) fn describe(&self) -> String {
        self.store.describe()
    }

    /// Exact-match lookup. Backend failures and undecodable rows are logged and
    /// reported as a miss.
    pub(crate) async fn lookup(&self, term: &str, entity: EntityType) -> Option<CacheEntry> {
        let key = CacheKey::new(term, entity);
        let row = match self.store.get(&key).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                debug!(key = %key.storage_id(), "cache miss");
                return None;
            }
            Err(err) => {
                warn!(key = %key.storage_id(), error = %err, "cache read failed; treating as miss");
                return None;
            }
        };

        match decode_entry(key.clone(), row) {
            Ok(entry) => {
                debug!(key = %key.storage_id(), stored_at = %entry.stored_at, "cache hit");
                Some(entry)
            }
            Err(err) => {
                warn!(key = %key.storage_id(), error = %err, "cached row could not be decoded; treating as miss");
                None
            }
        }
    }

    pub(crate) async fn store(
        &self,
        term: &str,
        entity: EntityType,
        raw: &serde_json::Value,
        rows: &LookupRows,
    ) -> Result<CacheEntry, DgitError> {
        let key = CacheKey::new(term, entity);
        let interaction_types = match rows {
            LookupRows::Interactions(rows) => interaction_type_index(rows),
            LookupRows::Proteins(_) => Vec::new(),
        };
        let stored_at = now_rfc3339();
        let row = StoredRow {
            raw_result_json: serde_json::to_string(raw)?,
            rows_json: serde_json::to_string(rows)?,
            interaction_types_json: serde_json::to_string(&interaction_types)?,
            stored_at: stored_at.clone(),
        };

        let written = self.store.put(&key, row).await?;
        debug!(key = %key.storage_id(), written, "cache store");

        Ok(CacheEntry {
            key,
            raw_response: raw.clone(),
            rows: rows.clone(),
            interaction_types,
            stored_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> LookupRows {
        LookupRows::Interactions(vec![InteractionRow {
            left_label: "Gene".into(),
            left_name: "HTR2A".into(),
            left_concept_id: "hgnc:5293".into(),
            right_label: "Drug".into(),
            right_name: "TRAZODONE".into(),
            right_concept_id: "rxcui:10737".into(),
            interaction_types: vec!["antagonist".into(), "inhibitor".into()],
            directionality: vec!["inhibitory".into()],
            score: Some(2.25),
            sources: vec!["DrugBank".into()],
            publication_ids: vec!["123".into()],
        }])
    }

    fn memory_cache() -> ResultCache {
        ResultCache::new(Arc::new(MemoryStore::default()))
    }

    #[test]
    fn key_lowercases_and_trims_term() {
        let key = CacheKey::new("  SLC6A4 ", EntityType::Gene);
        assert_eq!(key.term, "slc6a4");
        assert_eq!(key.storage_id(), "gene:slc6a4");
    }

    #[tokio::test]
    async fn store_then_lookup_round_trips_rows() {
        let cache = memory_cache();
        let raw = serde_json::json!({"data": {"genes": {"nodes": []}}});
        let rows = sample_rows();

        cache
            .store("HTR2A", EntityType::Gene, &raw, &rows)
            .await
            .unwrap();
        let entry = cache.lookup("htr2a", EntityType::Gene).await.unwrap();
        assert_eq!(entry.rows, rows);
        assert_eq!(entry.raw_response, raw);
        assert_eq!(entry.interaction_types, vec!["antagonist", "inhibitor"]);
        assert!(!entry.stored_at.is_empty());
    }

    #[tokio::test]
    async fn empty_row_sets_round_trip_for_both_shapes() {
        let cache = memory_cache();
        let raw = serde_json::json!({"results": []});

        let empty_proteins = LookupRows::Proteins(Vec::new());
        cache
            .store("CRP", EntityType::Protein, &raw, &empty_proteins)
            .await
            .unwrap();
        let entry = cache.lookup("CRP", EntityType::Protein).await.unwrap();
        assert_eq!(entry.rows, empty_proteins);

        let empty_interactions = LookupRows::Interactions(Vec::new());
        cache
            .store("Trazodone", EntityType::Drug, &raw, &empty_interactions)
            .await
            .unwrap();
        let entry = cache.lookup("trazodone", EntityType::Drug).await.unwrap();
        assert_eq!(entry.rows, empty_interactions);
    }

    #[tokio::test]
    async fn entity_type_is_part_of_the_key() {
        let cache = memory_cache();
        let raw = serde_json::json!({});
        cache
            .store("BDNF", EntityType::Gene, &raw, &sample_rows())
            .await
            .unwrap();
        assert!(cache.lookup("BDNF", EntityType::Protein).await.is_none());
        assert!(cache.lookup("BDN", EntityType::Gene).await.is_none());
    }

    #[tokio::test]
    async fn first_write_wins() {
        let cache = memory_cache();
        let first = serde_json::json!({"version": 1});
        let second = serde_json::json!({"version": 2});
        cache
            .store("COMT", EntityType::Gene, &first, &sample_rows())
            .await
            .unwrap();
        cache
            .store("COMT", EntityType::Gene, &second, &LookupRows::Interactions(Vec::new()))
            .await
            .unwrap();

        let entry = cache.lookup("COMT", EntityType::Gene).await.unwrap();
        assert_eq!(entry.raw_response, first);
        assert_eq!(entry.rows, sample_rows());
    }

    #[tokio::test]
    async fn scores_survive_the_round_trip_bit_for_bit() {
        let cache = memory_cache();
        let raw = serde_json::json!({});
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        for i in 0..5_000 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let score = (state >> 11) as f64 / (1u64 << 53) as f64 * 10.0;

            let mut rows = sample_rows();
            if let LookupRows::Interactions(ref mut list) = rows {
                list[0].score = Some(score);
            }
            let term = format!("GENE{i}");
            cache.store(&term, EntityType::Gene, &raw, &rows).await.unwrap();

            let entry = cache.lookup(&term, EntityType::Gene).await.unwrap();
            let LookupRows::Interactions(list) = entry.rows else {
                panic!("expected interaction rows");
            };
            assert_eq!(
                list[0].score.map(f64::to_bits),
                Some(score.to_bits()),
                "score {score} changed after caching"
            );
        }
    }

    #[tokio::test]
    async fn undecodable_rows_are_a_miss() {
        let store = Arc::new(MemoryStore::default());
        let key = CacheKey::new("TPH2", EntityType::Gene);
        store
            .put(
                &key,
                StoredRow {
                    raw_result_json: "{}".into(),
                    rows_json: "not json".into(),
                    interaction_types_json: "[]".into(),
                    stored_at: now_rfc3339(),
                },
            )
            .await
            .unwrap();

        let cache = ResultCache::new(store);
        assert!(cache.lookup("TPH2", EntityType::Gene).await.is_none());
    }
}
