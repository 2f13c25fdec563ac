use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheKey, ResultCache};
use crate::entities::alias::AliasTables;
use crate::entities::interaction::{InteractionRow, interaction_type_index};
use crate::entities::protein::ProteinRecord;
use crate::entities::{EntityType, NormalizedQuery};
use crate::error::DgitError;
use crate::sources::Upstream;
use crate::transform;

/// Flattened rows for one lookup; the variant follows the entity type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LookupRows {
    Interactions(Vec<InteractionRow>),
    Proteins(Vec<ProteinRecord>),
}

impl LookupRows {
    pub fn len(&self) -> usize {
        match self {
            LookupRows::Interactions(rows) => rows.len(),
            LookupRows::Proteins(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn interaction_types(&self) -> Vec<String> {
        match self {
            LookupRows::Interactions(rows) => interaction_type_index(rows),
            LookupRows::Proteins(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// Empty query: the fixed category list, no lookup performed.
    Defaults {
        entity_type: EntityType,
        items: Vec<String>,
    },
    Rows {
        query: NormalizedQuery,
        rows: LookupRows,
        interaction_types: Vec<String>,
        from_cache: bool,
    },
}

impl Resolution {
    fn from_cache_entry(query: NormalizedQuery, entry: CacheEntry) -> Self {
        Resolution::Rows {
            query,
            rows: entry.rows,
            interaction_types: entry.interaction_types,
            from_cache: true,
        }
    }
}

/// Drives normalize, cache probe, fetch, flatten and store for one request.
pub(crate) struct Resolver {
    aliases: Arc<AliasTables>,
    upstream: Arc<dyn Upstream>,
    cache: ResultCache,
    in_flight: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl Resolver {
    pub(crate) fn new(
        aliases: Arc<AliasTables>,
        upstream: Arc<dyn Upstream>,
        cache: ResultCache,
    ) -> Self {
        Self {
            aliases,
            upstream,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn aliases(&self) -> &AliasTables {
        &self.aliases
    }

    pub(crate) fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Resolves a request whose entity type arrives as free text.
    pub(crate) async fn resolve(
        &self,
        entity_type: &str,
        raw_term: &str,
    ) -> Result<Resolution, DgitError> {
        let entity: EntityType = entity_type.parse()?;
        self.resolve_entity(entity, raw_term).await
    }

    pub(crate) async fn resolve_entity(
        &self,
        entity: EntityType,
        raw_term: &str,
    ) -> Result<Resolution, DgitError> {
        let query = self.aliases.normalize_query(entity, raw_term);
        if query.is_empty() {
            return Ok(Resolution::Defaults {
                entity_type: entity,
                items: entity.defaults().iter().map(|s| s.to_string()).collect(),
            });
        }

        if let Some(entry) = self.cache.lookup(&query.canonical_term, entity).await {
            return Ok(Resolution::from_cache_entry(query, entry));
        }

        let key = CacheKey::new(&query.canonical_term, entity);
        let gate = self.gate_for(&key);
        let result = {
            let _held = gate.lock().await;
            // A concurrent request for the same key may have filled the cache
            // while this one waited for the gate.
            match self.cache.lookup(&query.canonical_term, entity).await {
                Some(entry) => Ok(Resolution::from_cache_entry(query, entry)),
                None => self.fetch_and_store(query).await,
            }
        };
        self.release_gate(&key, &gate);
        result
    }

    async fn fetch_and_store(&self, query: NormalizedQuery) -> Result<Resolution, DgitError> {
        let entity = query.entity_type;
        let term = query.canonical_term.as_str();
        debug!(%entity, term, "fetching from upstream");

        let raw = self.upstream.fetch(entity, term).await?;
        if let Some(message) = embedded_error(entity, &raw) {
            return Err(DgitError::Upstream {
                api: "dgidb".to_string(),
                message,
            });
        }

        let rows = transform::flatten(entity, &raw);
        let interaction_types = rows.interaction_types();
        if let Err(err) = self.cache.store(term, entity, &raw, &rows).await {
            warn!(%entity, term, error = %err, "failed to store lookup result in cache");
        }

        Ok(Resolution::Rows {
            query,
            rows,
            interaction_types,
            from_cache: false,
        })
    }

    fn gate_for(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(key.clone()).or_default().clone()
    }

    fn release_gate(&self, key: &CacheKey, gate: &Arc<tokio::sync::Mutex<()>>) {
        let mut map = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let idle = map
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, gate) && Arc::strong_count(gate) <= 2);
        if idle {
            map.remove(key);
        }
    }
}

fn embedded_error(entity: EntityType, raw: &serde_json::Value) -> Option<String> {
    match entity {
        EntityType::Gene | EntityType::Drug => crate::sources::dgidb::graphql_error_message(raw),
        EntityType::Protein => None,
    }
}
