//! Transform adapters from upstream API shapes into the unified row model.

use serde_json::Value;

use crate::entities::EntityType;
use crate::entities::lookup::LookupRows;

pub(crate) mod interaction;
pub(crate) mod protein;

/// Flattens a raw upstream payload into rows for `entity`.
///
/// Never fails: missing or mistyped nested fields degrade to defaults, and an
/// absent top-level collection yields no rows.
pub fn flatten(entity: EntityType, raw: &Value) -> LookupRows {
    match entity {
        EntityType::Gene | EntityType::Drug => {
            LookupRows::Interactions(interaction::from_dgidb(entity, raw))
        }
        EntityType::Protein => LookupRows::Proteins(protein::from_uniprot(raw)),
    }
}

pub(crate) fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Trimmed, non-empty string field. Numbers are rendered as text so that
/// identifiers returned as integers (PMIDs) survive.
pub(crate) fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Follows `path` through nested objects; any missing hop yields `Value::Null`.
pub(crate) fn path<'a>(value: &'a Value, path: &[&str]) -> &'a Value {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .unwrap_or(&Value::Null)
}
