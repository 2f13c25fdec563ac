use serde::Serialize;

use crate::error::DgitError;

pub fn to_pretty<T: Serialize>(value: &T) -> Result<String, DgitError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::to_pretty;
    use crate::entities::lookup::{LookupRows, Resolution};
    use crate::entities::protein::ProteinRecord;
    use crate::entities::{EntityType, NormalizedQuery};

    #[test]
    fn defaults_are_tagged_with_kind() {
        let json = to_pretty(&Resolution::Defaults {
            entity_type: EntityType::Gene,
            items: vec!["SLC6A4".into()],
        })
        .expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["kind"], "defaults");
        assert_eq!(value["entity_type"], "gene");
        assert_eq!(value["items"][0], "SLC6A4");
        assert!(json.contains('\n'));
    }

    #[test]
    fn protein_rows_serialize_as_a_plain_array() {
        let json = to_pretty(&Resolution::Rows {
            query: NormalizedQuery {
                raw_input: "crp".into(),
                entity_type: EntityType::Protein,
                canonical_term: "CRP".into(),
            },
            rows: LookupRows::Proteins(vec![ProteinRecord {
                protein_name: None,
                description: Some("C-reactive protein".into()),
                accession_id: Some("P02741".into()),
                organism: Some("Homo sapiens".into()),
                gene_symbols: vec!["CRP".into(), "PTX1".into()],
            }]),
            interaction_types: Vec::new(),
            from_cache: false,
        })
        .expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["kind"], "rows");
        assert_eq!(value["query"]["canonical_term"], "CRP");
        assert_eq!(value["rows"][0]["accession_id"], "P02741");
        assert!(value["rows"][0].get("protein_name").is_none());
        assert_eq!(value["from_cache"], false);
    }
}
