use serde::{Deserialize, Serialize};

use crate::utils::text::join_or_marker;

/// Display record for one UniProt hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProteinRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accession_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organism: Option<String>,
    #[serde(default)]
    pub gene_symbols: Vec<String>,
}

impl ProteinRecord {
    pub fn genes_display(&self) -> String {
        join_or_marker(&self.gene_symbols)
    }

    /// UniProt entry page for the accession, when one is present.
    pub fn uniprot_url(&self) -> Option<String> {
        self.accession_id
            .as_deref()
            .map(|acc| format!("https://www.uniprot.org/uniprotkb/{acc}/entry"))
    }
}

#[cfg(test)]
mod tests {
    use super::ProteinRecord;

    #[test]
    fn genes_display_joins_symbols_in_order() {
        let record = ProteinRecord {
            protein_name: Some("IL-6".into()),
            description: Some("Interleukin-6".into()),
            accession_id: Some("P05231".into()),
            organism: Some("Homo sapiens".into()),
            gene_symbols: vec!["IL6".into(), "IFNB2".into()],
        };
        assert_eq!(record.genes_display(), "IL6, IFNB2");
        assert_eq!(
            record.uniprot_url().as_deref(),
            Some("https://www.uniprot.org/uniprotkb/P05231/entry")
        );
    }

    #[test]
    fn missing_fields_are_omitted_from_json() {
        let record = ProteinRecord {
            protein_name: None,
            description: None,
            accession_id: None,
            organism: None,
            gene_symbols: Vec::new(),
        };
        assert_eq!(record.genes_display(), "—");
        assert!(record.uniprot_url().is_none());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"gene_symbols": []}));
    }
}
