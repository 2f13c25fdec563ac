use serde_json::Value;

use crate::entities::protein::ProteinRecord;
use crate::transform::{array, path, text};

fn first_short_name(recommended: &Value) -> Option<String> {
    array(recommended, "shortNames")
        .iter()
        .find_map(|name| text(name, "value"))
}

fn gene_symbols(hit: &Value) -> Vec<String> {
    let mut out = Vec::new();
    for gene in array(hit, "genes") {
        if let Some(primary) = text(path(gene, &["geneName"]), "value") {
            out.push(primary);
        }
        out.extend(
            array(gene, "synonyms")
                .iter()
                .filter_map(|syn| text(syn, "value")),
        );
    }
    out
}

pub fn from_uniprot_hit(hit: &Value) -> ProteinRecord {
    let recommended = path(hit, &["proteinDescription", "recommendedName"]);

    ProteinRecord {
        protein_name: first_short_name(recommended),
        description: text(path(recommended, &["fullName"]), "value"),
        accession_id: text(hit, "primaryAccession"),
        organism: text(path(hit, &["organism"]), "scientificName"),
        gene_symbols: gene_symbols(hit),
    }
}

pub fn from_uniprot(raw: &Value) -> Vec<ProteinRecord> {
    array(raw, "results").iter().map(from_uniprot_hit).collect()
}
