use std::sync::OnceLock;

use minijinja::{Environment, context};
use serde::Serialize;

use crate::entities::EntityType;
use crate::entities::ask::Answer;
use crate::entities::interaction::{InteractionRow, interaction_type_counts};
use crate::entities::lookup::{LookupRows, Resolution};
use crate::entities::protein::ProteinRecord;
use crate::entities::NormalizedQuery;
use crate::error::DgitError;
use crate::utils::text::EMPTY_MARKER;

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

fn env() -> Result<&'static Environment<'static>, DgitError> {
    if let Some(env) = ENV.get() {
        return Ok(env);
    }

    let mut env = Environment::new();
    // Pipes would split a table cell; newlines would end the row.
    env.add_filter("cell", |s: String| -> String {
        let s = s.replace('|', "\\|").replace(['\r', '\n'], " ");
        if s.trim().is_empty() {
            EMPTY_MARKER.to_string()
        } else {
            s
        }
    });
    env.add_template(
        "interactions.md.j2",
        include_str!("../../templates/interactions.md.j2"),
    )?;
    env.add_template(
        "proteins.md.j2",
        include_str!("../../templates/proteins.md.j2"),
    )?;
    env.add_template(
        "defaults.md.j2",
        include_str!("../../templates/defaults.md.j2"),
    )?;
    env.add_template("answer.md.j2", include_str!("../../templates/answer.md.j2"))?;
    env.add_template(
        "summary.md.j2",
        include_str!("../../templates/summary.md.j2"),
    )?;

    let _ = ENV.set(env);
    Ok(ENV
        .get()
        .expect("ENV should be initialized by the time this is reached"))
}

#[derive(Serialize)]
struct InteractionView<'a> {
    left_name: &'a str,
    right_name: &'a str,
    right_concept_id: &'a str,
    types: String,
    directions: String,
    score: String,
    sources: String,
    publications: String,
}

impl<'a> From<&'a InteractionRow> for InteractionView<'a> {
    fn from(row: &'a InteractionRow) -> Self {
        Self {
            left_name: &row.left_name,
            right_name: &row.right_name,
            right_concept_id: &row.right_concept_id,
            types: row.types_display(),
            directions: row.directions_display(),
            score: row
                .score
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| EMPTY_MARKER.to_string()),
            sources: row.sources_display(),
            publications: row.publications_display(),
        }
    }
}

#[derive(Serialize)]
struct ProteinView<'a> {
    name: &'a str,
    description: &'a str,
    accession: &'a str,
    url: Option<String>,
    organism: &'a str,
    genes: String,
}

impl<'a> From<&'a ProteinRecord> for ProteinView<'a> {
    fn from(record: &'a ProteinRecord) -> Self {
        Self {
            name: record.protein_name.as_deref().unwrap_or(EMPTY_MARKER),
            description: record.description.as_deref().unwrap_or(EMPTY_MARKER),
            accession: record.accession_id.as_deref().unwrap_or(EMPTY_MARKER),
            url: record.uniprot_url(),
            organism: record.organism.as_deref().unwrap_or(EMPTY_MARKER),
            genes: record.genes_display(),
        }
    }
}

#[derive(Serialize)]
struct TypeFacet {
    name: String,
    count: usize,
}

fn labels(entity: EntityType) -> (&'static str, &'static str) {
    match entity {
        EntityType::Drug => ("Drug", "Gene"),
        EntityType::Gene | EntityType::Protein => ("Gene", "Drug"),
    }
}

fn interactions_markdown(
    query: &NormalizedQuery,
    rows: &[InteractionRow],
    interaction_types: &[String],
    from_cache: bool,
) -> Result<String, DgitError> {
    let (left_label, right_label) = labels(query.entity_type);
    let views: Vec<InteractionView<'_>> = rows.iter().map(InteractionView::from).collect();
    let type_counts: Vec<TypeFacet> = interaction_type_counts(interaction_types)
        .into_iter()
        .map(|(name, count)| TypeFacet { name, count })
        .collect();

    let tmpl = env()?.get_template("interactions.md.j2")?;
    Ok(tmpl.render(context! {
        left_label => left_label,
        right_label => right_label,
        term => &query.canonical_term,
        raw_input => query.raw_input.trim(),
        rows => views,
        type_counts => type_counts,
        from_cache => from_cache,
    })?)
}

fn proteins_markdown(
    query: &NormalizedQuery,
    rows: &[ProteinRecord],
    from_cache: bool,
) -> Result<String, DgitError> {
    let views: Vec<ProteinView<'_>> = rows.iter().map(ProteinView::from).collect();
    let tmpl = env()?.get_template("proteins.md.j2")?;
    Ok(tmpl.render(context! {
        term => &query.canonical_term,
        raw_input => query.raw_input.trim(),
        rows => views,
        from_cache => from_cache,
    })?)
}

pub fn resolution_markdown(resolution: &Resolution) -> Result<String, DgitError> {
    match resolution {
        Resolution::Defaults { entity_type, items } => {
            let label = crate::utils::text::title_case(entity_type.as_str());
            let tmpl = env()?.get_template("defaults.md.j2")?;
            Ok(tmpl.render(context! {
                label => label,
                entity_type => entity_type.as_str(),
                items => items,
            })?)
        }
        Resolution::Rows {
            query,
            rows: LookupRows::Interactions(rows),
            interaction_types,
            from_cache,
        } => interactions_markdown(query, rows, interaction_types, *from_cache),
        Resolution::Rows {
            query,
            rows: LookupRows::Proteins(rows),
            from_cache,
            ..
        } => proteins_markdown(query, rows, *from_cache),
    }
}

pub fn answer_markdown(answer: &Answer) -> Result<String, DgitError> {
    let tmpl = env()?.get_template("answer.md.j2")?;
    Ok(tmpl.render(context! {
        question => &answer.question,
        gene => &answer.gene,
        answer => &answer.answer,
    })?)
}

pub fn summary_markdown(term: &str, summary: Option<&str>) -> Result<String, DgitError> {
    let tmpl = env()?.get_template("summary.md.j2")?;
    Ok(tmpl.render(context! {
        term => term,
        summary => summary,
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(entity: EntityType, raw: &str, term: &str) -> NormalizedQuery {
        NormalizedQuery {
            raw_input: raw.to_string(),
            entity_type: entity,
            canonical_term: term.to_string(),
        }
    }

    fn row(drug: &str, types: &[&str], score: Option<f64>) -> InteractionRow {
        InteractionRow {
            left_label: "Gene".into(),
            left_name: "SLC6A4".into(),
            left_concept_id: "hgnc:11050".into(),
            right_label: "Drug".into(),
            right_name: drug.into(),
            right_concept_id: "rxcui:1".into(),
            interaction_types: types.iter().map(|s| s.to_string()).collect(),
            directionality: Vec::new(),
            score,
            sources: vec!["DrugBank".into()],
            publication_ids: Vec::new(),
        }
    }

    #[test]
    fn interaction_table_has_rows_markers_and_facets() {
        let rows = vec![
            row("FLUOXETINE", &["inhibitor"], Some(0.756)),
            row("PAROXETINE", &["inhibitor", "allosteric modulator"], None),
        ];
        let types = crate::entities::interaction::interaction_type_index(&rows);
        let resolution = Resolution::Rows {
            query: query(EntityType::Gene, "sert", "SLC6A4"),
            rows: LookupRows::Interactions(rows),
            interaction_types: types,
            from_cache: true,
        };

        let md = resolution_markdown(&resolution).unwrap();
        assert!(md.starts_with("# Gene: SLC6A4"));
        assert!(md.contains("normalized to SLC6A4"));
        assert!(md.contains("2 interactions (cached)"));
        assert!(md.contains("| Gene | Drug |"));
        assert!(md.contains("| SLC6A4 | FLUOXETINE | rxcui:1 | inhibitor | — | 0.76 | DrugBank | — |"));
        assert!(md.contains("- inhibitor: 2"));
        assert!(md.contains("- allosteric modulator: 1"));
    }

    #[test]
    fn empty_interactions_render_a_not_found_line() {
        let resolution = Resolution::Rows {
            query: query(EntityType::Drug, "Nothingazine", "Nothingazine"),
            rows: LookupRows::Interactions(Vec::new()),
            interaction_types: Vec::new(),
            from_cache: false,
        };
        let md = resolution_markdown(&resolution).unwrap();
        assert!(md.starts_with("# Drug: Nothingazine"));
        assert!(md.contains("No interactions found for Nothingazine."));
        assert!(!md.contains("normalized to"));
        assert!(!md.contains("|---|"));
    }

    #[test]
    fn protein_table_links_accessions() {
        let resolution = Resolution::Rows {
            query: query(EntityType::Protein, "il-6", "IL6"),
            rows: LookupRows::Proteins(vec![ProteinRecord {
                protein_name: Some("IL-6".into()),
                description: Some("Interleukin|6".into()),
                accession_id: Some("P05231".into()),
                organism: None,
                gene_symbols: vec!["IL6".into()],
            }]),
            interaction_types: Vec::new(),
            from_cache: false,
        };
        let md = resolution_markdown(&resolution).unwrap();
        assert!(md.contains("# Protein: IL6"));
        assert!(md.contains("[P05231](https://www.uniprot.org/uniprotkb/P05231/entry)"));
        assert!(md.contains("Interleukin\\|6"));
        assert!(md.contains("| — | IL6 |"));
    }

    #[test]
    fn defaults_render_as_a_list() {
        let resolution = Resolution::Defaults {
            entity_type: EntityType::Drug,
            items: EntityType::Drug.defaults().iter().map(|s| s.to_string()).collect(),
        };
        let md = resolution_markdown(&resolution).unwrap();
        assert!(md.starts_with("# Drug list"));
        assert!(md.contains("- Fluoxetine\n"));
        assert!(md.contains("- Vortioxetine\n"));
    }

    #[test]
    fn summary_has_placeholder_when_missing() {
        let md = summary_markdown("BDNF", None).unwrap();
        assert!(md.contains("No NCBI gene summary available."));
        let md = summary_markdown("BDNF", Some("brain derived neurotrophic factor")).unwrap();
        assert!(md.contains("brain derived neurotrophic factor"));
    }

    #[test]
    fn answer_mentions_context_gene() {
        let md = answer_markdown(&Answer {
            question: "Is BDNF relevant?".into(),
            gene: Some("BDNF".into()),
            answer: "Yes.".into(),
        })
        .unwrap();
        assert!(md.contains("_Context gene: BDNF_"));
        assert!(md.trim_end().ends_with("Yes."));
    }
}
