use serde::{Deserialize, Serialize};

use crate::utils::text::join_or_marker;

/// One documented gene/drug relationship, oriented from the queried entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRow {
    pub left_label: String,
    pub left_name: String,
    pub left_concept_id: String,
    pub right_label: String,
    pub right_name: String,
    pub right_concept_id: String,
    #[serde(default)]
    pub interaction_types: Vec<String>,
    #[serde(default)]
    pub directionality: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub publication_ids: Vec<String>,
}

impl InteractionRow {
    pub fn types_display(&self) -> String {
        join_or_marker(&self.interaction_types)
    }

    pub fn directions_display(&self) -> String {
        join_or_marker(&self.directionality)
    }

    pub fn sources_display(&self) -> String {
        join_or_marker(&self.sources)
    }

    pub fn publications_display(&self) -> String {
        join_or_marker(&self.publication_ids)
    }
}

/// Concatenates every row's interaction types in row order, for faceting.
pub fn interaction_type_index(rows: &[InteractionRow]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| row.interaction_types.iter().cloned())
        .collect()
}

/// Counts interaction types, ordered by descending count then name.
pub fn interaction_type_counts(types: &[String]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in types {
        match counts.iter_mut().find(|(name, _)| name == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value.clone(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(types: &[&str]) -> InteractionRow {
        InteractionRow {
            left_label: "Gene".into(),
            left_name: "SLC6A4".into(),
            left_concept_id: "hgnc:11050".into(),
            right_label: "Drug".into(),
            right_name: "FLUOXETINE".into(),
            right_concept_id: "rxcui:4493".into(),
            interaction_types: types.iter().map(|s| s.to_string()).collect(),
            directionality: Vec::new(),
            score: None,
            sources: Vec::new(),
            publication_ids: Vec::new(),
        }
    }

    #[test]
    fn displays_fall_back_to_marker() {
        let row = row(&[]);
        assert_eq!(row.types_display(), "—");
        assert_eq!(row.directions_display(), "—");
        assert_eq!(row.sources_display(), "—");
        assert_eq!(row.publications_display(), "—");
    }

    #[test]
    fn type_index_preserves_row_order_and_duplicates() {
        let rows = vec![row(&["inhibitor"]), row(&[]), row(&["inhibitor", "blocker"])];
        assert_eq!(
            interaction_type_index(&rows),
            vec!["inhibitor", "inhibitor", "blocker"]
        );
    }

    #[test]
    fn type_counts_sort_by_frequency() {
        let types: Vec<String> = ["blocker", "inhibitor", "inhibitor", "agonist"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            interaction_type_counts(&types),
            vec![
                ("inhibitor".to_string(), 2),
                ("agonist".to_string(), 1),
                ("blocker".to_string(), 1),
            ]
        );
    }
}
