use serde_json::Value;

use crate::entities::EntityType;
use crate::entities::interaction::InteractionRow;
use crate::transform::{array, path, text};

struct Orientation {
    collection: &'static str,
    left_label: &'static str,
    partner_key: &'static str,
    right_label: &'static str,
}

fn orientation(entity: EntityType) -> Orientation {
    match entity {
        EntityType::Drug => Orientation {
            collection: "drugs",
            left_label: "Drug",
            partner_key: "gene",
            right_label: "Gene",
        },
        EntityType::Gene | EntityType::Protein => Orientation {
            collection: "genes",
            left_label: "Gene",
            partner_key: "drug",
            right_label: "Drug",
        },
    }
}

fn partner_name(partner: &Value, partner_key: &str) -> String {
    // Gene partners carry a descriptive long name; prefer it over the symbol.
    let long_name = if partner_key == "gene" {
        text(partner, "longName")
    } else {
        None
    };
    long_name
        .or_else(|| text(partner, "name"))
        .unwrap_or_default()
}

fn collect(items: &[Value], key: &str) -> Vec<String> {
    items.iter().filter_map(|item| text(item, key)).collect()
}

fn row_from_edge(node: &Value, edge: &Value, o: &Orientation) -> InteractionRow {
    let partner = edge.get(o.partner_key).unwrap_or(&Value::Null);
    let types = array(edge, "interactionTypes");

    InteractionRow {
        left_label: o.left_label.to_string(),
        left_name: text(node, "name").unwrap_or_default(),
        left_concept_id: text(node, "conceptId").unwrap_or_default(),
        right_label: o.right_label.to_string(),
        right_name: partner_name(partner, o.partner_key),
        right_concept_id: text(partner, "conceptId").unwrap_or_default(),
        interaction_types: collect(types, "type"),
        directionality: collect(types, "directionality"),
        score: edge.get("interactionScore").and_then(Value::as_f64),
        sources: collect(array(edge, "sources"), "sourceDbName"),
        publication_ids: collect(array(edge, "publications"), "pmid"),
    }
}

/// One row per interaction edge of every returned node, in response order.
pub fn from_dgidb(entity: EntityType, raw: &Value) -> Vec<InteractionRow> {
    let o = orientation(entity);
    let nodes = path(raw, &["data", o.collection]);
    array(nodes, "nodes")
        .iter()
        .flat_map(|node| {
            array(node, "interactions")
                .iter()
                .map(move |edge| (node, edge))
        })
        .map(|(node, edge)| row_from_edge(node, edge, &o))
        .collect()
}
