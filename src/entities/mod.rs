//! Entity-level lookup workflows used by the CLI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DgitError;

pub(crate) mod alias;
pub(crate) mod ask;
pub(crate) mod interaction;
pub(crate) mod lookup;
pub(crate) mod protein;

const DEFAULT_GENES: [&str; 10] = [
    "SLC6A4", "BDNF", "HTR2A", "TPH2", "GNB3", "MTHFR", "DRD2", "CELF4", "LAMB2", "FKBP5",
];

const DEFAULT_PROTEINS: [&str; 10] = [
    "BDNF",
    "IL-6",
    "CRP",
    // Non-breaking hyphen (U+2011).
    "TNF\u{2011}α",
    "ITIH4",
    "CD155",
    "Lipocalin-2",
    "HGF",
    "LIGHT",
    "C1QC",
];

const DEFAULT_DRUGS: [&str; 10] = [
    "Fluoxetine",
    "Sertraline",
    "Venlafaxine",
    "Levomilnacipran",
    "Citalopram",
    "Escitalopram",
    "Milnacipran",
    "Trazodone",
    "Mirtazapine",
    "Vortioxetine",
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Gene,
    Protein,
    Drug,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [EntityType::Gene, EntityType::Protein, EntityType::Drug];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Gene => "gene",
            EntityType::Protein => "protein",
            EntityType::Drug => "drug",
        }
    }

    /// Fixed category list shown when the user submits an empty query.
    pub fn defaults(self) -> &'static [&'static str] {
        match self {
            EntityType::Gene => &DEFAULT_GENES,
            EntityType::Protein => &DEFAULT_PROTEINS,
            EntityType::Drug => &DEFAULT_DRUGS,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = DgitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gene" => Ok(EntityType::Gene),
            "protein" => Ok(EntityType::Protein),
            "drug" => Ok(EntityType::Drug),
            _ => Err(DgitError::InvalidEntityType(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedQuery {
    pub raw_input: String,
    pub entity_type: EntityType,
    pub canonical_term: String,
}

impl NormalizedQuery {
    pub fn is_empty(&self) -> bool {
        self.canonical_term.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_parses_case_insensitively() {
        assert_eq!("gene".parse::<EntityType>().unwrap(), EntityType::Gene);
        assert_eq!(" Protein ".parse::<EntityType>().unwrap(), EntityType::Protein);
        assert_eq!("DRUG".parse::<EntityType>().unwrap(), EntityType::Drug);
    }

    #[test]
    fn entity_type_rejects_unknown_and_empty_values() {
        let err = "variant".parse::<EntityType>().unwrap_err();
        assert!(matches!(err, DgitError::InvalidEntityType(ref v) if v == "variant"));
        assert!("".parse::<EntityType>().is_err());
    }

    #[test]
    fn every_entity_type_has_ten_defaults() {
        for entity in EntityType::ALL {
            assert_eq!(entity.defaults().len(), 10, "{entity}");
        }
        assert_eq!(EntityType::Gene.defaults()[0], "SLC6A4");
        assert_eq!(EntityType::Drug.defaults()[0], "Fluoxetine");
    }

    #[test]
    fn every_default_protein_normalizes_to_a_table_symbol() {
        let tables = crate::entities::alias::AliasTables::default();
        assert!(EntityType::Protein.defaults()[3].contains('\u{2011}'));
        let symbols: Vec<String> = EntityType::Protein
            .defaults()
            .iter()
            .map(|p| tables.normalize(EntityType::Protein, p))
            .collect();
        assert_eq!(
            symbols,
            vec!["BDNF", "IL6", "CRP", "TNF", "ITIH4", "PVR", "LCN2", "HGF", "TNFSF14", "C1QC"]
        );
    }

    #[test]
    fn entity_type_serializes_lowercase() {
        let json = serde_json::to_string(&EntityType::Protein).unwrap();
        assert_eq!(json, "\"protein\"");
    }
}
