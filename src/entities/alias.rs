use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::entities::{EntityType, NormalizedQuery};
use crate::error::DgitError;

const GENE_ALIASES: &[(&str, &str)] = &[
    ("5-HT2A", "HTR2A"),
    ("5HT2A", "HTR2A"),
    ("SEROTONIN RECEPTOR 2A", "HTR2A"),
    ("5-HYDROXYTRYPTAMINE RECEPTOR 2A", "HTR2A"),
    ("SEROTONIN TRANSPORTER", "SLC6A4"),
    ("SERT", "SLC6A4"),
    ("SOLUTE CARRIER FAMILY 6 MEMBER 4", "SLC6A4"),
    ("BRAIN-DERIVED NEUROTROPHIC FACTOR", "BDNF"),
    ("TRYPTOPHAN HYDROXYLASE 2", "TPH2"),
    ("DOPAMINE RECEPTOR D2", "DRD2"),
    ("FK506 BINDING PROTEIN 5", "FKBP5"),
    ("METHYLENETETRAHYDROFOLATE REDUCTASE", "MTHFR"),
    ("G PROTEIN BETA 3", "GNB3"),
    ("CATECHOL-O-METHYLTRANSFERASE", "COMT"),
];

const DRUG_ALIASES: &[(&str, &str)] = &[
    ("PROZAC", "Fluoxetine"),
    ("ZOLOFT", "Sertraline"),
    ("CELEXA", "Citalopram"),
    ("LEXAPRO", "Escitalopram"),
    ("EFFEXOR", "Venlafaxine"),
    ("SAVELLA", "Milnacipran"),
    ("REMERON", "Mirtazapine"),
    ("TRINTELLIX", "Vortioxetine"),
];

const PROTEIN_ALIASES: &[(&str, &str)] = &[
    ("IL-6", "IL6"),
    ("IL6", "IL6"),
    ("CRP", "CRP"),
    ("TNF", "TNF"),
    ("TNF-ALPHA", "TNF"),
    // Greek capital alpha, produced by uppercasing "α".
    ("TNF-ΑLPHA", "TNF"),
    ("TNF-Α", "TNF"),
    ("TNFΑ", "TNF"),
    ("ITIH4", "ITIH4"),
    ("CD155", "PVR"),
    ("LIPOCALIN-2", "LCN2"),
    ("LIPOCALIN 2", "LCN2"),
    ("HGF", "HGF"),
    ("LIGHT", "TNFSF14"),
    ("C1QC", "C1QC"),
    ("BDNF", "BDNF"),
];

/// Folds the dash look-alikes users paste from papers (non-breaking hyphen,
/// en dash, minus sign, ...) into ASCII `-` so they hit the same alias key.
fn fold_dashes(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}'
            | '\u{FE63}' | '\u{FF0D}' => '-',
            other => other,
        })
        .collect()
}

fn lookup_key(value: &str) -> String {
    fold_dashes(value).to_uppercase()
}

/// Read-only mapping from an uppercase free-text key to a canonical symbol.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::from_map(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        )
    }

    fn from_map(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (lookup_key(k.trim()), v.trim().to_string()))
                .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                .collect(),
        }
    }

    /// Points every key at the end of its alias chain, so `a -> b, b -> c`
    /// becomes `a -> c, b -> c`. A key mapping to itself ends a chain.
    fn resolve_chains(mut self, section: &str) -> Result<Self, DgitError> {
        let mut resolved = HashMap::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            let mut current = value.clone();
            let mut seen = HashSet::from([key.clone()]);
            while let Some(next) = self.entries.get(&lookup_key(&current)) {
                let next_key = lookup_key(next);
                if next_key == lookup_key(&current) {
                    current = next.clone();
                    break;
                }
                if !seen.insert(lookup_key(&current)) {
                    return Err(DgitError::InvalidArgument(format!(
                        "Alias cycle in {section} section at '{key}'"
                    )));
                }
                current = next.clone();
            }
            resolved.insert(key.clone(), current);
        }
        self.entries = resolved;
        Ok(self)
    }

    fn uppercase_values(mut self) -> Self {
        for value in self.entries.values_mut() {
            *value = value.to_uppercase();
        }
        self
    }

    pub fn get(&self, raw: &str) -> Option<&str> {
        self.entries.get(&lookup_key(raw.trim())).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Canonical value of the longest key occurring anywhere in `text`.
    pub fn find_in(&self, text: &str) -> Option<&str> {
        let haystack = lookup_key(text);
        self.entries
            .iter()
            .filter(|(key, _)| haystack.contains(key.as_str()))
            .max_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
struct AliasFile {
    gene: Option<HashMap<String, String>>,
    protein: Option<HashMap<String, String>>,
    drug: Option<HashMap<String, String>>,
}

/// The three alias tables, built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct AliasTables {
    gene: AliasTable,
    protein: AliasTable,
    drug: AliasTable,
}

impl Default for AliasTables {
    fn default() -> Self {
        Self {
            gene: AliasTable::from_pairs(GENE_ALIASES),
            protein: AliasTable::from_pairs(PROTEIN_ALIASES),
            drug: AliasTable::from_pairs(DRUG_ALIASES),
        }
    }
}

impl AliasTables {
    /// Parses a JSON alias document (`{"gene": {...}, "protein": {...}, "drug": {...}}`).
    ///
    /// Sections present in the document replace the built-in table for that
    /// entity type; absent sections keep the built-in table. Gene and protein
    /// symbols are uppercased and chained aliases are collapsed to their final
    /// symbol, so normalizing a normalized term is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid JSON or an alias cycle within a section.
    pub fn from_json_str(raw: &str) -> Result<Self, DgitError> {
        let file: AliasFile = serde_json::from_str(raw)?;
        let mut tables = Self::default();
        if let Some(gene) = file.gene {
            tables.gene = AliasTable::from_map(gene)
                .uppercase_values()
                .resolve_chains("gene")?;
        }
        if let Some(protein) = file.protein {
            tables.protein = AliasTable::from_map(protein)
                .uppercase_values()
                .resolve_chains("protein")?;
        }
        if let Some(drug) = file.drug {
            tables.drug = AliasTable::from_map(drug).resolve_chains("drug")?;
        }
        Ok(tables)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, DgitError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn table(&self, entity: EntityType) -> &AliasTable {
        match entity {
            EntityType::Gene => &self.gene,
            EntityType::Protein => &self.protein,
            EntityType::Drug => &self.drug,
        }
    }

    /// Resolves a free-text term to the canonical lookup term for `entity`.
    ///
    /// Empty or whitespace-only input yields an empty string.
    pub fn normalize(&self, entity: EntityType, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return String::new();
        }

        let table = self.table(entity);
        match entity {
            EntityType::Gene | EntityType::Protein => table
                .get(trimmed)
                .map(str::to_string)
                .unwrap_or_else(|| trimmed.to_uppercase()),
            EntityType::Drug => table
                .get(trimmed)
                .map(str::to_string)
                .unwrap_or_else(|| crate::utils::text::title_case(trimmed)),
        }
    }

    pub fn normalize_query(&self, entity: EntityType, raw: &str) -> NormalizedQuery {
        NormalizedQuery {
            raw_input: raw.to_string(),
            entity_type: entity,
            canonical_term: self.normalize(entity, raw),
        }
    }
}
