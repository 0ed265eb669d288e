//! SSSOM crosswalk tables
//!
//! A crosswalk is a pair of files: the mapping table (TSV, one row per
//! mapping, `#`-prefixed metadata lines allowed before the header) and a YAML
//! sidecar whose `curie_map` expands the prefixes used in `object_id`.

use crate::error::VocabularyError;
use crate::response::MappedTerm;
use serde::Deserialize;
use std::collections::HashMap;

/// Object id marking a value that deliberately has no mapping
pub const NO_MAPPING: &str = "sssom:NoMapping";

const SUBJECT_LABEL: &str = "subject_label";
const OBJECT_LABEL: &str = "object_label";
const OBJECT_ID: &str = "object_id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrosswalkRow {
    pub subject_label: String,
    pub object_label: String,
    pub object_id: String,
}

#[derive(Debug, Deserialize)]
struct SssomMetadata {
    #[serde(default)]
    curie_map: HashMap<String, String>,
}

/// Mappings from one source's labels into one vocabulary
#[derive(Debug, Clone, Default)]
pub struct CrosswalkTable {
    name: String,
    rows: Vec<CrosswalkRow>,
    curie_map: HashMap<String, String>,
}

impl CrosswalkTable {
    pub fn new(
        name: impl Into<String>,
        rows: Vec<CrosswalkRow>,
        curie_map: HashMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            rows,
            curie_map,
        }
    }

    /// Parse a table from its TSV and YAML sidecar contents
    ///
    /// Columns are located by header name, so extra or reordered columns
    /// are fine.
    pub fn parse(name: &str, tsv: &str, sidecar: &str) -> Result<Self, VocabularyError> {
        let metadata: SssomMetadata =
            serde_yaml::from_str(sidecar).map_err(|source| VocabularyError::Sidecar {
                name: name.to_string(),
                source,
            })?;

        let table_error = |source| VocabularyError::Table {
            name: name.to_string(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .comment(Some(b'#'))
            .flexible(true)
            .from_reader(tsv.as_bytes());

        let headers = reader.headers().map_err(table_error)?.clone();
        let column = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| VocabularyError::MissingColumn {
                    name: name.to_string(),
                    column: column.to_string(),
                })
        };
        let subject_col = column(SUBJECT_LABEL)?;
        let label_col = column(OBJECT_LABEL)?;
        let id_col = column(OBJECT_ID)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(table_error)?;
            let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();
            rows.push(CrosswalkRow {
                subject_label: field(subject_col),
                object_label: field(label_col),
                object_id: field(id_col),
            });
        }

        Ok(Self::new(name, rows, metadata.curie_map))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[CrosswalkRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row whose subject label matches, ignoring case
    pub fn lookup(&self, value: &str) -> Option<&CrosswalkRow> {
        let value = value.trim().to_lowercase();
        self.rows
            .iter()
            .find(|row| row.subject_label.to_lowercase() == value)
    }

    /// Expand a CURIE against the table's `curie_map`
    pub fn resolve_curie(&self, curie: &str) -> Option<String> {
        let (prefix, local) = curie.split_once(':')?;
        self.curie_map
            .get(prefix)
            .map(|base| format!("{}{}", base, local))
    }

    /// The vocabulary term a value maps to, if any
    ///
    /// Rows marked `sssom:NoMapping`, rows without an object label and ids
    /// with an unknown prefix yield nothing.
    pub fn term_for(&self, value: &str) -> Option<MappedTerm> {
        let row = self.lookup(value)?;
        if row.object_id.eq_ignore_ascii_case(NO_MAPPING) || row.object_label.is_empty() {
            return None;
        }
        let uri = self.resolve_curie(&row.object_id)?;
        Some(MappedTerm {
            label: row.object_label.clone(),
            uri,
        })
    }
}
