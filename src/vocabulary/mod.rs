//! Vocabulary mapping
//!
//! Annotates environment records with controlled-vocabulary terms (ENVO by
//! default) using SSSOM crosswalks from each source's labels. No crosswalks
//! ship with the crate; point a [`DirectoryCrosswalkStore`] at the published
//! files or register tables in an [`InMemoryCrosswalkStore`].

mod crosswalk;
mod store;

pub use crosswalk::{CrosswalkRow, CrosswalkTable, NO_MAPPING};
pub use store::{
    crosswalk_file_stem, CrosswalkStore, DirectoryCrosswalkStore, InMemoryCrosswalkStore,
};

use crate::error::VocabularyError;
use crate::response::ResponseEnvelope;
use std::collections::HashMap;
use std::sync::Arc;

/// Vocabulary used when none is configured
pub const DEFAULT_VOCABULARY: &str = "ENVO";

/// Maps record properties to vocabulary terms
#[derive(Clone)]
pub struct VocabularyMapper {
    store: Arc<dyn CrosswalkStore>,
}

impl VocabularyMapper {
    pub fn new(store: Arc<dyn CrosswalkStore>) -> Self {
        Self { store }
    }

    /// Mapper over `{dir}/{source}-{vocabulary}.sssom.{tsv,yml}` files
    pub fn from_dir(dir: impl Into<std::path::PathBuf>) -> Self {
        Self::new(Arc::new(DirectoryCrosswalkStore::new(dir)))
    }

    /// Append a `{label, uri}` term to each record for every property value
    /// the record's source crosswalk maps
    ///
    /// Records whose source has no crosswalk for `vocabulary` are left
    /// untouched. Each table is loaded at most once per call.
    pub fn apply<'a>(
        &self,
        envelope: &'a mut ResponseEnvelope,
        vocabulary: &str,
    ) -> Result<&'a mut ResponseEnvelope, VocabularyError> {
        let mut tables: HashMap<String, Option<CrosswalkTable>> = HashMap::new();

        for record in envelope.environment.iter_mut() {
            let source = record.provenance.name.clone();
            if !tables.contains_key(&source) {
                let table = self.store.load(&source, vocabulary)?;
                if table.is_none() {
                    tracing::debug!(source = %source, vocabulary, "No crosswalk, skipping");
                }
                tables.insert(source.clone(), table);
            }
            let Some(Some(table)) = tables.get(&source) else {
                continue;
            };

            let terms: Vec<_> = record
                .properties
                .iter()
                .filter_map(|(_, value)| table.term_for(value))
                .collect();
            record.mapped_terms.extend(terms);
        }

        Ok(envelope)
    }
}
