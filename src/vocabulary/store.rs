//! Where crosswalk tables come from

use super::crosswalk::CrosswalkTable;
use crate::error::VocabularyError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Looks up the crosswalk for a `(source, vocabulary)` pair
///
/// `Ok(None)` means no crosswalk exists for the pair, which is not an error.
pub trait CrosswalkStore: Send + Sync {
    fn load(&self, source: &str, vocabulary: &str)
        -> Result<Option<CrosswalkTable>, VocabularyError>;
}

/// File stem shared by a crosswalk's table and sidecar,
/// e.g. `WorldTerrestrialEcosystems-envo.sssom`
pub fn crosswalk_file_stem(source: &str, vocabulary: &str) -> String {
    format!("{}-{}.sssom", source, vocabulary.to_lowercase())
}

// =============================================================================
// Directory
// =============================================================================

/// Crosswalks stored as `{dir}/{source}-{vocabulary}.sssom.{tsv,yml}`
#[derive(Debug, Clone)]
pub struct DirectoryCrosswalkStore {
    dir: PathBuf,
}

impl DirectoryCrosswalkStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(path: &Path) -> Result<String, VocabularyError> {
        std::fs::read_to_string(path).map_err(|source| VocabularyError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl CrosswalkStore for DirectoryCrosswalkStore {
    fn load(
        &self,
        source: &str,
        vocabulary: &str,
    ) -> Result<Option<CrosswalkTable>, VocabularyError> {
        let stem = crosswalk_file_stem(source, vocabulary);
        let tsv_path = self.dir.join(format!("{}.tsv", stem));
        let yml_path = self.dir.join(format!("{}.yml", stem));

        if !tsv_path.is_file() || !yml_path.is_file() {
            tracing::debug!(path = %tsv_path.display(), "No crosswalk");
            return Ok(None);
        }

        let tsv = Self::read(&tsv_path)?;
        let sidecar = Self::read(&yml_path)?;
        CrosswalkTable::parse(&stem, &tsv, &sidecar).map(Some)
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Tables registered programmatically
#[derive(Debug, Clone, Default)]
pub struct InMemoryCrosswalkStore {
    tables: HashMap<String, CrosswalkTable>,
}

impl InMemoryCrosswalkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, source: &str, vocabulary: &str, table: CrosswalkTable) -> Self {
        self.tables
            .insert(crosswalk_file_stem(source, vocabulary), table);
        self
    }
}

impl CrosswalkStore for InMemoryCrosswalkStore {
    fn load(
        &self,
        source: &str,
        vocabulary: &str,
    ) -> Result<Option<CrosswalkTable>, VocabularyError> {
        Ok(self
            .tables
            .get(&crosswalk_file_stem(source, vocabulary))
            .cloned())
    }
}
