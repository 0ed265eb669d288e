//! Multi-source resolution
//!
//! The [`Resolver`] validates the caller's geometry, runs every configured
//! source concurrently, flattens their records in configuration order and
//! compiles them into one [`ResponseEnvelope`]. Whatever goes wrong, the
//! caller gets a valid envelope back: faults are reported alongside it in
//! [`Resolution::Faulted`].

use crate::error::ResolveError;
use crate::geometry::Geometry;
use crate::response::{EnvironmentRecord, ResponseEnvelope};
use crate::sources::{EnvironmentSource, ResolveContext};
use crate::vocabulary::VocabularyMapper;
use futures::future::join_all;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

/// Assemble records into an envelope around the caller's geometry
///
/// Records keep their given order; nothing is deduplicated across sources.
pub fn compile(
    geometry: &JsonValue,
    records: Vec<EnvironmentRecord>,
    identifier: Option<String>,
    description: Option<String>,
) -> ResponseEnvelope {
    ResponseEnvelope {
        identifier,
        description,
        geometry: geometry.clone(),
        environment: records,
    }
}

/// Per-call options for [`Resolver::resolve`]
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub identifier: Option<String>,
    pub description: Option<String>,
    /// Vocabulary to map properties into; `None` skips mapping
    pub vocabulary: Option<String>,
    pub context: ResolveContext,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: impl Into<String>) -> Self {
        self.vocabulary = Some(vocabulary.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.context = ResolveContext::with_timeout(timeout);
        self
    }
}

/// Outcome of a resolution; both arms carry a valid envelope
#[derive(Debug)]
pub enum Resolution {
    Resolved(ResponseEnvelope),
    /// Resolution failed; the envelope echoes the input with no environments
    Faulted {
        envelope: ResponseEnvelope,
        cause: ResolveError,
    },
}

impl Resolution {
    pub fn envelope(&self) -> &ResponseEnvelope {
        match self {
            Resolution::Resolved(envelope) | Resolution::Faulted { envelope, .. } => envelope,
        }
    }

    pub fn into_envelope(self) -> ResponseEnvelope {
        match self {
            Resolution::Resolved(envelope) | Resolution::Faulted { envelope, .. } => envelope,
        }
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self, Resolution::Faulted { .. })
    }

    pub fn cause(&self) -> Option<&ResolveError> {
        match self {
            Resolution::Resolved(_) => None,
            Resolution::Faulted { cause, .. } => Some(cause),
        }
    }
}

/// Resolves geometries against a registry of sources
pub struct Resolver {
    sources: Vec<Arc<dyn EnvironmentSource>>,
    mapper: Option<VocabularyMapper>,
}

impl Resolver {
    /// Resolver over `sources`; vocabulary mapping needs a mapper as well
    pub fn new(sources: Vec<Arc<dyn EnvironmentSource>>) -> Self {
        Self {
            sources,
            mapper: None,
        }
    }

    pub fn with_vocabulary_mapper(mut self, mapper: VocabularyMapper) -> Self {
        self.mapper = Some(mapper);
        self
    }

    pub fn has_vocabulary_mapper(&self) -> bool {
        self.mapper.is_some()
    }

    pub fn sources(&self) -> &[Arc<dyn EnvironmentSource>] {
        &self.sources
    }

    /// Resolve a GeoJSON geometry into an envelope
    pub async fn resolve(&self, geometry: &JsonValue, options: &ResolveOptions) -> Resolution {
        match self.try_resolve(geometry, options).await {
            Ok(envelope) => Resolution::Resolved(envelope),
            Err(cause) => {
                tracing::error!(
                    identifier = options.identifier.as_deref().unwrap_or(""),
                    "Resolution failed: {}",
                    cause
                );
                Resolution::Faulted {
                    envelope: compile(
                        geometry,
                        Vec::new(),
                        options.identifier.clone(),
                        options.description.clone(),
                    ),
                    cause,
                }
            }
        }
    }

    async fn try_resolve(
        &self,
        geometry: &JsonValue,
        options: &ResolveOptions,
    ) -> Result<ResponseEnvelope, ResolveError> {
        let parsed = Geometry::from_geojson(geometry)?;

        let results = join_all(
            self.sources
                .iter()
                .map(|source| source.resolve(&parsed, &options.context)),
        )
        .await;

        for (source, records) in self.sources.iter().zip(&results) {
            tracing::debug!(source = source.source_name(), records = records.len(), "Source done");
        }

        let mut envelope = compile(
            geometry,
            results.into_iter().flatten().collect(),
            options.identifier.clone(),
            options.description.clone(),
        );

        match (options.vocabulary.as_deref(), &self.mapper) {
            (Some(vocabulary), Some(mapper)) => {
                mapper.apply(&mut envelope, vocabulary)?;
            }
            (Some(vocabulary), None) => {
                tracing::warn!(vocabulary, "No crosswalks configured, terms not mapped");
            }
            (None, _) => {}
        }

        Ok(envelope)
    }
}
