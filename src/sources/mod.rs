//! Environmental classification sources
//!
//! Each source wraps one remote classification service and turns its
//! response into canonical [`EnvironmentRecord`]s. Sources share two
//! contracts:
//!
//! - [`EnvironmentSource`]: the object-safe capability the resolver holds a
//!   registry of
//! - [`SourceNormalizer`]: the per-source pipeline from a typed raw payload
//!   to records (presence check, dedup, record construction)
//!
//! | Source                     | Geometry handling                         |
//! |----------------------------|-------------------------------------------|
//! | Ecological Coastal Units   | points buffered into a bounding polygon   |
//! | Ecological Marine Units    | depth (Z) matched against water layers    |
//! | World Terrestrial Ecosystems | polygons optionally sampled into points |

pub mod ecological_coastal_units;
pub mod ecological_marine_units;
pub mod transport;
pub mod world_terrestrial_ecosystems;

pub use ecological_coastal_units::EcologicalCoastalUnits;
pub use ecological_marine_units::EcologicalMarineUnits;
pub use transport::{CannedTransport, ReqwestTransport, SourceRequest, SourceTransport};
pub use world_terrestrial_ecosystems::WorldTerrestrialEcosystems;

use crate::geometry::Geometry;
use crate::response::{EnvironmentProperties, EnvironmentRecord, Provenance};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

/// Per-call resolution context
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveContext {
    /// Calls still pending at this instant degrade to an empty payload
    pub deadline: Option<Instant>,
}

impl ResolveContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deadline `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// A remote classification service
///
/// `resolve` never fails: no data, an unreachable service and an
/// unparseable payload all yield an empty list.
#[async_trait]
pub trait EnvironmentSource: Send + Sync {
    /// Source name recorded in provenance, e.g. "EcologicalMarineUnits"
    fn source_name(&self) -> &'static str;

    /// Dataset identifier (DOI) recorded in provenance
    fn identifier(&self) -> &'static str;

    async fn resolve(&self, geometry: &Geometry, ctx: &ResolveContext) -> Vec<EnvironmentRecord>;
}

/// Raw payload → canonical records
pub trait SourceNormalizer {
    /// Typed response payload
    type Raw;
    /// One distinct classification found in the payload
    type Descriptor;

    fn has_environment(&self, raw: &Self::Raw) -> bool;

    /// Distinct descriptors in first-occurrence order
    fn unique_environment(&self, raw: &Self::Raw) -> Vec<Self::Descriptor>;

    fn to_records(&self, descriptors: &[Self::Descriptor]) -> Vec<EnvironmentRecord>;

    /// The whole pipeline
    fn normalize(&self, raw: &Self::Raw) -> Vec<EnvironmentRecord> {
        if !self.has_environment(raw) {
            return Vec::new();
        }
        let descriptors = self.unique_environment(raw);
        self.to_records(&descriptors)
    }
}

/// Build a record for a source from canonical properties
pub(crate) fn new_record(
    source: &dyn EnvironmentSource,
    properties: EnvironmentProperties,
) -> EnvironmentRecord {
    EnvironmentRecord::new(
        Provenance {
            identifier: source.identifier().to_string(),
            name: source.source_name().to_string(),
        },
        properties,
    )
}

/// Issue a request, degrading to the empty payload once the deadline passes
pub(crate) async fn fetch(
    transport: &dyn SourceTransport,
    request: &SourceRequest,
    ctx: &ResolveContext,
) -> JsonValue {
    match ctx.deadline {
        None => transport.get_json(request).await,
        Some(deadline) => {
            match tokio::time::timeout_at(deadline, transport.get_json(request)).await {
                Ok(value) => value,
                Err(_) => {
                    tracing::warn!(source = request.source, "Deadline elapsed before response");
                    transport::empty_payload()
                }
            }
        }
    }
}

/// Type a raw payload, treating anything unparseable as empty
pub(crate) fn parse_raw<T: DeserializeOwned + Default>(source: &str, value: JsonValue) -> T {
    match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(source, "Unexpected response shape, treating as empty: {}", e);
            T::default()
        }
    }
}

/// Drop later duplicates, comparing by serialized form
pub(crate) fn unique_serialized<T: Serialize>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let key = serde_json::to_string(item).unwrap_or_default();
            seen.insert(key)
        })
        .collect()
}
