//! geoenvo - environmental context for geometries
//!
//! Resolves a GeoJSON Point or Polygon (optionally with Z, read as depth)
//! into environmental classifications from three remote services and
//! returns them in one GeoJSON Feature envelope.
//!
//! ## Pipeline
//! GeoJSON -> Geometry -> sources (concurrently) -> records -> envelope
//! -> vocabulary terms (optional)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geoenvo::{build_resolver, GeoEnvoConfig, ReqwestTransport};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = GeoEnvoConfig::default();
//! let transport = Arc::new(ReqwestTransport::new(
//!     std::time::Duration::from_secs(config.http.timeout_secs),
//!     &config.http.user_agent,
//! )?);
//! let resolver = build_resolver(&config, transport)?;
//!
//! let geometry = json!({"type": "Point", "coordinates": [-122.76, 37.774, -20.0]});
//! let envelope = resolver
//!     .resolve(&geometry, &config.resolve_options().with_identifier("site-1"))
//!     .await
//!     .into_envelope();
//! println!("{}", envelope.to_json_string_pretty()?);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// GeoJSON boundary and spatial transforms
pub mod geometry;

// Canonical records and the response envelope
pub mod response;

// Classification services
pub mod sources;

// SSSOM crosswalks
pub mod vocabulary;

// Multi-source resolution
pub mod aggregate;

pub mod config;
pub mod schema_org;

pub use aggregate::{compile, Resolution, ResolveOptions, Resolver};
pub use config::{build_resolver, ConfigLoader, GeoEnvoConfig, SourceConfig};
pub use error::{
    AttributeTableError, ConfigError, GeoEnvoError, GeometryError, ResolveError, Result,
    VocabularyError,
};
pub use geometry::{BufferProjection, Geometry, Position};
pub use response::{
    EnvironmentProperties, EnvironmentRecord, MappedTerm, Provenance, ResponseEnvelope,
};
pub use sources::{
    CannedTransport, EcologicalCoastalUnits, EcologicalMarineUnits, EnvironmentSource,
    ReqwestTransport, ResolveContext, SourceTransport, WorldTerrestrialEcosystems,
};
pub use vocabulary::VocabularyMapper;
