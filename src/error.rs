//! Error types for geoenvo
//!
//! Transport failures never show up here: a source that cannot be reached
//! degrades to an empty payload. These types cover the failures that are
//! worth reporting: bad input geometry, malformed static resources and
//! configuration problems.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum GeoEnvoError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Vocabulary error: {0}")]
    Vocabulary(#[from] VocabularyError),

    #[error("Attribute table error: {0}")]
    AttributeTable(#[from] AttributeTableError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised at the geometry boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Unsupported geometry type '{0}', expected Point or Polygon")]
    UnsupportedType(String),

    #[error("Geometry has no 'type' member")]
    MissingType,

    #[error("Malformed geometry: {0}")]
    Malformed(String),

    #[error("Buffer radius must be a positive number of kilometers, got {0}")]
    InvalidBufferRadius(f64),

    #[error("Grid size must be a positive number, got {0}")]
    InvalidGridSize(f64),

    #[error("Grid of {cells} cells exceeds the sampling limit of {limit}")]
    GridTooDense { cells: usize, limit: usize },
}

/// Errors loading SSSOM crosswalk resources
///
/// A missing crosswalk is not an error; only resources that exist but
/// cannot be read or parsed end up here.
#[derive(Error, Debug)]
pub enum VocabularyError {
    #[error("Failed to read crosswalk {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse crosswalk table {name}: {source}")]
    Table {
        name: String,
        #[source]
        source: csv::Error,
    },

    #[error("Crosswalk table {name} is missing column '{column}'")]
    MissingColumn { name: String, column: String },

    #[error("Failed to parse crosswalk sidecar {name}: {source}")]
    Sidecar {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors loading the terrestrial raster attribute table
#[derive(Error, Debug)]
pub enum AttributeTableError {
    #[error("Failed to read attribute table {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse attribute table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Attribute table has no features")]
    Empty,

    #[error("No attribute table available from {url}")]
    Unavailable { url: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Internal faults of a multi-source resolution
///
/// These never escape `Resolver::resolve`; they are carried alongside an
/// empty envelope in `Resolution::Faulted`.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid input geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Vocabulary mapping failed: {0}")]
    Vocabulary(#[from] VocabularyError),
}

pub type Result<T> = std::result::Result<T, GeoEnvoError>;
