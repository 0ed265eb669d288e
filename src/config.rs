//! Configuration
//!
//! YAML configuration selecting the sources to resolve against and how each
//! behaves. Example:
//!
//! ```yaml
//! http:
//!   timeout_secs: 10
//! deadline_secs: 60
//! sources:
//!   - source: ecological_coastal_units
//!     buffer_km: 0.5
//!   - source: ecological_marine_units
//!   - source: world_terrestrial_ecosystems
//!     grid_size: 0.5
//!     max_samples: 200
//!     attribute_table: /var/lib/geoenvo/wte_attribute_table.json
//! vocabulary:
//!   name: ENVO
//!   crosswalk_dir: /var/lib/geoenvo/sssom
//! ```
//!
//! Without `attribute_table` the terrestrial table is downloaded from the
//! service on first use. Without `crosswalk_dir` no vocabulary mapping is
//! done.

use crate::aggregate::{ResolveOptions, Resolver};
use crate::error::{ConfigError, GeoEnvoError};
use crate::geometry::BufferProjection;
use crate::sources::transport::{ReqwestTransport, DEFAULT_USER_AGENT};
use crate::sources::world_terrestrial_ecosystems::{
    AttributeTable, DEFAULT_CONCURRENCY, DEFAULT_MAX_SAMPLES,
};
use crate::sources::{
    EcologicalCoastalUnits, EcologicalMarineUnits, EnvironmentSource, SourceTransport,
    WorldTerrestrialEcosystems,
};
use crate::vocabulary::{DirectoryCrosswalkStore, VocabularyMapper, DEFAULT_VOCABULARY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "GEOENVO_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn build_transport(&self) -> anyhow::Result<ReqwestTransport> {
        ReqwestTransport::new(Duration::from_secs(self.timeout_secs), &self.user_agent)
    }
}

fn default_max_samples() -> usize {
    DEFAULT_MAX_SAMPLES
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// One configured source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceConfig {
    EcologicalCoastalUnits {
        /// Buffer (km) applied to points; without it points are not queried
        #[serde(default)]
        buffer_km: Option<f64>,
        #[serde(default)]
        projection: BufferProjection,
    },
    EcologicalMarineUnits,
    WorldTerrestrialEcosystems {
        /// Polygon sampling grid size; without it polygons are queried as-is
        #[serde(default)]
        grid_size: Option<f64>,
        #[serde(default = "default_max_samples")]
        max_samples: usize,
        #[serde(default = "default_concurrency")]
        concurrency: usize,
        /// Attribute table file; downloaded from the service when unset
        #[serde(default)]
        attribute_table: Option<PathBuf>,
    },
}

impl SourceConfig {
    pub fn name(&self) -> &'static str {
        match self {
            SourceConfig::EcologicalCoastalUnits { .. } => "ecological_coastal_units",
            SourceConfig::EcologicalMarineUnits => "ecological_marine_units",
            SourceConfig::WorldTerrestrialEcosystems { .. } => "world_terrestrial_ecosystems",
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = |value: Option<f64>, field: &str| match value {
            Some(v) if !v.is_finite() || v <= 0.0 => Err(ConfigError::Invalid(format!(
                "{}.{} must be a positive number, got {}",
                self.name(),
                field,
                v
            ))),
            _ => Ok(()),
        };
        match self {
            SourceConfig::EcologicalCoastalUnits { buffer_km, .. } => {
                positive(*buffer_km, "buffer_km")
            }
            SourceConfig::EcologicalMarineUnits => Ok(()),
            SourceConfig::WorldTerrestrialEcosystems {
                grid_size,
                max_samples,
                concurrency,
                ..
            } => {
                positive(*grid_size, "grid_size")?;
                if *max_samples == 0 || *concurrency == 0 {
                    return Err(ConfigError::Invalid(format!(
                        "{}: max_samples and concurrency must be at least 1",
                        self.name()
                    )));
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyConfig {
    #[serde(default = "default_vocabulary")]
    pub name: String,
    /// Directory of `{source}-{vocabulary}.sssom.{tsv,yml}` files; mapping
    /// is skipped when unset
    #[serde(default)]
    pub crosswalk_dir: Option<PathBuf>,
}

fn default_vocabulary() -> String {
    DEFAULT_VOCABULARY.to_string()
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            name: default_vocabulary(),
            crosswalk_dir: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoEnvoConfig {
    pub http: HttpConfig,
    /// Overall budget for one resolution, in seconds
    pub deadline_secs: Option<u64>,
    pub sources: Vec<SourceConfig>,
    /// `null` disables vocabulary mapping
    pub vocabulary: Option<VocabularyConfig>,
}

impl Default for GeoEnvoConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            deadline_secs: None,
            sources: vec![
                SourceConfig::EcologicalCoastalUnits {
                    buffer_km: None,
                    projection: BufferProjection::default(),
                },
                SourceConfig::EcologicalMarineUnits,
                SourceConfig::WorldTerrestrialEcosystems {
                    grid_size: None,
                    max_samples: DEFAULT_MAX_SAMPLES,
                    concurrency: DEFAULT_CONCURRENCY,
                    attribute_table: None,
                },
            ],
            vocabulary: Some(VocabularyConfig::default()),
        }
    }
}

impl GeoEnvoConfig {
    pub fn from_yaml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: GeoEnvoConfig =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("no sources configured".to_string()));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.deadline_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "deadline_secs must be at least 1".to_string(),
            ));
        }
        self.sources.iter().try_for_each(SourceConfig::validate)
    }

    /// Options for one resolution; the deadline starts now
    pub fn resolve_options(&self) -> ResolveOptions {
        let mut options = ResolveOptions::new();
        if let Some(vocabulary) = &self.vocabulary {
            options = options.with_vocabulary(vocabulary.name.clone());
        }
        if let Some(secs) = self.deadline_secs {
            options = options.with_timeout(Duration::from_secs(secs));
        }
        options
    }
}

/// Loads `GeoEnvoConfig` from a YAML file
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Loader for the file named by `GEOENVO_CONFIG`, if set
    pub fn from_env() -> Self {
        Self {
            path: std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load and validate; without a path the defaults are used
    pub fn load(&self) -> Result<GeoEnvoConfig, ConfigError> {
        let Some(path) = &self.path else {
            info!("No configuration file, using defaults");
            return Ok(GeoEnvoConfig::default());
        };

        info!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = GeoEnvoConfig::from_yaml_str(&content, path)?;

        info!(
            "Loaded configuration with {} sources: {}",
            config.sources.len(),
            config
                .sources
                .iter()
                .map(SourceConfig::name)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(config)
    }
}

/// Build a resolver for a configuration over the given transport
pub fn build_resolver(
    config: &GeoEnvoConfig,
    transport: Arc<dyn SourceTransport>,
) -> Result<Resolver, GeoEnvoError> {
    config.validate()?;

    let mut sources: Vec<Arc<dyn EnvironmentSource>> = Vec::with_capacity(config.sources.len());
    for source in &config.sources {
        let built: Arc<dyn EnvironmentSource> = match source {
            SourceConfig::EcologicalCoastalUnits {
                buffer_km,
                projection,
            } => {
                let mut ecu =
                    EcologicalCoastalUnits::new(transport.clone()).with_projection(*projection);
                if let Some(km) = buffer_km {
                    ecu = ecu.with_buffer(*km);
                }
                Arc::new(ecu)
            }
            SourceConfig::EcologicalMarineUnits => {
                Arc::new(EcologicalMarineUnits::new(transport.clone()))
            }
            SourceConfig::WorldTerrestrialEcosystems {
                grid_size,
                max_samples,
                concurrency,
                attribute_table,
            } => {
                let mut wte = WorldTerrestrialEcosystems::new(transport.clone())
                    .with_max_samples(*max_samples)
                    .with_concurrency(*concurrency);
                if let Some(path) = attribute_table {
                    let table = AttributeTable::from_path(path)?;
                    info!(path = %path.display(), classes = table.len(), "Loaded attribute table");
                    wte = wte.with_attribute_table(Arc::new(table));
                }
                if let Some(grid_size) = grid_size {
                    wte = wte.with_grid_size(*grid_size);
                }
                Arc::new(wte)
            }
        };
        sources.push(built);
    }

    let mut resolver = Resolver::new(sources);
    match &config.vocabulary {
        Some(VocabularyConfig {
            crosswalk_dir: Some(dir),
            ..
        }) => {
            info!(dir = %dir.display(), "Using crosswalks");
            let store = DirectoryCrosswalkStore::new(dir);
            resolver = resolver.with_vocabulary_mapper(VocabularyMapper::new(Arc::new(store)));
        }
        Some(vocabulary) => {
            tracing::warn!(
                vocabulary = %vocabulary.name,
                "No crosswalk_dir configured, properties will not be mapped"
            );
        }
        None => {}
    }
    Ok(resolver)
}
