//! Coastal segment descriptors → canonical records
//!
//! Every coastal segment carries one composite `CSU_Descriptor` string made
//! of ten comma-separated facets, e.g.
//! `"Sloping, Moderately Sinuous, Less Erodible, Moist Warm Temperate, ..."`.

use super::EcologicalCoastalUnits;
use crate::response::{EnvironmentProperties, EnvironmentRecord};
use crate::sources::{new_record, unique_serialized, SourceNormalizer};
use serde::Deserialize;

/// Canonical property keys, in descriptor order
pub const COASTAL_FACETS: [&str; 10] = [
    "slope",
    "sinuosity",
    "erodibility",
    "temperatureAndMoistureRegime",
    "riverDischarge",
    "waveHeight",
    "tidalRange",
    "marinePhysicalEnvironment",
    "turbidity",
    "chlorophyll",
];

/// GeoJSON (or Esri JSON) feature collection returned by the query endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoastalFeatureCollection {
    #[serde(default)]
    pub features: Vec<CoastalFeature>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoastalFeature {
    #[serde(default)]
    pub properties: Option<CoastalAttributes>,
    #[serde(default)]
    pub attributes: Option<CoastalAttributes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoastalAttributes {
    #[serde(rename = "CSU_Descriptor", default)]
    pub csu_descriptor: Option<String>,
}

impl CoastalFeature {
    pub fn descriptor(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.csu_descriptor.as_deref())
            .or_else(|| {
                self.attributes
                    .as_ref()
                    .and_then(|a| a.csu_descriptor.as_deref())
            })
    }
}

/// Split a composite descriptor onto the ten facets
///
/// Missing or empty tokens leave their facet unset and surplus tokens are
/// ignored. `ecosystem` joins the facets that are present.
pub fn decompose_descriptor(composite: &str) -> EnvironmentProperties {
    let mut properties = EnvironmentProperties::new();
    for (facet, token) in COASTAL_FACETS.iter().zip(composite.split(',')) {
        properties.insert(*facet, token.trim());
    }
    let ecosystem = properties
        .iter()
        .map(|(_, v)| v)
        .collect::<Vec<_>>()
        .join(", ");
    properties.insert("ecosystem", ecosystem);
    properties
}

impl SourceNormalizer for EcologicalCoastalUnits {
    type Raw = CoastalFeatureCollection;
    type Descriptor = String;

    fn has_environment(&self, raw: &CoastalFeatureCollection) -> bool {
        !raw.features.is_empty()
    }

    fn unique_environment(&self, raw: &CoastalFeatureCollection) -> Vec<String> {
        unique_serialized(
            raw.features
                .iter()
                .filter_map(CoastalFeature::descriptor)
                .filter(|d| !d.trim().is_empty())
                .map(str::to_string),
        )
    }

    fn to_records(&self, descriptors: &[String]) -> Vec<EnvironmentRecord> {
        descriptors
            .iter()
            .map(|d| new_record(self, decompose_descriptor(d)))
            .collect()
    }
}
