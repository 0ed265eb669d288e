//! Canonical environment records and the response envelope
//!
//! The envelope serializes as a GeoJSON Feature:
//!
//! ```json
//! {
//!   "type": "Feature",
//!   "identifier": "5b4edec5-ea5e-471a-8a3c-2c1171d59dee",
//!   "geometry": { "type": "Point", "coordinates": [-72.22, 42.48] },
//!   "properties": {
//!     "description": "Point on land",
//!     "environment": [
//!       {
//!         "type": "Environment",
//!         "dataSource": { "identifier": "https://doi.org/10.5066/P9DO61LP", "name": "WorldTerrestrialEcosystems" },
//!         "dateCreated": "2026-01-01T00:00:00Z",
//!         "properties": { "temperature": "Cool Temperate", "...": "..." },
//!         "mappedProperties": [ { "label": "forest biome", "uri": "http://purl.obolibrary.org/obo/ENVO_01000174" } ]
//!       }
//!     ]
//!   }
//! }
//! ```

use crate::error::GeoEnvoError;
use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;
use std::path::Path;

/// Where a record came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Dataset identifier, usually a DOI
    pub identifier: String,
    /// Source name, also the key into the crosswalk tables
    pub name: String,
}

/// A controlled-vocabulary term attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedTerm {
    pub label: String,
    pub uri: String,
}

/// Insertion-ordered string properties of a record
///
/// Empty values are never stored, so every present value is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentProperties(Vec<(String, String)>);

impl EnvironmentProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing any existing value in place
    ///
    /// Returns false (and stores nothing) when the value is empty.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let value = value.into();
        if value.is_empty() {
            return false;
        }
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Self::new();
        for (k, v) in iter {
            properties.insert(k, v);
        }
        properties
    }
}

impl Serialize for EnvironmentProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EnvironmentProperties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PropertiesVisitor;

        impl<'de> Visitor<'de> for PropertiesVisitor {
            type Value = EnvironmentProperties;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of string properties")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut properties = EnvironmentProperties::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    properties.insert(k, v);
                }
                Ok(properties)
            }
        }

        deserializer.deserialize_map(PropertiesVisitor)
    }
}

fn environment_type() -> String {
    "Environment".to_string()
}

/// The canonical unit of output: one classification from one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    #[serde(rename = "type", default = "environment_type")]
    pub record_type: String,
    #[serde(rename = "dataSource")]
    pub provenance: Provenance,
    #[serde(rename = "dateCreated")]
    pub created_at: DateTime<Utc>,
    pub properties: EnvironmentProperties,
    #[serde(rename = "mappedProperties", default)]
    pub mapped_terms: Vec<MappedTerm>,
}

impl EnvironmentRecord {
    /// A fresh record stamped with the current time
    pub fn new(provenance: Provenance, properties: EnvironmentProperties) -> Self {
        Self {
            record_type: environment_type(),
            provenance,
            created_at: Utc::now(),
            properties,
            mapped_terms: Vec::new(),
        }
    }

    pub fn source_name(&self) -> &str {
        &self.provenance.name
    }
}

/// The result of resolving one geometry against every configured source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "FeatureRepr", try_from = "FeatureRepr")]
pub struct ResponseEnvelope {
    pub identifier: Option<String>,
    pub description: Option<String>,
    /// The caller's geometry, echoed verbatim
    pub geometry: JsonValue,
    pub environment: Vec<EnvironmentRecord>,
}

impl ResponseEnvelope {
    /// An envelope with no environments
    pub fn empty(
        geometry: JsonValue,
        identifier: Option<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            identifier,
            description,
            geometry,
            environment: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<JsonValue, GeoEnvoError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_string_pretty(&self) -> Result<String, GeoEnvoError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the envelope to a JSON file
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), GeoEnvoError> {
        let content = serde_json::to_string(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Read an envelope back from a JSON file
    pub fn read(path: impl AsRef<Path>) -> Result<Self, GeoEnvoError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }
}

// GeoJSON Feature wire shape of the envelope

#[derive(Serialize, Deserialize)]
struct FeatureRepr {
    #[serde(rename = "type")]
    feature_type: String,
    identifier: Option<String>,
    geometry: JsonValue,
    properties: FeatureProperties,
}

#[derive(Serialize, Deserialize)]
struct FeatureProperties {
    description: Option<String>,
    #[serde(default)]
    environment: Vec<EnvironmentRecord>,
}

impl From<ResponseEnvelope> for FeatureRepr {
    fn from(envelope: ResponseEnvelope) -> Self {
        FeatureRepr {
            feature_type: "Feature".to_string(),
            identifier: envelope.identifier,
            geometry: envelope.geometry,
            properties: FeatureProperties {
                description: envelope.description,
                environment: envelope.environment,
            },
        }
    }
}

impl TryFrom<FeatureRepr> for ResponseEnvelope {
    type Error = String;

    fn try_from(repr: FeatureRepr) -> Result<Self, Self::Error> {
        if repr.feature_type != "Feature" {
            return Err(format!("expected a Feature, got '{}'", repr.feature_type));
        }
        Ok(ResponseEnvelope {
            identifier: repr.identifier,
            description: repr.properties.description,
            geometry: repr.geometry,
            environment: repr.properties.environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> EnvironmentRecord {
        let properties: EnvironmentProperties = [
            ("temperature", "Warm Temperate"),
            ("moisture", "Moist"),
            ("ecosystem", "Warm Temperate Moist Forest on Plains"),
        ]
        .into_iter()
        .collect();
        EnvironmentRecord::new(
            Provenance {
                identifier: "https://doi.org/10.5066/P9DO61LP".to_string(),
                name: "WorldTerrestrialEcosystems".to_string(),
            },
            properties,
        )
    }

    #[test]
    fn test_properties_keep_insertion_order() {
        let mut properties = EnvironmentProperties::new();
        properties.insert("slope", "flat");
        properties.insert("sinuosity", "straight");
        properties.insert("erodibility", "low");
        let keys: Vec<&str> = properties.keys().collect();
        assert_eq!(keys, vec!["slope", "sinuosity", "erodibility"]);

        let json = serde_json::to_string(&properties).unwrap();
        assert_eq!(
            json,
            r#"{"slope":"flat","sinuosity":"straight","erodibility":"low"}"#
        );
    }

    #[test]
    fn test_properties_skip_empty_values() {
        let mut properties = EnvironmentProperties::new();
        assert!(!properties.insert("slope", ""));
        assert!(properties.is_empty());
        assert!(properties.insert("slope", "flat"));
        assert!(properties.insert("slope", "steep"));
        assert_eq!(properties.get("slope"), Some("steep"));
        assert_eq!(properties.len(), 1);
    }

    #[test]
    fn test_record_wire_shape() {
        let record = sample_record();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "Environment");
        assert_eq!(value["dataSource"]["name"], "WorldTerrestrialEcosystems");
        assert_eq!(value["properties"]["moisture"], "Moist");
        assert_eq!(value["mappedProperties"], json!([]));
        assert!(value["dateCreated"].is_string());
    }

    #[test]
    fn test_envelope_is_a_geojson_feature() {
        let geometry = json!({"type": "Point", "coordinates": [-72.22, 42.48]});
        let envelope = ResponseEnvelope {
            identifier: Some("abc".to_string()),
            description: Some("Point on land".to_string()),
            geometry: geometry.clone(),
            environment: vec![sample_record()],
        };
        let value = envelope.to_json().unwrap();
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["identifier"], "abc");
        assert_eq!(value["geometry"], geometry);
        assert_eq!(value["properties"]["description"], "Point on land");
        assert_eq!(value["properties"]["environment"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_non_feature() {
        let result: Result<ResponseEnvelope, _> = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "identifier": null,
            "geometry": null,
            "properties": {"description": null, "environment": []}
        }));
        assert!(result.is_err());
    }
}
