//! Identified class codes → canonical records

use super::attribute_table::TerrestrialClass;
use super::{WorldTerrestrialEcosystems, SOURCE_NAME};
use crate::response::{EnvironmentProperties, EnvironmentRecord};
use crate::sources::{new_record, unique_serialized, SourceNormalizer};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Value the service reports outside the raster's coverage (e.g. open ocean)
pub const NO_DATA: &str = "NoData";

/// Image service `identify` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentifyResponse {
    #[serde(default)]
    pub properties: Option<IdentifyProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentifyProperties {
    #[serde(rename = "Values", default)]
    pub values: Vec<JsonValue>,
}

impl IdentifyResponse {
    pub fn into_values(self) -> Vec<JsonValue> {
        self.properties.map(|p| p.values).unwrap_or_default()
    }
}

/// Identified values flattened across every queried point
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifiedValues {
    pub values: Vec<JsonValue>,
}

/// One distinct terrestrial classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerrestrialDescriptor {
    pub temperature: Option<String>,
    pub moisture: Option<String>,
    pub land_cover: Option<String>,
    pub land_form: Option<String>,
    pub climate: Option<String>,
    pub ecosystem: Option<String>,
}

impl From<&TerrestrialClass> for TerrestrialDescriptor {
    fn from(class: &TerrestrialClass) -> Self {
        Self {
            temperature: class.temperature.clone(),
            moisture: class.moisture.clone(),
            land_cover: class.land_cover.clone(),
            land_form: class.land_form.clone(),
            climate: class.climate.clone(),
            ecosystem: class.class_name.clone(),
        }
    }
}

impl TerrestrialDescriptor {
    pub fn to_properties(&self) -> EnvironmentProperties {
        let mut properties = EnvironmentProperties::new();
        let fields = [
            ("temperature", &self.temperature),
            ("moisture", &self.moisture),
            ("landCover", &self.land_cover),
            ("landForm", &self.land_form),
            ("climate", &self.climate),
            ("ecosystem", &self.ecosystem),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                properties.insert(key, value.trim());
            }
        }
        properties
    }
}

fn is_no_data(value: &JsonValue) -> bool {
    value.as_str().is_some_and(|s| s.trim() == NO_DATA)
}

/// Integer class code from a string or numeric value
pub fn parse_code(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        JsonValue::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

impl SourceNormalizer for WorldTerrestrialEcosystems {
    type Raw = IdentifiedValues;
    type Descriptor = TerrestrialDescriptor;

    fn has_environment(&self, raw: &IdentifiedValues) -> bool {
        raw.values.iter().any(|v| !v.is_null() && !is_no_data(v))
    }

    fn unique_environment(&self, raw: &IdentifiedValues) -> Vec<TerrestrialDescriptor> {
        let Some(table) = self.attribute_table() else {
            tracing::warn!(source = SOURCE_NAME, "No attribute table loaded, codes skipped");
            return Vec::new();
        };
        let descriptors = raw
            .values
            .iter()
            .filter(|v| !v.is_null() && !is_no_data(v))
            .filter_map(|value| {
                let class = parse_code(value).and_then(|code| table.get(code));
                if class.is_none() {
                    tracing::warn!(source = SOURCE_NAME, %value, "Unknown class code, skipped");
                }
                class
            })
            .map(TerrestrialDescriptor::from);
        unique_serialized(descriptors)
    }

    fn to_records(&self, descriptors: &[TerrestrialDescriptor]) -> Vec<EnvironmentRecord> {
        descriptors
            .iter()
            .map(|d| new_record(self, d.to_properties()))
            .collect()
    }
}
