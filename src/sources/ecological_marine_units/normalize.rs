//! Marine layers → canonical records

use super::types::{CodedValue, MarineDescriptor, MarineLayer, MarineQuery, MarineQueryResponse};
use super::EcologicalMarineUnits;
use crate::response::{EnvironmentProperties, EnvironmentRecord};
use crate::sources::{new_record, unique_serialized, SourceNormalizer};
use serde_json::Value as JsonValue;

/// Canonical property keys: the ocean name, then the seven `Name_2018` facets
pub const MARINE_FACETS: [&str; 8] = [
    "oceanName",
    "depth",
    "temperature",
    "salinity",
    "dissolvedOxygen",
    "nitrate",
    "phosphate",
    "silicate",
];

pub const NOT_AN_OCEAN: &str = "Not an ocean";
pub const NOT_AVAILABLE: &str = "n/a";

/// Comparable form of a coded value (`1` and `1.0` are the same code)
fn code_key(code: &JsonValue) -> Option<String> {
    match code {
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => n.as_f64().map(|f| {
                if f.fract() == 0.0 {
                    format!("{}", f as i64)
                } else {
                    f.to_string()
                }
            }),
        },
        JsonValue::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn lookup<'a>(domain: Option<&'a [CodedValue]>, code: &JsonValue) -> Option<&'a str> {
    let key = code_key(code)?;
    domain?
        .iter()
        .find(|cv| code_key(&cv.code).as_deref() == Some(key.as_str()))
        .map(|cv| cv.name.as_str())
}

/// Replace `OceanName` and `Name_2018` codes with their names
///
/// A null `OceanName` (a bay or lake) becomes "Not an ocean"; any other code
/// missing from its domain becomes "n/a".
pub fn translate_codes(response: &MarineQueryResponse) -> Vec<MarineLayer> {
    let ocean_domain = response.domain("OceanName");
    let name_domain = response.domain("Name_2018");

    response
        .features
        .iter()
        .map(|feature| {
            let attrs = &feature.attributes;
            let ocean_name = match attrs.ocean_name.as_ref() {
                None | Some(JsonValue::Null) => NOT_AN_OCEAN.to_string(),
                Some(code) => lookup(ocean_domain, code)
                    .unwrap_or(NOT_AVAILABLE)
                    .to_string(),
            };
            let name_2018 = attrs
                .name_2018
                .as_ref()
                .and_then(|code| lookup(name_domain, code))
                .unwrap_or(NOT_AVAILABLE)
                .to_string();
            MarineLayer {
                top: attrs.unit_top,
                bottom: attrs.unit_bottom,
                ocean_name,
                name_2018,
            }
        })
        .collect()
}

/// Whether a layer `[bottom, top]` overlaps the depth interval (inclusive)
///
/// Without a depth every layer matches. With a depth, layers missing either
/// bound never match.
pub fn matches_depth(layer: &MarineLayer, depth_range: Option<(f64, f64)>) -> bool {
    let Some((dmin, dmax)) = depth_range else {
        return true;
    };
    match (layer.bottom, layer.top) {
        (Some(bottom), Some(top)) => bottom <= dmax && dmin <= top,
        _ => false,
    }
}

/// Build canonical properties for one descriptor
pub fn marine_properties(descriptor: &MarineDescriptor) -> EnvironmentProperties {
    let mut values: Vec<&str> = Vec::with_capacity(MARINE_FACETS.len());
    values.push(descriptor.ocean_name.trim());
    values.extend(descriptor.name_2018.split(',').map(str::trim));

    let values: Vec<&str> = (0..MARINE_FACETS.len())
        .map(|i| match values.get(i) {
            Some(v) if !v.is_empty() => *v,
            _ => NOT_AVAILABLE,
        })
        .collect();

    let mut properties: EnvironmentProperties =
        MARINE_FACETS.iter().copied().zip(values.iter().copied()).collect();
    properties.insert("ecosystem", values.join(", "));
    properties
}

impl SourceNormalizer for EcologicalMarineUnits {
    type Raw = MarineQuery;
    type Descriptor = MarineDescriptor;

    fn has_environment(&self, raw: &MarineQuery) -> bool {
        !raw.response.features.is_empty()
    }

    fn unique_environment(&self, raw: &MarineQuery) -> Vec<MarineDescriptor> {
        unique_serialized(
            translate_codes(&raw.response)
                .into_iter()
                .filter(|layer| matches_depth(layer, raw.depth_range))
                .map(|layer| MarineDescriptor {
                    ocean_name: layer.ocean_name,
                    name_2018: layer.name_2018,
                }),
        )
    }

    fn to_records(&self, descriptors: &[MarineDescriptor]) -> Vec<EnvironmentRecord> {
        descriptors
            .iter()
            .map(|d| new_record(self, marine_properties(d)))
            .collect()
    }
}
