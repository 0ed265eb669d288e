//! Ecological Marine Units response types
//!
//! The feature service answers in Esri JSON. `OceanName` and `Name_2018` are
//! coded-value fields: features carry codes, and the code → name tables come
//! back with the response under `fields[].domain.codedValues`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarineQueryResponse {
    #[serde(default)]
    pub fields: Vec<MarineField>,
    #[serde(default)]
    pub features: Vec<MarineFeature>,
}

impl MarineQueryResponse {
    /// Coded values for a field, if the field has a coded-value domain
    pub fn domain(&self, field: &str) -> Option<&[CodedValue]> {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .and_then(|f| f.domain.as_ref())
            .map(|d| d.coded_values.as_slice())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarineField {
    pub name: String,
    #[serde(default)]
    pub domain: Option<FieldDomain>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldDomain {
    #[serde(rename = "codedValues", default)]
    pub coded_values: Vec<CodedValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodedValue {
    pub name: String,
    /// Integer in practice; kept loose since domains may use string codes
    pub code: JsonValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarineFeature {
    #[serde(default)]
    pub attributes: MarineAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarineAttributes {
    /// Upper bound of the water layer (metres, negative below sea level)
    #[serde(rename = "UnitTop", default)]
    pub unit_top: Option<f64>,
    /// Lower bound of the water layer
    #[serde(rename = "UnitBottom", default)]
    pub unit_bottom: Option<f64>,
    #[serde(rename = "OceanName", default)]
    pub ocean_name: Option<JsonValue>,
    #[serde(rename = "Name_2018", default)]
    pub name_2018: Option<JsonValue>,
}

/// A feature with its codes translated to names
#[derive(Debug, Clone, PartialEq)]
pub struct MarineLayer {
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub ocean_name: String,
    pub name_2018: String,
}

/// One distinct marine classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarineDescriptor {
    #[serde(rename = "OceanName")]
    pub ocean_name: String,
    #[serde(rename = "Name_2018")]
    pub name_2018: String,
}

/// A query payload paired with the depth interval it is matched against
#[derive(Debug, Clone, Default)]
pub struct MarineQuery {
    pub response: MarineQueryResponse,
    pub depth_range: Option<(f64, f64)>,
}
