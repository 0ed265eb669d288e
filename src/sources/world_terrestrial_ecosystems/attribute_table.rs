//! World Terrestrial Ecosystems raster attribute table
//!
//! The image service identifies a location with an integer class code; the
//! raster attribute table maps each code to its temperature, moisture, land
//! cover, landform and climate classes. No copy ships with the crate: the
//! table is read from a file captured with `refresh-attributes`, or
//! downloaded from the service the first time a source needs it.

use super::SOURCE_NAME;
use crate::error::AttributeTableError;
use crate::sources::transport::{empty_payload, SourceRequest, SourceTransport};
use crate::sources::{fetch, ResolveContext};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;

pub const ATTRIBUTE_TABLE_URL: &str =
    "https://landscape12.arcgis.com/arcgis/rest/services/World_Terrestrial_Ecosystems/ImageServer/rasterAttributeTable";

/// One row of the attribute table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrestrialClass {
    #[serde(rename = "Value")]
    pub value: i64,
    #[serde(rename = "Temperatur", default)]
    pub temperature: Option<String>,
    #[serde(rename = "Moisture", default)]
    pub moisture: Option<String>,
    #[serde(rename = "Landcover", default)]
    pub land_cover: Option<String>,
    #[serde(rename = "Landforms", default)]
    pub land_form: Option<String>,
    #[serde(rename = "Climate_Re", default)]
    pub climate: Option<String>,
    #[serde(rename = "ClassName", default)]
    pub class_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RasterAttributeTable {
    #[serde(default)]
    features: Vec<RasterAttributeRow>,
}

#[derive(Debug, Deserialize)]
struct RasterAttributeRow {
    attributes: TerrestrialClass,
}

/// Class code → class attributes
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    classes: HashMap<i64, TerrestrialClass>,
}

impl AttributeTable {
    /// Parse an Esri raster attribute table (`features[].attributes`)
    pub fn from_json_str(content: &str) -> Result<Self, AttributeTableError> {
        let table: RasterAttributeTable = serde_json::from_str(content)?;
        Self::from_rows(table)
    }

    pub fn from_json(value: JsonValue) -> Result<Self, AttributeTableError> {
        let table: RasterAttributeTable = serde_json::from_value(value)?;
        Self::from_rows(table)
    }

    fn from_rows(table: RasterAttributeTable) -> Result<Self, AttributeTableError> {
        if table.features.is_empty() {
            return Err(AttributeTableError::Empty);
        }
        let classes = table
            .features
            .into_iter()
            .map(|row| (row.attributes.value, row.attributes))
            .collect();
        Ok(Self { classes })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AttributeTableError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| AttributeTableError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json_str(&content)
    }

    pub fn get(&self, code: i64) -> Option<&TerrestrialClass> {
        self.classes.get(&code)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

fn attribute_table_request() -> SourceRequest {
    SourceRequest::new(SOURCE_NAME, ATTRIBUTE_TABLE_URL).param("f", "pjson")
}

/// Download and parse the attribute table, within the resolution deadline
pub async fn load_remote_attribute_table(
    transport: &dyn SourceTransport,
    ctx: &ResolveContext,
) -> Result<AttributeTable, AttributeTableError> {
    let payload = fetch(transport, &attribute_table_request(), ctx).await;
    if payload == empty_payload() {
        return Err(AttributeTableError::Unavailable {
            url: ATTRIBUTE_TABLE_URL.to_string(),
        });
    }
    let table = AttributeTable::from_json(payload)?;
    tracing::info!(classes = table.len(), "Loaded terrestrial attribute table from service");
    Ok(table)
}

/// Download the current attribute table from the image service
///
/// The payload is returned as-is after checking that it parses as a
/// non-empty table.
pub async fn fetch_raster_attribute_table(transport: &dyn SourceTransport) -> Result<JsonValue> {
    let payload = transport.get_json(&attribute_table_request()).await;

    if payload.as_object().is_none_or(|o| o.is_empty()) {
        bail!("No attribute table returned from {}", ATTRIBUTE_TABLE_URL);
    }
    let table = AttributeTable::from_json(payload.clone())
        .context("Service returned an unusable attribute table")?;

    tracing::info!(classes = table.len(), "Fetched terrestrial attribute table");
    Ok(payload)
}
