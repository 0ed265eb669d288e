//! Geometry adapter
//!
//! Validates caller-supplied GeoJSON at the boundary, converts geometries to
//! the Esri wire dialect the classification services speak, and performs the
//! two spatial transforms the sources need:
//!
//! - point → buffered bounding polygon (`buffer_point_to_polygon`), for sources
//!   whose features are lines/polygons that a bare point never intersects
//! - polygon → representative points (`sample_polygon_to_points`), for sources
//!   that only answer point queries

mod buffer;
pub mod projection;
mod sampling;

pub use buffer::buffer_point_to_polygon;
pub use projection::BufferProjection;
pub use sampling::{point_in_polygon, sample_polygon_to_points, PointLocation};

use crate::error::GeometryError;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Spatial reference of every geometry exchanged with the services (WGS84)
pub const WGS84_WKID: u32 = 4326;

/// A coordinate tuple `(x, y)` or `(x, y, z)`
///
/// A JSON `null` in third position deserializes to `z: None`, and a position
/// without `z` serializes back to a two-element array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.z.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.x)?;
        seq.serialize_element(&self.y)?;
        if let Some(z) = self.z {
            seq.serialize_element(&z)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PositionVisitor;

        impl<'de> Visitor<'de> for PositionVisitor {
            type Value = Position;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a coordinate array [x, y] or [x, y, z]")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Position, A::Error> {
                let x: f64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let y: f64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let z: Option<f64> = seq.next_element::<Option<f64>>()?.flatten();
                // Anything past z (e.g. a measure) is not used by any source
                while seq.next_element::<de::IgnoredAny>()?.is_some() {}
                Ok(Position { x, y, z })
            }
        }

        deserializer.deserialize_seq(PositionVisitor)
    }
}

/// A linear ring; closed rings repeat the first position at the end
pub type Ring = Vec<Position>;

/// The geometries accepted by the resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    /// Outer ring first, then any holes
    Polygon(Vec<Ring>),
}

/// True iff the GeoJSON value has a top-level `type` of Point or Polygon
pub fn is_supported(value: &JsonValue) -> bool {
    matches!(
        value.get("type").and_then(JsonValue::as_str),
        Some("Point") | Some("Polygon")
    )
}

impl Geometry {
    /// Validate and parse a GeoJSON geometry
    ///
    /// The `type` is checked before the coordinates so that unsupported
    /// geometries fail with `UnsupportedType` rather than a parse error.
    pub fn from_geojson(value: &JsonValue) -> Result<Self, GeometryError> {
        let geometry_type = value
            .get("type")
            .ok_or(GeometryError::MissingType)?
            .as_str()
            .ok_or_else(|| GeometryError::Malformed("'type' is not a string".to_string()))?;

        if !is_supported(value) {
            return Err(GeometryError::UnsupportedType(geometry_type.to_string()));
        }

        let geometry: Geometry = serde_json::from_value(value.clone())
            .map_err(|e| GeometryError::Malformed(e.to_string()))?;

        if let Geometry::Polygon(rings) = &geometry {
            match rings.first() {
                None => return Err(GeometryError::Malformed("polygon has no rings".to_string())),
                Some(outer) if outer.len() < 3 => {
                    return Err(GeometryError::Malformed(format!(
                        "outer ring has {} positions, need at least 3",
                        outer.len()
                    )))
                }
                _ => {}
            }
        }

        Ok(geometry)
    }

    pub fn to_geojson(&self) -> JsonValue {
        // Serializing a plain enum of floats cannot fail
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// "Point" or "Polygon"
    pub fn geometry_type(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Polygon(_) => "Polygon",
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Geometry::Point(_))
    }

    pub fn is_polygon(&self) -> bool {
        matches!(self, Geometry::Polygon(_))
    }

    /// Every position of the geometry, holes included
    pub fn positions(&self) -> Vec<Position> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::Polygon(rings) => rings.iter().flatten().copied().collect(),
        }
    }

    /// Depth interval `(min, max)` over every Z value present
    ///
    /// A point with a single Z yields `(z, z)`; a geometry without Z values
    /// yields `None`.
    pub fn depth_range(&self) -> Option<(f64, f64)> {
        self.positions()
            .iter()
            .filter_map(|p| p.z)
            .fold(None, |range, z| match range {
                None => Some((z, z)),
                Some((lo, hi)) => Some((f64::min(lo, z), f64::max(hi, z))),
            })
    }

    /// Convert to the Esri geometry dialect used in query parameters
    pub fn to_esri(&self) -> ProviderGeometry {
        let spatial_reference = SpatialReference { wkid: WGS84_WKID };
        match self {
            Geometry::Point(p) => ProviderGeometry {
                geometry: EsriGeometry::Point {
                    x: p.x,
                    y: p.y,
                    z: p.z,
                    spatial_reference,
                },
                geometry_type: "esriGeometryPoint",
            },
            Geometry::Polygon(rings) => ProviderGeometry {
                geometry: EsriGeometry::Polygon {
                    rings: rings.clone(),
                    spatial_reference,
                },
                geometry_type: "esriGeometryPolygon",
            },
        }
    }
}

/// Validate a GeoJSON value and convert it to the provider dialect
pub fn to_provider_wire(value: &JsonValue) -> Result<ProviderGeometry, GeometryError> {
    Geometry::from_geojson(value).map(|g| g.to_esri())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: u32,
}

/// Esri JSON geometry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EsriGeometry {
    Point {
        x: f64,
        y: f64,
        z: Option<f64>,
        #[serde(rename = "spatialReference")]
        spatial_reference: SpatialReference,
    },
    Polygon {
        rings: Vec<Ring>,
        #[serde(rename = "spatialReference")]
        spatial_reference: SpatialReference,
    },
}

/// An Esri geometry plus the `geometryType` parameter that accompanies it
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderGeometry {
    pub geometry: EsriGeometry,
    pub geometry_type: &'static str,
}

impl ProviderGeometry {
    /// The geometry serialized as the JSON string services expect in the
    /// `geometry` query parameter
    pub fn geometry_param(&self) -> String {
        serde_json::to_string(&self.geometry).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_supported() {
        assert!(is_supported(&json!({"type": "Point", "coordinates": [1.0, 2.0]})));
        assert!(is_supported(&json!({"type": "Polygon", "coordinates": []})));
        assert!(!is_supported(&json!({"type": "LineString", "coordinates": []})));
        assert!(!is_supported(&json!({"type": "Unknown"})));
        assert!(!is_supported(&json!({"coordinates": [1.0, 2.0]})));
    }

    #[test]
    fn test_from_geojson_rejects_unsupported_type() {
        let err = Geometry::from_geojson(&json!({"type": "MultiPoint", "coordinates": []}))
            .unwrap_err();
        assert_eq!(err, GeometryError::UnsupportedType("MultiPoint".to_string()));

        let err = Geometry::from_geojson(&json!({"coordinates": [0.0, 0.0]})).unwrap_err();
        assert_eq!(err, GeometryError::MissingType);
    }

    #[test]
    fn test_from_geojson_rejects_degenerate_polygon() {
        let err = Geometry::from_geojson(&json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0]]]
        }))
        .unwrap_err();
        assert!(matches!(err, GeometryError::Malformed(_)));
    }

    #[test]
    fn test_point_with_null_z_round_trips_without_z() {
        let g = Geometry::from_geojson(&json!({"type": "Point", "coordinates": [-72.22, 42.48, null]}))
            .unwrap();
        assert_eq!(g, Geometry::Point(Position::new(-72.22, 42.48)));
        assert_eq!(g.depth_range(), None);
        assert_eq!(
            g.to_geojson(),
            json!({"type": "Point", "coordinates": [-72.22, 42.48]})
        );
    }

    #[test]
    fn test_to_esri_point() {
        let g = Geometry::Point(Position::new(-72.22, 42.48));
        let wire = g.to_esri();
        assert_eq!(wire.geometry_type, "esriGeometryPoint");
        assert_eq!(
            serde_json::to_value(&wire.geometry).unwrap(),
            json!({"x": -72.22, "y": 42.48, "z": null, "spatialReference": {"wkid": 4326}})
        );

        let g = Geometry::Point(Position::with_z(-122.76, 37.774, -100.0));
        assert_eq!(
            serde_json::to_value(&g.to_esri().geometry).unwrap(),
            json!({"x": -122.76, "y": 37.774, "z": -100.0, "spatialReference": {"wkid": 4326}})
        );
    }

    #[test]
    fn test_to_esri_polygon() {
        let value = json!({
            "type": "Polygon",
            "coordinates": [[
                [-123.8, 39.312],
                [-123.8222818, 39.3141049],
                [-123.8166231, 39.2943269],
                [-123.8, 39.312]
            ]]
        });
        let wire = to_provider_wire(&value).unwrap();
        assert_eq!(wire.geometry_type, "esriGeometryPolygon");
        assert_eq!(
            serde_json::to_value(&wire.geometry).unwrap(),
            json!({
                "rings": [[
                    [-123.8, 39.312],
                    [-123.8222818, 39.3141049],
                    [-123.8166231, 39.2943269],
                    [-123.8, 39.312]
                ]],
                "spatialReference": {"wkid": 4326}
            })
        );
    }

    #[test]
    fn test_to_provider_wire_rejects_unknown() {
        assert!(to_provider_wire(&json!({"type": "Unknown"})).is_err());
    }

    #[test]
    fn test_depth_range() {
        let point = Geometry::Point(Position::with_z(0.0, 0.0, -30.0));
        assert_eq!(point.depth_range(), Some((-30.0, -30.0)));

        let polygon = Geometry::Polygon(vec![vec![
            Position::with_z(0.0, 0.0, -5.0),
            Position::with_z(1.0, 0.0, -40.0),
            Position::new(1.0, 1.0),
            Position::with_z(0.0, 0.0, -5.0),
        ]]);
        assert_eq!(polygon.depth_range(), Some((-40.0, -5.0)));
    }
}
