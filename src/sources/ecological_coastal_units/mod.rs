//! Ecological Coastal Units (ECU)
//!
//! Standardized global classification of ~4 million coastal segments
//! (Sayre et al. 2021). Segments are line features, so a bare point almost
//! never intersects one; points are only queried when a buffer radius is
//! configured, in which case the bounding rectangle of the buffer is sent.

mod normalize;

pub use normalize::{
    decompose_descriptor, CoastalAttributes, CoastalFeature, CoastalFeatureCollection,
    COASTAL_FACETS,
};

use super::transport::{SourceRequest, SourceTransport};
use super::{fetch, parse_raw, EnvironmentSource, ResolveContext, SourceNormalizer};
use crate::geometry::{buffer_point_to_polygon, BufferProjection, Geometry};
use crate::response::EnvironmentRecord;
use async_trait::async_trait;
use std::sync::Arc;

pub const SOURCE_NAME: &str = "EcologicalCoastalUnits";
pub const IDENTIFIER: &str = "https://doi.org/10.5066/P9HWHSPU";
pub const QUERY_URL: &str =
    "https://rmgsc.cr.usgs.gov/arcgis/rest/services/gceVector/MapServer/0/query";

/// Ecological Coastal Units source
pub struct EcologicalCoastalUnits {
    transport: Arc<dyn SourceTransport>,
    buffer_km: Option<f64>,
    projection: BufferProjection,
}

impl EcologicalCoastalUnits {
    pub fn new(transport: Arc<dyn SourceTransport>) -> Self {
        Self {
            transport,
            buffer_km: None,
            projection: BufferProjection::default(),
        }
    }

    /// Buffer radius (km) applied to point geometries before querying
    pub fn with_buffer(mut self, buffer_km: f64) -> Self {
        self.buffer_km = Some(buffer_km);
        self
    }

    pub fn with_projection(mut self, projection: BufferProjection) -> Self {
        self.projection = projection;
        self
    }

    pub fn buffer_km(&self) -> Option<f64> {
        self.buffer_km
    }

    /// The geometry actually sent to the service, if any
    ///
    /// Polygons go as-is; points only when a buffer is configured.
    pub fn query_geometry(&self, geometry: &Geometry) -> Option<Geometry> {
        match geometry {
            Geometry::Polygon(_) => Some(geometry.clone()),
            Geometry::Point(_) => {
                let buffer_km = self.buffer_km?;
                match buffer_point_to_polygon(geometry, Some(buffer_km), self.projection) {
                    Ok(polygon) => Some(polygon),
                    Err(e) => {
                        tracing::warn!(source = SOURCE_NAME, "Cannot buffer point: {}", e);
                        None
                    }
                }
            }
        }
    }

    pub fn build_request(&self, geometry: &Geometry) -> SourceRequest {
        let wire = geometry.to_esri();
        SourceRequest::new(SOURCE_NAME, QUERY_URL)
            .param("f", "geojson")
            .param("geometry", wire.geometry_param())
            .param("geometryType", wire.geometry_type)
            .param("where", "1=1")
            .param("spatialRel", "esriSpatialRelIntersects")
            .param("outFields", "*")
            .param("returnTrueCurves", "false")
            .param("returnIdsOnly", "false")
            .param("returnCountOnly", "false")
            .param("returnZ", "false")
            .param("returnM", "false")
            .param("returnExtentOnly", "false")
    }
}

#[async_trait]
impl EnvironmentSource for EcologicalCoastalUnits {
    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    async fn resolve(&self, geometry: &Geometry, ctx: &ResolveContext) -> Vec<EnvironmentRecord> {
        let Some(query) = self.query_geometry(geometry) else {
            tracing::debug!(source = SOURCE_NAME, "Point without buffer, not queried");
            return Vec::new();
        };

        let request = self.build_request(&query);
        let payload = fetch(self.transport.as_ref(), &request, ctx).await;
        let raw: CoastalFeatureCollection = parse_raw(SOURCE_NAME, payload);
        let records = self.normalize(&raw);

        tracing::debug!(
            source = SOURCE_NAME,
            features = raw.features.len(),
            records = records.len(),
            "Resolved"
        );
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;
    use crate::sources::CannedTransport;
    use serde_json::json;

    fn polygon() -> Geometry {
        Geometry::Polygon(vec![vec![
            Position::new(-123.8, 39.312),
            Position::new(-123.8222818, 39.3141049),
            Position::new(-123.8166231, 39.2943269),
            Position::new(-123.8, 39.312),
        ]])
    }

    #[tokio::test]
    async fn test_point_without_buffer_is_not_queried() {
        let transport = Arc::new(CannedTransport::new());
        let source = EcologicalCoastalUnits::new(transport.clone());
        let point = Geometry::Point(Position::new(-123.8, 39.31));
        let records = source.resolve(&point, &ResolveContext::new()).await;
        assert!(records.is_empty());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_buffered_point_is_sent_as_polygon() {
        let transport = Arc::new(CannedTransport::new());
        let source = EcologicalCoastalUnits::new(transport.clone()).with_buffer(0.5);
        let point = Geometry::Point(Position::new(-123.8, 39.31));
        source.resolve(&point, &ResolveContext::new()).await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].get_param("geometryType"), Some("esriGeometryPolygon"));
        assert_eq!(requests[0].get_param("f"), Some("geojson"));
    }

    #[tokio::test]
    async fn test_polygon_resolves_records() {
        let transport = Arc::new(CannedTransport::new().with_response(
            QUERY_URL,
            json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "properties": {"CSU_Descriptor": "Sloping, Straight"}},
                    {"type": "Feature", "properties": {"CSU_Descriptor": "Sloping, Straight"}}
                ]
            }),
        ));
        let source = EcologicalCoastalUnits::new(transport);
        let records = source.resolve(&polygon(), &ResolveContext::new()).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].properties.get("sinuosity"), Some("Straight"));
    }

    #[test]
    fn test_invalid_buffer_skips_query() {
        let source =
            EcologicalCoastalUnits::new(Arc::new(CannedTransport::new())).with_buffer(-1.0);
        let point = Geometry::Point(Position::new(0.0, 0.0));
        assert_eq!(source.query_geometry(&point), None);
    }
}
