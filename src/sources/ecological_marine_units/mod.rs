//! Ecological Marine Units (EMU)
//!
//! Three-dimensional classification of the global ocean (Sayre et al. 2017)
//! into water layers, each described by depth zone, temperature, salinity,
//! dissolved oxygen, nitrate, phosphate and silicate. A query returns every
//! layer in the water column near the location; the geometry's Z values
//! select the layers that apply.

mod normalize;
pub mod types;

pub use normalize::{
    marine_properties, matches_depth, translate_codes, MARINE_FACETS, NOT_AN_OCEAN,
    NOT_AVAILABLE,
};
pub use types::{MarineDescriptor, MarineLayer, MarineQuery, MarineQueryResponse};

use super::transport::{SourceRequest, SourceTransport};
use super::{fetch, parse_raw, EnvironmentSource, ResolveContext, SourceNormalizer};
use crate::geometry::{Geometry, WGS84_WKID};
use crate::response::EnvironmentRecord;
use async_trait::async_trait;
use std::sync::Arc;

pub const SOURCE_NAME: &str = "EcologicalMarineUnits";
pub const IDENTIFIER: &str = "https://doi.org/10.5066/P9Q6ZSGN";
pub const QUERY_URL: &str =
    "https://services.arcgis.com/P3ePLMYs2RVChkJx/ArcGIS/rest/services/EMU_2018/FeatureServer/0/query";

/// Search radius around the geometry, in nautical miles
const SEARCH_DISTANCE_NM: u32 = 10;

/// Ecological Marine Units source
pub struct EcologicalMarineUnits {
    transport: Arc<dyn SourceTransport>,
}

impl EcologicalMarineUnits {
    pub fn new(transport: Arc<dyn SourceTransport>) -> Self {
        Self { transport }
    }

    pub fn build_request(&self, geometry: &Geometry) -> SourceRequest {
        let wire = geometry.to_esri();
        // Esri JSON rather than GeoJSON: only it carries the coded-value domains
        SourceRequest::new(SOURCE_NAME, QUERY_URL)
            .param("f", "json")
            .param("geometry", wire.geometry_param())
            .param("geometryType", wire.geometry_type)
            .param("where", "1=1")
            .param("spatialRel", "esriSpatialRelIntersects")
            .param("outFields", "UnitTop,UnitBottom,OceanName,Name_2018")
            .param("distance", SEARCH_DISTANCE_NM.to_string())
            .param("units", "esriSRUnit_NauticalMile")
            .param("multipatchOption", "xyFootprint")
            .param("outSR", format!("{{\"wkid\":{}}}", WGS84_WKID))
            .param("returnIdsOnly", "false")
            .param("returnZ", "false")
            .param("returnM", "false")
            .param("returnExceededLimitFeatures", "true")
            .param("sqlFormat", "none")
            .param("orderByFields", "UnitTop desc")
            .param("returnDistinctValues", "false")
            .param("returnExtentOnly", "false")
    }
}

#[async_trait]
impl EnvironmentSource for EcologicalMarineUnits {
    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    async fn resolve(&self, geometry: &Geometry, ctx: &ResolveContext) -> Vec<EnvironmentRecord> {
        let request = self.build_request(geometry);
        let payload = fetch(self.transport.as_ref(), &request, ctx).await;
        let raw = MarineQuery {
            response: parse_raw(SOURCE_NAME, payload),
            depth_range: geometry.depth_range(),
        };
        let records = self.normalize(&raw);

        tracing::debug!(
            source = SOURCE_NAME,
            layers = raw.response.features.len(),
            depth = ?raw.depth_range,
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

    #[test]
    fn test_request_parameters() {
        let source = EcologicalMarineUnits::new(Arc::new(CannedTransport::new()));
        let req = source.build_request(&Geometry::Point(Position::with_z(-122.76, 37.774, -100.0)));
        assert_eq!(req.get_param("f"), Some("json"));
        assert_eq!(req.get_param("distance"), Some("10"));
        assert_eq!(req.get_param("orderByFields"), Some("UnitTop desc"));
        assert_eq!(req.get_param("outSR"), Some("{\"wkid\":4326}"));
        assert_eq!(req.get_param("geometryType"), Some("esriGeometryPoint"));
        assert!(req.get_param("geometry").unwrap().contains("-100"));
    }

    #[tokio::test]
    async fn test_empty_payload_resolves_to_nothing() {
        let source = EcologicalMarineUnits::new(Arc::new(CannedTransport::new()));
        let point = Geometry::Point(Position::new(-122.76, 37.774));
        assert!(source.resolve(&point, &ResolveContext::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_resolves_to_nothing() {
        let transport = CannedTransport::new().with_response(QUERY_URL, json!({"features": 42}));
        let source = EcologicalMarineUnits::new(Arc::new(transport));
        let point = Geometry::Point(Position::new(-122.76, 37.774));
        assert!(source.resolve(&point, &ResolveContext::new()).await.is_empty());
    }
}
