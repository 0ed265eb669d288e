//! World Terrestrial Ecosystems (WTE)
//!
//! 250 m global raster of terrestrial ecosystems (Sayre 2022), classified by
//! temperature, moisture, land cover and landform. The image service answers
//! an `identify` call with the raster class code(s) under the geometry.
//!
//! Polygons can be resolved through representative points: with a grid size
//! configured the polygon is sampled (see
//! [`sample_polygon_to_points`](crate::geometry::sample_polygon_to_points))
//! and every point is identified, with a bounded number of calls in flight.
//!
//! Class codes are decoded through the service's raster attribute table. A
//! table can be supplied up front; otherwise it is downloaded on first use
//! and kept for the life of the source.

pub mod attribute_table;
mod normalize;

pub use attribute_table::{
    fetch_raster_attribute_table, load_remote_attribute_table, AttributeTable, TerrestrialClass,
    ATTRIBUTE_TABLE_URL,
};
pub use normalize::{
    parse_code, IdentifiedValues, IdentifyResponse, TerrestrialDescriptor, NO_DATA,
};

use super::transport::{SourceRequest, SourceTransport};
use super::{fetch, parse_raw, EnvironmentSource, ResolveContext, SourceNormalizer};
use crate::error::{AttributeTableError, GeometryError};
use crate::geometry::{sample_polygon_to_points, Geometry};
use crate::response::EnvironmentRecord;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const SOURCE_NAME: &str = "WorldTerrestrialEcosystems";
pub const IDENTIFIER: &str = "https://doi.org/10.5066/P9DO61LP";
pub const IDENTIFY_URL: &str =
    "https://landscape12.arcgis.com/arcgis/rest/services/World_Terrestrial_Ecosystems/ImageServer/identify";

pub const DEFAULT_MAX_SAMPLES: usize = 500;
pub const DEFAULT_CONCURRENCY: usize = 4;

/// World Terrestrial Ecosystems source
pub struct WorldTerrestrialEcosystems {
    transport: Arc<dyn SourceTransport>,
    attribute_table: OnceCell<Arc<AttributeTable>>,
    grid_size: Option<f64>,
    max_samples: usize,
    concurrency: usize,
}

impl WorldTerrestrialEcosystems {
    /// Source that downloads the attribute table the first time it resolves
    pub fn new(transport: Arc<dyn SourceTransport>) -> Self {
        Self {
            transport,
            attribute_table: OnceCell::new(),
            grid_size: None,
            max_samples: DEFAULT_MAX_SAMPLES,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Use an already loaded attribute table instead of downloading one
    pub fn with_attribute_table(mut self, table: Arc<AttributeTable>) -> Self {
        self.attribute_table = OnceCell::new_with(Some(table));
        self
    }

    /// Sample polygons on a grid of this size (coordinate units)
    pub fn with_grid_size(mut self, grid_size: f64) -> Self {
        self.grid_size = Some(grid_size);
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn grid_size(&self) -> Option<f64> {
        self.grid_size
    }

    /// The attribute table, if it has been supplied or downloaded
    pub fn attribute_table(&self) -> Option<&AttributeTable> {
        self.attribute_table.get().map(|table| table.as_ref())
    }

    /// The attribute table, downloading it on first use
    ///
    /// A failed download leaves the table unset so the next call retries.
    pub async fn load_attribute_table(
        &self,
        ctx: &ResolveContext,
    ) -> Result<&AttributeTable, AttributeTableError> {
        let table = self
            .attribute_table
            .get_or_try_init(|| async {
                load_remote_attribute_table(self.transport.as_ref(), ctx)
                    .await
                    .map(Arc::new)
            })
            .await?;
        Ok(table.as_ref())
    }

    /// Geometries to identify for one input geometry
    pub fn query_geometries(&self, geometry: &Geometry) -> Vec<Geometry> {
        let grid_size = match (geometry, self.grid_size) {
            (Geometry::Polygon(_), Some(grid_size)) => grid_size,
            _ => return vec![geometry.clone()],
        };

        match sample_polygon_to_points(geometry, grid_size) {
            Ok(mut points) => {
                if points.len() > self.max_samples {
                    tracing::warn!(
                        source = SOURCE_NAME,
                        sampled = points.len(),
                        max_samples = self.max_samples,
                        "Too many sample points, truncating"
                    );
                    points.truncate(self.max_samples);
                }
                points
            }
            Err(e @ GeometryError::GridTooDense { .. }) => {
                tracing::warn!(source = SOURCE_NAME, "{}; querying the polygon directly", e);
                vec![geometry.clone()]
            }
            Err(e) => {
                tracing::warn!(source = SOURCE_NAME, "Cannot sample polygon: {}", e);
                vec![geometry.clone()]
            }
        }
    }

    pub fn build_request(&self, geometry: &Geometry) -> SourceRequest {
        let wire = geometry.to_esri();
        SourceRequest::new(SOURCE_NAME, IDENTIFY_URL)
            .param("geometry", wire.geometry_param())
            .param("geometryType", wire.geometry_type)
            .param("returnGeometry", "false")
            .param("f", "json")
    }

    async fn identify(&self, geometry: &Geometry, ctx: &ResolveContext) -> Vec<JsonValue> {
        let request = self.build_request(geometry);
        let payload = fetch(self.transport.as_ref(), &request, ctx).await;
        parse_raw::<IdentifyResponse>(SOURCE_NAME, payload).into_values()
    }
}

#[async_trait]
impl EnvironmentSource for WorldTerrestrialEcosystems {
    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    async fn resolve(&self, geometry: &Geometry, ctx: &ResolveContext) -> Vec<EnvironmentRecord> {
        if let Err(e) = self.load_attribute_table(ctx).await {
            tracing::warn!(source = SOURCE_NAME, "{}; class codes cannot be decoded", e);
            return Vec::new();
        }

        let targets = self.query_geometries(geometry);
        let queried = targets.len();

        let values: Vec<Vec<JsonValue>> = stream::iter(targets)
            .map(|target| async move { self.identify(&target, ctx).await })
            .buffered(self.concurrency)
            .collect()
            .await;

        let raw = IdentifiedValues {
            values: values.into_iter().flatten().collect(),
        };
        let records = self.normalize(&raw);

        tracing::debug!(
            source = SOURCE_NAME,
            queried,
            values = raw.values.len(),
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

    fn square(size: f64) -> Geometry {
        Geometry::Polygon(vec![vec![
            Position::new(0.0, 0.0),
            Position::new(size, 0.0),
            Position::new(size, size),
            Position::new(0.0, size),
            Position::new(0.0, 0.0),
        ]])
    }

    fn table() -> AttributeTable {
        AttributeTable::from_json(json!({
            "features": [
                {"attributes": {"Value": 175, "Temperatur": "Cool Temperate", "Moisture": "Dry",
                    "Landcover": "Forest", "Landforms": "Plains", "Climate_Re": "Cool Temperate Dry",
                    "ClassName": "Cool Temperate Dry Forest on Plains"}}
            ]
        }))
        .unwrap()
    }

    fn source(transport: Arc<CannedTransport>) -> WorldTerrestrialEcosystems {
        WorldTerrestrialEcosystems::new(transport).with_attribute_table(Arc::new(table()))
    }

    fn table_requests(transport: &CannedTransport) -> usize {
        transport
            .requests()
            .iter()
            .filter(|r| r.base_url == ATTRIBUTE_TABLE_URL)
            .count()
    }

    #[test]
    fn test_defaults() {
        let src = source(Arc::new(CannedTransport::new()));
        assert_eq!(src.grid_size(), None);
        assert_eq!(src.max_samples, DEFAULT_MAX_SAMPLES);
        assert_eq!(src.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_polygon_without_grid_is_queried_directly() {
        let src = source(Arc::new(CannedTransport::new()));
        assert_eq!(src.query_geometries(&square(1.0)), vec![square(1.0)]);
    }

    #[test]
    fn test_sampling_is_capped() {
        let src = source(Arc::new(CannedTransport::new()))
            .with_grid_size(0.5)
            .with_max_samples(5);
        assert_eq!(src.query_geometries(&square(1.0)).len(), 5);
    }

    #[test]
    fn test_too_dense_grid_falls_back_to_polygon() {
        let src = source(Arc::new(CannedTransport::new())).with_grid_size(1e-7);
        assert_eq!(src.query_geometries(&square(1.0)), vec![square(1.0)]);
    }

    #[tokio::test]
    async fn test_sampled_polygon_queries_every_point() {
        let transport = Arc::new(
            CannedTransport::new()
                .with_response(IDENTIFY_URL, json!({"properties": {"Values": ["175"]}})),
        );
        let src = source(transport.clone()).with_grid_size(0.5).with_concurrency(2);
        let records = src.resolve(&square(1.0), &ResolveContext::new()).await;

        assert_eq!(transport.request_count(), 8);
        assert!(transport
            .requests()
            .iter()
            .all(|r| r.get_param("geometryType") == Some("esriGeometryPoint")));
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_no_data_point() {
        let transport = Arc::new(
            CannedTransport::new()
                .with_response(IDENTIFY_URL, json!({"properties": {"Values": ["NoData"]}})),
        );
        let src = source(transport);
        let point = Geometry::Point(Position::new(-30.0, 0.0));
        assert!(src.resolve(&point, &ResolveContext::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_attribute_table_is_downloaded_once() {
        let served = json!({
            "features": [
                {"attributes": {"Value": 175, "Landcover": "Forest", "ClassName": "Forest on Plains"}}
            ]
        });
        let transport = Arc::new(
            CannedTransport::new()
                .with_response(ATTRIBUTE_TABLE_URL, served)
                .with_response(IDENTIFY_URL, json!({"properties": {"Values": ["175"]}})),
        );
        let src = WorldTerrestrialEcosystems::new(transport.clone());
        assert!(src.attribute_table().is_none());

        let point = Geometry::Point(Position::new(-72.22, 42.48));
        let first = src.resolve(&point, &ResolveContext::new()).await;
        let second = src.resolve(&point, &ResolveContext::new()).await;

        assert_eq!(first, second);
        assert_eq!(first[0].properties.get("ecosystem"), Some("Forest on Plains"));
        assert_eq!(table_requests(&transport), 1);
        assert_eq!(src.attribute_table().map(AttributeTable::len), Some(1));
    }

    #[tokio::test]
    async fn test_missing_attribute_table_skips_identify() {
        let transport = Arc::new(
            CannedTransport::new()
                .with_response(IDENTIFY_URL, json!({"properties": {"Values": ["175"]}})),
        );
        let src = WorldTerrestrialEcosystems::new(transport.clone());
        let point = Geometry::Point(Position::new(-72.22, 42.48));

        assert!(src.resolve(&point, &ResolveContext::new()).await.is_empty());
        assert!(src.resolve(&point, &ResolveContext::new()).await.is_empty());
        assert_eq!(transport.request_count(), 2);
        assert_eq!(table_requests(&transport), 2);
    }

    #[tokio::test]
    async fn test_supplied_table_is_not_downloaded() {
        let transport = Arc::new(
            CannedTransport::new()
                .with_response(IDENTIFY_URL, json!({"properties": {"Values": ["175"]}})),
        );
        let src = source(transport.clone());
        let point = Geometry::Point(Position::new(-72.22, 42.48));
        let records = src.resolve(&point, &ResolveContext::new()).await;

        assert_eq!(records.len(), 1);
        assert_eq!(table_requests(&transport), 0);
    }
}
