//! Each source against recorded service responses
//!
//! Runs without network access: responses come from `tests/data` through
//! `CannedTransport`.

mod helpers;

use std::sync::Arc;

use geoenvo::sources::ecological_marine_units::NOT_AVAILABLE;
use geoenvo::sources::world_terrestrial_ecosystems;
use geoenvo::{
    CannedTransport, EcologicalCoastalUnits, EcologicalMarineUnits, EnvironmentSource, Geometry,
    ResolveContext, WorldTerrestrialEcosystems,
};
use helpers::{
    attribute_table, fail_transport, fixture, point, point_z, square, success_transport,
};

fn geometry(value: serde_json::Value) -> Geometry {
    Geometry::from_geojson(&value).expect("valid geometry")
}

// =============================================================================
// Ecological Coastal Units
// =============================================================================

#[tokio::test]
async fn test_coastal_unique_descriptors() {
    let transport = success_transport();
    let ecu = EcologicalCoastalUnits::new(transport.clone()).with_buffer(0.5);
    let records = ecu
        .resolve(&geometry(point(-70.9, 42.6)), &ResolveContext::new())
        .await;

    // Five features, one repeated descriptor
    assert_eq!(records.len(), 4);
    assert!(records
        .iter()
        .all(|r| r.source_name() == "EcologicalCoastalUnits"));

    let first = &records[0].properties;
    assert_eq!(first.get("slope"), Some("Sloping"));
    assert_eq!(first.get("chlorophyll"), Some("Moderate Chlorophyll"));
    assert_eq!(first.len(), 11);
    assert_eq!(
        records[3].properties.get("temperatureAndMoistureRegime"),
        Some("Moist Tropical")
    );

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].get_param("geometryType"), Some("esriGeometryPolygon"));
    assert_eq!(requests[0].get_param("f"), Some("geojson"));
}

#[tokio::test]
async fn test_coastal_point_without_buffer_is_not_queried() {
    let transport = success_transport();
    let ecu = EcologicalCoastalUnits::new(transport.clone());
    let records = ecu
        .resolve(&geometry(point(-70.9, 42.6)), &ResolveContext::new())
        .await;
    assert!(records.is_empty());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_coastal_no_features() {
    let ecu = EcologicalCoastalUnits::new(fail_transport());
    let records = ecu
        .resolve(&geometry(square(-71.0, 42.5, 0.1)), &ResolveContext::new())
        .await;
    assert!(records.is_empty());
}

// =============================================================================
// Ecological Marine Units
// =============================================================================

async fn marine_at(value: serde_json::Value) -> Vec<geoenvo::EnvironmentRecord> {
    EcologicalMarineUnits::new(success_transport())
        .resolve(&geometry(value), &ResolveContext::new())
        .await
}

#[tokio::test]
async fn test_marine_depth_on_layer_boundary_matches_both_layers() {
    let records = marine_at(point_z(-122.76, 37.774, -10.0)).await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].properties.get("oceanName"), Some("North Pacific"));
    assert_eq!(records[0].properties.get("temperature"), Some("Cold"));
    assert_eq!(records[1].properties.get("temperature"), Some("Moderate"));
}

#[tokio::test]
async fn test_marine_depth_selects_one_layer() {
    let records = marine_at(point_z(-122.76, 37.774, -30.0)).await;
    assert_eq!(records.len(), 1);
    let props = &records[0].properties;
    assert_eq!(props.get("depth"), Some("Epipelagic"));
    assert_eq!(props.get("nitrate"), Some("Medium Nitrate"));
    assert_eq!(
        props.get("ecosystem"),
        Some(
            "North Pacific, Epipelagic, Cold, Euhaline, Oxic, Medium Nitrate, \
             Medium Phosphate, Low Silicate"
        )
    );
}

#[tokio::test]
async fn test_marine_without_depth_returns_every_layer() {
    assert_eq!(marine_at(point(-122.76, 37.774)).await.len(), 2);
}

#[tokio::test]
async fn test_marine_depth_below_every_layer() {
    assert!(marine_at(point_z(-122.76, 37.774, -100.0)).await.is_empty());
}

#[tokio::test]
async fn test_marine_unknown_codes_become_not_available() {
    let payload = serde_json::json!({
        "fields": [],
        "features": [{"attributes": {"UnitTop": 0, "UnitBottom": -10, "OceanName": null, "Name_2018": 99}}]
    });
    let transport = Arc::new(
        CannedTransport::new()
            .with_response(geoenvo::sources::ecological_marine_units::QUERY_URL, payload),
    );
    let records = EcologicalMarineUnits::new(transport)
        .resolve(&geometry(point(0.0, 0.0)), &ResolveContext::new())
        .await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].properties.get("oceanName"), Some("Not an ocean"));
    assert_eq!(records[0].properties.get("depth"), Some(NOT_AVAILABLE));
}

#[tokio::test]
async fn test_marine_no_features() {
    let records = EcologicalMarineUnits::new(fail_transport())
        .resolve(&geometry(point_z(-72.22, 42.48, -5.0)), &ResolveContext::new())
        .await;
    assert!(records.is_empty());
}

// =============================================================================
// World Terrestrial Ecosystems
// =============================================================================

#[tokio::test]
async fn test_terrestrial_point() {
    let wte = WorldTerrestrialEcosystems::new(success_transport());
    let records = wte
        .resolve(&geometry(point(-72.22, 42.48)), &ResolveContext::new())
        .await;

    assert_eq!(records.len(), 1);
    let props = &records[0].properties;
    assert_eq!(props.len(), 6);
    assert_eq!(props.get("landCover"), Some("Forest"));
    assert_eq!(props.get("landForm"), Some("Plains"));
    assert_eq!(
        props.get("ecosystem"),
        Some("Cool Temperate Dry Forest on Plains")
    );
}

#[tokio::test]
async fn test_terrestrial_sampled_polygon_collapses_to_one_record() {
    let transport = success_transport();
    let wte = WorldTerrestrialEcosystems::new(transport.clone())
        .with_attribute_table(Arc::new(attribute_table()))
        .with_grid_size(0.5);
    let records = wte
        .resolve(&geometry(square(-72.5, 42.0, 1.0)), &ResolveContext::new())
        .await;

    // Every sample identifies class 175
    assert_eq!(records.len(), 1);
    assert!(transport.request_count() > 1);
    assert!(transport
        .requests()
        .iter()
        .all(|r| r.get_param("geometryType") == Some("esriGeometryPoint")));
}

#[tokio::test]
async fn test_terrestrial_no_data() {
    let wte = WorldTerrestrialEcosystems::new(fail_transport());
    let records = wte
        .resolve(&geometry(point(-122.76, 37.774)), &ResolveContext::new())
        .await;
    assert!(records.is_empty());
}

#[test]
fn test_fixtures_are_well_formed() {
    for name in [
        "ecu_success.json",
        "ecu_fail.json",
        "emu_success.json",
        "emu_fail.json",
        "wte_success.json",
        "wte_fail.json",
        "wte_attribute_table.json",
    ] {
        assert!(fixture(name).is_object(), "{}", name);
    }
}

#[test]
fn test_attribute_table_fixture_codes() {
    let table = attribute_table();
    assert_eq!(table.len(), 3);
    let forest = table.get(175).unwrap();
    assert_eq!(forest.temperature.as_deref(), Some("Cool Temperate"));
    assert_eq!(forest.moisture.as_deref(), Some("Dry"));
    assert_eq!(forest.land_cover.as_deref(), Some("Forest"));
    assert_eq!(forest.land_form.as_deref(), Some("Plains"));
    assert_eq!(
        table.get(12).and_then(|c| c.land_cover.as_deref()),
        Some("Snow and Ice")
    );
    assert_eq!(
        table.get(248).and_then(|c| c.class_name.as_deref()),
        Some("Tropical Moist Forest on Hills")
    );
}

#[tokio::test]
async fn test_terrestrial_without_reachable_attribute_table() {
    let transport = Arc::new(CannedTransport::new().with_response(
        world_terrestrial_ecosystems::IDENTIFY_URL,
        fixture("wte_success.json"),
    ));
    let wte = WorldTerrestrialEcosystems::new(transport.clone());
    let records = wte
        .resolve(&geometry(point(-72.22, 42.48)), &ResolveContext::new())
        .await;

    assert!(records.is_empty());
    assert!(transport
        .requests()
        .iter()
        .all(|r| r.base_url == world_terrestrial_ecosystems::ATTRIBUTE_TABLE_URL));
}
