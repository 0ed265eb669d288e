//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use geoenvo::sources::{
    ecological_coastal_units, ecological_marine_units, world_terrestrial_ecosystems,
};
use geoenvo::sources::world_terrestrial_ecosystems::AttributeTable;
use geoenvo::CannedTransport;
use serde_json::Value as JsonValue;

pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

/// Load a recorded service response from `tests/data`
pub fn fixture(name: &str) -> JsonValue {
    let path = data_dir().join(name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("read {}: {}", path.display(), e));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("parse {}: {}", path.display(), e))
}

/// Hand-written ENVO crosswalks for the recorded responses
pub fn crosswalk_dir() -> PathBuf {
    data_dir().join("sssom")
}

/// Excerpt of the terrestrial attribute table covering the recorded codes
pub fn attribute_table() -> AttributeTable {
    AttributeTable::from_json(fixture("wte_attribute_table.json")).expect("valid attribute table")
}

fn with_attribute_table(transport: CannedTransport) -> CannedTransport {
    transport.with_response(
        world_terrestrial_ecosystems::ATTRIBUTE_TABLE_URL,
        fixture("wte_attribute_table.json"),
    )
}

/// Transport answering every source with its "success" recording
pub fn success_transport() -> Arc<CannedTransport> {
    Arc::new(
        with_attribute_table(CannedTransport::new())
            .with_response(ecological_coastal_units::QUERY_URL, fixture("ecu_success.json"))
            .with_response(ecological_marine_units::QUERY_URL, fixture("emu_success.json"))
            .with_response(world_terrestrial_ecosystems::IDENTIFY_URL, fixture("wte_success.json")),
    )
}

/// Transport answering every source with its "no data" recording
pub fn fail_transport() -> Arc<CannedTransport> {
    Arc::new(
        with_attribute_table(CannedTransport::new())
            .with_response(ecological_coastal_units::QUERY_URL, fixture("ecu_fail.json"))
            .with_response(ecological_marine_units::QUERY_URL, fixture("emu_fail.json"))
            .with_response(world_terrestrial_ecosystems::IDENTIFY_URL, fixture("wte_fail.json")),
    )
}

pub fn point(x: f64, y: f64) -> JsonValue {
    serde_json::json!({"type": "Point", "coordinates": [x, y]})
}

pub fn point_z(x: f64, y: f64, z: f64) -> JsonValue {
    serde_json::json!({"type": "Point", "coordinates": [x, y, z]})
}

pub fn square(x0: f64, y0: f64, size: f64) -> JsonValue {
    serde_json::json!({
        "type": "Polygon",
        "coordinates": [[
            [x0, y0],
            [x0 + size, y0],
            [x0 + size, y0 + size],
            [x0, y0 + size],
            [x0, y0]
        ]]
    })
}
