//! Point → buffered bounding polygon

use super::projection::BufferProjection;
use super::{Geometry, Position};
use crate::error::GeometryError;

/// Segments used to trace the buffer circle before taking its bounds
const CIRCLE_SEGMENTS: usize = 64;

/// Expand a point into the bounding rectangle of a circular buffer
///
/// The circle of `radius_km` is traced in a metric transverse Mercator plane,
/// reprojected to geographic coordinates and reduced to its axis-aligned
/// bounding box, returned as a closed 5-vertex ring. The rectangle, not the
/// circle, is what the coastal service is queried with.
///
/// The rectangle never leaves the WGS84 range. A circle that crosses the
/// antimeridian is cut at ±180°, and one that covers a pole becomes a polar
/// cap spanning every longitude.
///
/// Without a radius, or for a non-point geometry, the input is returned
/// unchanged.
pub fn buffer_point_to_polygon(
    geometry: &Geometry,
    radius_km: Option<f64>,
    projection: BufferProjection,
) -> Result<Geometry, GeometryError> {
    let (point, radius_km) = match (geometry, radius_km) {
        (Geometry::Point(p), Some(r)) => (p, r),
        _ => return Ok(geometry.clone()),
    };

    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(GeometryError::InvalidBufferRadius(radius_km));
    }
    if !(-180.0..=180.0).contains(&point.x) || !(-90.0..=90.0).contains(&point.y) {
        return Err(GeometryError::Malformed(format!(
            "point ({}, {}) is outside the WGS84 range",
            point.x, point.y
        )));
    }

    let tm = projection.for_longitude(point.x);
    let (cx, cy) = tm.forward(point.x, point.y);
    let radius_m = radius_km * 1000.0;

    let covers = |pole_lat: f64| {
        let (px, py) = tm.forward(point.x, pole_lat);
        (px - cx).hypot(py - cy) <= radius_m
    };
    let covers_north = covers(90.0);
    let covers_south = covers(-90.0);

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for i in 0..CIRCLE_SEGMENTS {
        let theta = (i as f64) * std::f64::consts::TAU / (CIRCLE_SEGMENTS as f64);
        let (lon, lat) = tm.inverse(cx + radius_m * theta.cos(), cy + radius_m * theta.sin());
        let lon = unwrap_longitude(lon, point.x);
        min_x = min_x.min(lon);
        min_y = min_y.min(lat);
        max_x = max_x.max(lon);
        max_y = max_y.max(lat);
    }

    if covers_north {
        max_y = 90.0;
    }
    if covers_south {
        min_y = -90.0;
    }
    if covers_north || covers_south {
        tracing::debug!(x = point.x, y = point.y, radius_km, "Buffer covers a pole");
        min_x = -180.0;
        max_x = 180.0;
    }

    let (min_x, max_x) = (min_x.max(-180.0), max_x.min(180.0));
    let (min_y, max_y) = (min_y.max(-90.0), max_y.min(90.0));

    Ok(Geometry::Polygon(vec![vec![
        Position::new(min_x, min_y),
        Position::new(max_x, min_y),
        Position::new(max_x, max_y),
        Position::new(min_x, max_y),
        Position::new(min_x, min_y),
    ]]))
}

/// Shift `lon` by whole turns to within 180° of `reference`
fn unwrap_longitude(lon: f64, reference: f64) -> f64 {
    let mut lon = lon;
    while lon - reference > 180.0 {
        lon -= 360.0;
    }
    while reference - lon > 180.0 {
        lon += 360.0;
    }
    lon
}
