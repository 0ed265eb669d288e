//! Polygon → representative points

use super::{Geometry, Position, Ring};
use crate::error::GeometryError;

/// Upper bound on grid cells evaluated for one polygon
pub const MAX_GRID_CELLS: usize = 1_000_000;

const EPSILON: f64 = 1e-12;

/// Where a point lies relative to a polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    Boundary,
    Outside,
}

/// Sample a polygon into representative points
///
/// A square grid of `grid_size` (in coordinate units) is laid over the outer
/// ring's bounding box. The centroid of every cell that falls strictly within
/// the polygon is kept (such a cell necessarily intersects the polygon), then
/// every distinct vertex of the outer ring is appended. Non-polygons come
/// back as a single-element list.
pub fn sample_polygon_to_points(
    geometry: &Geometry,
    grid_size: f64,
) -> Result<Vec<Geometry>, GeometryError> {
    let rings = match geometry {
        Geometry::Polygon(rings) => rings,
        Geometry::Point(_) => return Ok(vec![geometry.clone()]),
    };
    if !grid_size.is_finite() || grid_size <= 0.0 {
        return Err(GeometryError::InvalidGridSize(grid_size));
    }
    let outer = match rings.first() {
        Some(outer) if !outer.is_empty() => outer,
        _ => return Err(GeometryError::Malformed("polygon has no rings".to_string())),
    };

    let (min_x, min_y, max_x, max_y) = ring_bounds(outer);
    let cols = steps(min_x, max_x, grid_size);
    let rows = steps(min_y, max_y, grid_size);
    let cells = cols.saturating_mul(rows);
    if cells > MAX_GRID_CELLS {
        return Err(GeometryError::GridTooDense {
            cells,
            limit: MAX_GRID_CELLS,
        });
    }

    let half = grid_size / 2.0;
    let mut points = Vec::new();
    for i in 0..cols {
        let x = min_x + (i as f64) * grid_size;
        for j in 0..rows {
            let y = min_y + (j as f64) * grid_size;
            let centroid = Position::new(x + half, y + half);
            if point_in_polygon(&centroid, rings) == PointLocation::Inside {
                points.push(Geometry::Point(centroid));
            }
        }
    }

    let mut vertices: Vec<Position> = Vec::new();
    for p in outer {
        let vertex = Position::new(p.x, p.y);
        if !vertices.contains(&vertex) {
            vertices.push(vertex);
        }
    }
    points.extend(vertices.into_iter().map(Geometry::Point));

    Ok(points)
}

/// Number of grid origins `min + i*step` with `min + i*step < max + step`
fn steps(min: f64, max: f64, step: f64) -> usize {
    (((max - min + step) / step).ceil() as usize).max(1)
}

fn ring_bounds(ring: &Ring) -> (f64, f64, f64, f64) {
    ring.iter().fold(
        (
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        ),
        |(min_x, min_y, max_x, max_y), p| {
            (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
        },
    )
}

/// Locate a point relative to a polygon (outer ring first, then holes)
pub fn point_in_polygon(point: &Position, rings: &[Ring]) -> PointLocation {
    let Some(outer) = rings.first() else {
        return PointLocation::Outside;
    };
    match locate_in_ring(point, outer) {
        PointLocation::Inside => {}
        other => return other,
    }
    for hole in &rings[1..] {
        match locate_in_ring(point, hole) {
            PointLocation::Inside => return PointLocation::Outside,
            PointLocation::Boundary => return PointLocation::Boundary,
            PointLocation::Outside => {}
        }
    }
    PointLocation::Inside
}

fn locate_in_ring(point: &Position, ring: &Ring) -> PointLocation {
    let n = ring.len();
    if n < 2 {
        return PointLocation::Outside;
    }
    let mut inside = false;
    for i in 0..n {
        let a = &ring[i];
        let b = &ring[(i + 1) % n];
        if on_segment(point, a, b) {
            return PointLocation::Boundary;
        }
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
    }
    if inside {
        PointLocation::Inside
    } else {
        PointLocation::Outside
    }
}

fn on_segment(p: &Position, a: &Position, b: &Position) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    let scale = (b.x - a.x).abs().max((b.y - a.y).abs()).max(1.0);
    if cross.abs() > EPSILON * scale {
        return false;
    }
    p.x >= a.x.min(b.x) - EPSILON
        && p.x <= a.x.max(b.x) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Geometry {
        Geometry::Polygon(vec![vec![
            Position::new(0.0, 0.0),
            Position::new(size, 0.0),
            Position::new(size, size),
            Position::new(0.0, size),
            Position::new(0.0, 0.0),
        ]])
    }

    fn coords(points: &[Geometry]) -> Vec<(f64, f64)> {
        points
            .iter()
            .map(|g| match g {
                Geometry::Point(p) => (p.x, p.y),
                Geometry::Polygon(_) => panic!("expected points"),
            })
            .collect()
    }

    #[test]
    fn test_unit_square_half_grid() {
        let points = sample_polygon_to_points(&square(1.0), 0.5).unwrap();
        assert_eq!(points.len(), 8); // 4 cell centroids + 4 vertices

        let c = coords(&points);
        for centroid in [(0.25, 0.25), (0.25, 0.75), (0.75, 0.25), (0.75, 0.75)] {
            assert!(c.contains(&centroid), "missing {:?}", centroid);
        }
        for vertex in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            assert!(c.contains(&vertex), "missing {:?}", vertex);
        }
    }

    #[test]
    fn test_grid_larger_than_polygon_returns_vertices_only() {
        let triangle = Geometry::Polygon(vec![vec![
            Position::new(-123.8, 39.312),
            Position::new(-123.8222818, 39.3141049),
            Position::new(-123.8166231, 39.2943269),
            Position::new(-123.8, 39.312),
        ]]);
        let points = sample_polygon_to_points(&triangle, 0.5).unwrap();
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn test_hole_excludes_centroids() {
        let with_hole = Geometry::Polygon(vec![
            vec![
                Position::new(0.0, 0.0),
                Position::new(3.0, 0.0),
                Position::new(3.0, 3.0),
                Position::new(0.0, 3.0),
                Position::new(0.0, 0.0),
            ],
            vec![
                Position::new(1.0, 1.0),
                Position::new(2.0, 1.0),
                Position::new(2.0, 2.0),
                Position::new(1.0, 2.0),
                Position::new(1.0, 1.0),
            ],
        ]);
        let points = sample_polygon_to_points(&with_hole, 1.0).unwrap();
        let c = coords(&points);
        assert!(!c.contains(&(1.5, 1.5)));
        assert!(c.contains(&(0.5, 0.5)));
        assert_eq!(points.len(), 8 + 4);
    }

    #[test]
    fn test_point_passes_through() {
        let point = Geometry::Point(Position::new(1.0, 2.0));
        assert_eq!(sample_polygon_to_points(&point, 0.5).unwrap(), vec![point]);
    }

    #[test]
    fn test_invalid_grid_size() {
        assert_eq!(
            sample_polygon_to_points(&square(1.0), 0.0),
            Err(GeometryError::InvalidGridSize(0.0))
        );
        assert!(matches!(
            sample_polygon_to_points(&square(1.0), 1e-6),
            Err(GeometryError::GridTooDense { .. })
        ));
    }

    #[test]
    fn test_point_in_polygon_boundary() {
        let Geometry::Polygon(rings) = square(1.0) else {
            unreachable!()
        };
        assert_eq!(
            point_in_polygon(&Position::new(0.5, 0.5), &rings),
            PointLocation::Inside
        );
        assert_eq!(
            point_in_polygon(&Position::new(1.0, 0.5), &rings),
            PointLocation::Boundary
        );
        assert_eq!(
            point_in_polygon(&Position::new(0.0, 0.0), &rings),
            PointLocation::Boundary
        );
        assert_eq!(
            point_in_polygon(&Position::new(1.5, 0.5), &rings),
            PointLocation::Outside
        );
    }
}
