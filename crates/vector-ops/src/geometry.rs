//! Polygon geometry in raster corner space.
//!
//! Vertices are pixel-corner coordinates of the source raster: (0, 0) is
//! the raster's top-left corner, x grows right, y grows down. Rings are
//! stored open (no duplicated closing vertex). Outer rings wind clockwise
//! in this y-down space, which becomes counterclockwise once mapped
//! through a north-up world transform; holes wind the opposite way.

use serde::{Deserialize, Serialize};

/// A closed ring of pixel-corner vertices, stored without the closing
/// duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ring {
    pub points: Vec<(u32, u32)>,
}

impl Ring {
    pub fn new(points: Vec<(u32, u32)>) -> Self {
        Self { points }
    }

    /// Number of stored vertices (closing vertex not counted).
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Twice the signed shoelace area in pixel coordinates. Positive for
    /// outer rings, negative for holes.
    pub fn signed_area2(&self) -> i64 {
        let n = self.points.len();
        let mut sum = 0i64;
        for i in 0..n {
            let (x0, y0) = self.points[i];
            let (x1, y1) = self.points[(i + 1) % n];
            sum += x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64;
        }
        sum
    }

    pub fn is_outer(&self) -> bool {
        self.signed_area2() > 0
    }

    /// Even-odd containment test against the closed ring.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let n = self.points.len();
        let mut inside = false;
        for i in 0..n {
            let (x0, y0) = self.points[i];
            let (x1, y1) = self.points[(i + 1) % n];
            let (x0, y0) = (x0 as f64, y0 as f64);
            let (x1, y1) = (x1 as f64, y1 as f64);
            if (y0 > y) != (y1 > y) {
                let x_cross = x0 + (y - y0) / (y1 - y0) * (x1 - x0);
                if x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Bounding box as (min_x, min_y, max_x, max_y).
    pub fn bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let first = self.points.first()?;
        let mut bounds = (first.0, first.1, first.0, first.1);
        for &(x, y) in &self.points {
            bounds.0 = bounds.0.min(x);
            bounds.1 = bounds.1.min(y);
            bounds.2 = bounds.2.max(x);
            bounds.3 = bounds.3.max(y);
        }
        Some(bounds)
    }
}

/// One polygon part: a single outer ring plus any holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonGeometry {
    pub outer: Ring,
    pub holes: Vec<Ring>,
}

impl PolygonGeometry {
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    pub fn ring_count(&self) -> usize {
        1 + self.holes.len()
    }

    /// Vertex count with one closing vertex per ring, the way feature
    /// storage counts points.
    pub fn point_count(&self) -> usize {
        self.rings().map(|r| r.len() + 1).sum()
    }
}

/// Polygon geometry with one or more parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiPolygon {
    pub parts: Vec<PolygonGeometry>,
}

impl MultiPolygon {
    pub fn single(part: PolygonGeometry) -> Self {
        Self { parts: vec![part] }
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn ring_count(&self) -> usize {
        self.parts.iter().map(PolygonGeometry::ring_count).sum()
    }

    pub fn point_count(&self) -> usize {
        self.parts.iter().map(PolygonGeometry::point_count).sum()
    }

    /// Stored points minus one closing vertex per ring.
    pub fn vertex_count(&self) -> usize {
        self.point_count() - self.ring_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Ring {
        // Clockwise in y-down pixel space.
        Ring::new(vec![(0, 0), (1, 0), (1, 1), (0, 1)])
    }

    #[test]
    fn outer_ring_has_positive_area() {
        assert_eq!(unit_square().signed_area2(), 2);
        assert!(unit_square().is_outer());

        let reversed = Ring::new(vec![(0, 1), (1, 1), (1, 0), (0, 0)]);
        assert_eq!(reversed.signed_area2(), -2);
        assert!(!reversed.is_outer());
    }

    #[test]
    fn containment() {
        let ring = Ring::new(vec![(0, 0), (4, 0), (4, 4), (0, 4)]);
        assert!(ring.contains(2.0, 2.0));
        assert!(!ring.contains(5.0, 2.0));
        assert!(!ring.contains(-1.0, -1.0));
    }

    #[test]
    fn vertex_count_subtracts_closing_vertices() {
        let outer = Ring::new(vec![(0, 0), (3, 0), (3, 3), (0, 3)]);
        let hole = Ring::new(vec![(1, 2), (2, 2), (2, 1), (1, 1)]);
        let geom = MultiPolygon::single(PolygonGeometry {
            outer,
            holes: vec![hole],
        });

        assert_eq!(geom.ring_count(), 2);
        assert_eq!(geom.point_count(), 10);
        assert_eq!(geom.vertex_count(), 8);
    }
}
