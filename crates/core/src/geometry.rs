//! Geometry value types
//!
//! Coordinates are stored as fixed-point millimeters (`i64`), matching
//! the survey precision of the source data. Fixed-point storage makes
//! geometry comparable with `Eq`/`Ord`, which the engine relies on:
//! front retirement matches "geometrically identical" lines by exact
//! segment equality, and block dissolve deduplicates rings in a set.
//!
//! Distances are computed in meters as `f64` (ranking point matches
//! within a tolerance does not need exactness, identity does).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Number of millimeters per meter (fixed-point scale)
pub const MM_PER_M: i64 = 1_000;

/// A planar coordinate in fixed-point millimeters
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Coord {
    /// Easting in millimeters
    pub x: i64,
    /// Northing in millimeters
    pub y: i64,
}

impl Coord {
    /// Create a coordinate from millimeter values
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Create a coordinate from meter values, rounding to the nearest millimeter
    pub fn from_meters(x: f64, y: f64) -> Self {
        Self {
            x: (x * MM_PER_M as f64).round() as i64,
            y: (y * MM_PER_M as f64).round() as i64,
        }
    }

    /// Euclidean distance to another coordinate, in meters
    pub fn distance_m(&self, other: &Coord) -> f64 {
        let dx = (self.x - other.x) as f64 / MM_PER_M as f64;
        let dy = (self.y - other.y) as f64 / MM_PER_M as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}, {:.3})",
            self.x as f64 / MM_PER_M as f64,
            self.y as f64 / MM_PER_M as f64
        )
    }
}

/// A point geometry (border points, control points)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointGeom {
    /// Planar position
    pub coord: Coord,
}

impl PointGeom {
    /// Create a point geometry
    pub fn new(coord: Coord) -> Self {
        Self { coord }
    }

    /// Distance to another point, in meters
    pub fn distance_m(&self, other: &PointGeom) -> f64 {
        self.coord.distance_m(&other.coord)
    }
}

/// An undirected line segment between two coordinates
///
/// Equality is orientation-insensitive: the constructor normalizes the
/// endpoint order, so a front digitized in either direction compares
/// equal to the same line on the ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Segment {
    a: Coord,
    b: Coord,
}

impl Segment {
    /// Create a segment; endpoint order is normalized
    pub fn new(p: Coord, q: Coord) -> Self {
        if p <= q {
            Self { a: p, b: q }
        } else {
            Self { a: q, b: p }
        }
    }

    /// Lexicographically smaller endpoint
    pub fn start(&self) -> Coord {
        self.a
    }

    /// Lexicographically larger endpoint
    pub fn end(&self) -> Coord {
        self.b
    }

    /// Segment length in meters
    pub fn length_m(&self) -> f64 {
        self.a.distance_m(&self.b)
    }
}

/// A closed ring of coordinates
///
/// Rings are normalized on construction: the vertex sequence is rotated
/// to start at the smallest coordinate and oriented so the second vertex
/// is the smaller of the two neighbors. Two rings describing the same
/// boundary therefore compare equal regardless of start vertex or
/// winding direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ring {
    vertices: Vec<Coord>,
}

impl Ring {
    /// Create a normalized ring from a vertex sequence
    ///
    /// The input must not repeat the first vertex at the end; rings with
    /// fewer than 3 vertices are degenerate and yield `None`.
    pub fn new(vertices: Vec<Coord>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        Some(Self {
            vertices: normalize_ring(vertices),
        })
    }

    /// The normalized vertex sequence
    pub fn vertices(&self) -> &[Coord] {
        &self.vertices
    }

    /// Boundary segments of the ring, including the closing segment
    pub fn segments(&self) -> Vec<Segment> {
        let n = self.vertices.len();
        (0..n)
            .map(|i| Segment::new(self.vertices[i], self.vertices[(i + 1) % n]))
            .collect()
    }

    /// Signed area via the shoelace formula, in square meters
    ///
    /// The sign depends on winding; callers wanting area use `area_m2`.
    fn signed_area_m2(&self) -> f64 {
        let n = self.vertices.len();
        let mut acc = 0.0f64;
        for i in 0..n {
            let p = self.vertices[i];
            let q = self.vertices[(i + 1) % n];
            acc += (p.x as f64 * q.y as f64) - (q.x as f64 * p.y as f64);
        }
        acc / 2.0 / (MM_PER_M as f64 * MM_PER_M as f64)
    }

    /// Enclosed area in square meters
    pub fn area_m2(&self) -> f64 {
        self.signed_area_m2().abs()
    }
}

/// Rotate and orient a ring so equal boundaries get equal vertex sequences
fn normalize_ring(vertices: Vec<Coord>) -> Vec<Coord> {
    let n = vertices.len();
    let min_idx = vertices
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| **c)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let next = vertices[(min_idx + 1) % n];
    let prev = vertices[(min_idx + n - 1) % n];
    let mut out = Vec::with_capacity(n);
    if next <= prev {
        for i in 0..n {
            out.push(vertices[(min_idx + i) % n]);
        }
    } else {
        for i in 0..n {
            out.push(vertices[(min_idx + n - i) % n]);
        }
    }
    out
}

/// A polygon as a set of normalized rings
///
/// The set model gives exact equality and a cheap dissolve: the union
/// of two polygons covering disjoint rings is the union of their ring
/// sets. Overlap resolution is the concern of the surveying tools that
/// produce the staged geometries; by the time features reach this
/// engine their rings partition the ground.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Polygon {
    rings: BTreeSet<Ring>,
}

impl Polygon {
    /// The empty polygon
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a polygon from a single ring
    pub fn from_ring(ring: Ring) -> Self {
        let mut rings = BTreeSet::new();
        rings.insert(ring);
        Self { rings }
    }

    /// Create a polygon from several rings
    pub fn from_rings(iter: impl IntoIterator<Item = Ring>) -> Self {
        Self {
            rings: iter.into_iter().collect(),
        }
    }

    /// Whether the polygon has no rings
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Rings of the polygon, in normalized order
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        self.rings.iter()
    }

    /// All boundary segments of all rings
    pub fn segments(&self) -> BTreeSet<Segment> {
        self.rings.iter().flat_map(|r| r.segments()).collect()
    }

    /// Total enclosed area in square meters
    pub fn area_m2(&self) -> f64 {
        self.rings.iter().map(Ring::area_m2).sum()
    }

    /// Dissolve this polygon with another into their union
    pub fn dissolve(&self, other: &Polygon) -> Polygon {
        Polygon {
            rings: self.rings.union(&other.rings).cloned().collect(),
        }
    }

    /// Dissolve a collection of polygons into one
    pub fn dissolve_all<'a>(polys: impl IntoIterator<Item = &'a Polygon>) -> Polygon {
        let mut rings = BTreeSet::new();
        for p in polys {
            rings.extend(p.rings.iter().cloned());
        }
        Polygon { rings }
    }
}
