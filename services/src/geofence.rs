//! Spatial containment tests against circular and polygonal geofences.
//!
//! A [`Boundary`] can only be obtained through its validating constructors (or
//! deserialization, which goes through the same checks), so evaluation never
//! fails. Evaluation is pure and safe to call from any number of tasks.
//!
//! Points exactly on a boundary edge count as inside. For polygon holes the
//! hole's edge belongs to the geofence, only the hole's strict interior is
//! excluded.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius used by the haversine distance.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Tolerance for "on the edge" tests, in squared-degree units of the cross product.
const EDGE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeofenceError {
    #[error("ring {ring} has {points} distinct points, at least 3 are required")]
    TooFewPoints { ring: usize, points: usize },

    #[error("polygon needs at least one ring")]
    NoRings,

    #[error("radius must be a positive number of meters, got {0}")]
    InvalidRadius(f64),

    #[error("coordinate ({lat}, {lon}) is out of range")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("malformed boundary: {0}")]
    Malformed(String),
}

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Rejects NaN, infinities and values outside the lat/lon ranges.
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), GeofenceError> {
    let valid = lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon);

    if valid {
        Ok(())
    } else {
        Err(GeofenceError::InvalidCoordinate { lat, lon })
    }
}

/// Great-circle distance in meters.
pub fn haversine_meters(a: Point, b: Point) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_METERS * c
}

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Circle { center: Point, radius_meters: f64 },
    Polygon { outer: Vec<Point>, holes: Vec<Vec<Point>> },
}

/// A validated geofence boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBoundary", into = "RawBoundary")]
pub struct Boundary {
    shape: Shape,
}

/// Wire/storage form of a boundary, e.g.
/// `{"type":"circle","center":{"lat":14.1,"lon":120.9},"radius_meters":50}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawBoundary {
    Circle { center: Point, radius_meters: f64 },
    Polygon { rings: Vec<Vec<Point>> },
}

impl TryFrom<RawBoundary> for Boundary {
    type Error = GeofenceError;

    fn try_from(raw: RawBoundary) -> Result<Self, Self::Error> {
        match raw {
            RawBoundary::Circle {
                center,
                radius_meters,
            } => Boundary::circle(center, radius_meters),
            RawBoundary::Polygon { rings } => Boundary::polygon(rings),
        }
    }
}

impl From<Boundary> for RawBoundary {
    fn from(boundary: Boundary) -> Self {
        match boundary.shape {
            Shape::Circle {
                center,
                radius_meters,
            } => RawBoundary::Circle {
                center,
                radius_meters,
            },
            Shape::Polygon { outer, holes } => {
                let mut rings = Vec::with_capacity(holes.len() + 1);
                rings.push(outer);
                rings.extend(holes);
                RawBoundary::Polygon { rings }
            }
        }
    }
}

impl Boundary {
    pub fn circle(center: Point, radius_meters: f64) -> Result<Self, GeofenceError> {
        validate_coordinates(center.lat, center.lon)?;
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(GeofenceError::InvalidRadius(radius_meters));
        }
        Ok(Self {
            shape: Shape::Circle {
                center,
                radius_meters,
            },
        })
    }

    /// Builds a polygon from its rings. The first ring is the outer boundary,
    /// any further rings are holes. A ring may repeat its first point at the end.
    pub fn polygon(rings: Vec<Vec<Point>>) -> Result<Self, GeofenceError> {
        let mut rings = rings.into_iter();
        let outer = rings.next().ok_or(GeofenceError::NoRings)?;
        let outer = normalize_ring(0, outer)?;

        let holes = rings
            .enumerate()
            .map(|(i, ring)| normalize_ring(i + 1, ring))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            shape: Shape::Polygon { outer, holes },
        })
    }

    pub fn from_json(json: &str) -> Result<Self, GeofenceError> {
        serde_json::from_str(json).map_err(|e| GeofenceError::Malformed(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        // Serializing plain numbers and vectors cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let p = Point::new(lat, lon);
        match &self.shape {
            Shape::Circle {
                center,
                radius_meters,
            } => haversine_meters(*center, p) <= *radius_meters,
            Shape::Polygon { outer, holes } => match ring_position(outer, p) {
                RingPosition::Outside => false,
                RingPosition::OnEdge => true,
                RingPosition::Inside => holes
                    .iter()
                    .all(|hole| ring_position(hole, p) != RingPosition::Inside),
            },
        }
    }
}

/// Containment test against any boundary.
pub fn contains(boundary: &Boundary, lat: f64, lon: f64) -> bool {
    boundary.contains(lat, lon)
}

fn normalize_ring(index: usize, mut ring: Vec<Point>) -> Result<Vec<Point>, GeofenceError> {
    for p in &ring {
        validate_coordinates(p.lat, p.lon)?;
    }
    // repeated vertices add no area
    ring.dedup();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 {
        return Err(GeofenceError::TooFewPoints {
            ring: index,
            points: ring.len(),
        });
    }
    Ok(ring)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RingPosition {
    Inside,
    OnEdge,
    Outside,
}

/// Even-odd ray casting with longitude as x and latitude as y.
fn ring_position(ring: &[Point], p: Point) -> RingPosition {
    let mut inside = false;
    let n = ring.len();

    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];

        if on_segment(a, b, p) {
            return RingPosition::OnEdge;
        }

        if (a.lat > p.lat) != (b.lat > p.lat) {
            let x_cross = a.lon + (p.lat - a.lat) * (b.lon - a.lon) / (b.lat - a.lat);
            if p.lon < x_cross {
                inside = !inside;
            }
        }
    }

    if inside {
        RingPosition::Inside
    } else {
        RingPosition::Outside
    }
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    let cross = (b.lon - a.lon) * (p.lat - a.lat) - (b.lat - a.lat) * (p.lon - a.lon);
    if cross.abs() > EDGE_EPSILON {
        return false;
    }
    p.lon >= a.lon.min(b.lon) - EDGE_EPSILON
        && p.lon <= a.lon.max(b.lon) + EDGE_EPSILON
        && p.lat >= a.lat.min(b.lat) - EDGE_EPSILON
        && p.lat <= a.lat.max(b.lat) + EDGE_EPSILON
}
