use geo::{Coord, LineString};
use geojson::{Feature, Geometry, Value};
use serde::{Deserialize, Serialize};

use crate::geodesy::distance_meters;

// ** Coordinates **

/// A WGS84 position, longitude first like GeoJSON.
///
/// Equality is exact coordinate equality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// Planar interpolation between `self` and `other`, `fraction` in `[0, 1]`.
    pub fn lerp(&self, other: &GeoPoint, fraction: f64) -> GeoPoint {
        GeoPoint {
            longitude: self.longitude + (other.longitude - self.longitude) * fraction,
            latitude: self.latitude + (other.latitude - self.latitude) * fraction,
        }
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from([longitude, latitude]: [f64; 2]) -> Self {
        Self { longitude, latitude }
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.longitude, point.latitude]
    }
}

impl From<GeoPoint> for Coord<f64> {
    fn from(point: GeoPoint) -> Self {
        Coord {
            x: point.longitude,
            y: point.latitude,
        }
    }
}

/// Query window around a start and an end point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub min_longitude: f64,
    pub max_latitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Smallest box holding both points, grown by `padding_degrees` on every side.
    pub fn around(a: &GeoPoint, b: &GeoPoint, padding_degrees: f64) -> Self {
        Self {
            min_latitude: a.latitude.min(b.latitude) - padding_degrees,
            min_longitude: a.longitude.min(b.longitude) - padding_degrees,
            max_latitude: a.latitude.max(b.latitude) + padding_degrees,
            max_longitude: a.longitude.max(b.longitude) + padding_degrees,
        }
    }

    pub fn latitude_span(&self) -> f64 {
        self.max_latitude - self.min_latitude
    }

    pub fn longitude_span(&self) -> f64 {
        self.max_longitude - self.min_longitude
    }

    pub fn exceeds(&self, max_span_degrees: f64) -> bool {
        self.latitude_span() > max_span_degrees || self.longitude_span() > max_span_degrees
    }

    /// Bounds rounded to 6 decimals, south/west/north/east.
    pub fn cache_key(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.min_latitude, self.min_longitude, self.max_latitude, self.max_longitude
        )
    }
}

// ** Routes **

/// Ordered path of positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polyline {
    points: Vec<GeoPoint>,
}

impl Polyline {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    /// The two-point segment shown when no waterway route exists.
    pub fn straight(start: GeoPoint, end: GeoPoint) -> Self {
        Self {
            points: vec![start, end],
        }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&GeoPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&GeoPoint> {
        self.points.last()
    }

    /// Great-circle length in meters.
    pub fn length_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| distance_meters(&pair[0], &pair[1]))
            .sum()
    }

    /// GeoJSON feature holding this path as a `LineString`.
    pub fn to_geojson(&self) -> Feature {
        let line = LineString::from(self);
        Feature {
            geometry: Some(Geometry::new(Value::from(&line))),
            ..Default::default()
        }
    }
}

impl From<&Polyline> for LineString<f64> {
    fn from(polyline: &Polyline) -> Self {
        polyline.points.iter().copied().map(Coord::from).collect()
    }
}

// ** OSM data types **

pub type OsmNodeId = u64;
